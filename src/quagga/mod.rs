//! Quagga daemon integration.
//!
//! Launch invocations, artifact layout, readiness and cleanup for the two
//! daemons each router runs: zebra (kernel forwarding table) and isisd
//! (IS-IS). The contract with the daemons is three paths apiece: a
//! configuration file, the zebra control socket, and an interface-state
//! file. isisd attaches to the same control socket its router's zebra was
//! told to create.

pub mod configgen;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{LabConfig, ReadinessConfig};
use crate::emulation::in_netns;
use crate::process::ProcessSpec;
use crate::topology::Topology;

/// Readiness-poll failure.
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error("control socket '{path}' not present after {timeout:?}")]
    TimedOut { path: PathBuf, timeout: Duration },
}

/// Per-router file layout: configuration files under the conf dir, runtime
/// artifacts under the run dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterPaths {
    pub zebra_conf: PathBuf,
    pub isisd_conf: PathBuf,
    pub zebra_socket: PathBuf,
    pub zebra_interface: PathBuf,
    pub isisd_interface: PathBuf,
}

pub fn router_paths(router: &str, config: &LabConfig) -> RouterPaths {
    RouterPaths {
        zebra_conf: config.conf_dir.join(format!("{router}zebra.conf")),
        isisd_conf: config.conf_dir.join(format!("{router}isisd.conf")),
        zebra_socket: config.run_dir.join(format!("{router}zebra.api")),
        zebra_interface: config.run_dir.join(format!("{router}zebra.interface")),
        isisd_interface: config.run_dir.join(format!("{router}isisd.interface")),
    }
}

/// One router's daemon launch pair.
#[derive(Debug, Clone)]
pub struct RouterLaunch {
    pub router: String,
    pub zebra: ProcessSpec,
    pub isisd: ProcessSpec,
    /// The control socket zebra creates and isisd attaches to.
    pub socket: PathBuf,
}

fn daemon_spec(binary: &str, conf: &Path, socket: &Path, interface_file: &Path) -> ProcessSpec {
    let conf = conf.display().to_string();
    let socket = socket.display().to_string();
    let interface_file = interface_file.display().to_string();
    ProcessSpec::new(binary).args([
        "-f",
        conf.as_str(),
        "-d",
        "-z",
        socket.as_str(),
        "-i",
        interface_file.as_str(),
    ])
}

/// Build the daemon launch plan for every router, in topology order.
pub fn launch_plan(topology: &Topology, config: &LabConfig) -> Vec<RouterLaunch> {
    topology
        .routers()
        .map(|router| {
            let paths = router_paths(&router.name, config);
            let zebra = in_netns(
                &router.name,
                &daemon_spec(
                    &config.zebra_bin,
                    &paths.zebra_conf,
                    &paths.zebra_socket,
                    &paths.zebra_interface,
                ),
            );
            let isisd = in_netns(
                &router.name,
                &daemon_spec(
                    &config.isisd_bin,
                    &paths.isisd_conf,
                    &paths.zebra_socket,
                    &paths.isisd_interface,
                ),
            );
            RouterLaunch {
                router: router.name.clone(),
                zebra,
                isisd,
                socket: paths.zebra_socket,
            }
        })
        .collect()
}

/// Poll until the control socket exists. Bounded: a socket that never
/// appears is an error, not a reason to continue blind.
pub fn wait_for_socket(path: &Path, readiness: &ReadinessConfig) -> Result<(), ReadinessError> {
    let start = Instant::now();
    loop {
        if path.exists() {
            debug!("control socket '{}' ready after {:?}", path.display(), start.elapsed());
            return Ok(());
        }
        if start.elapsed() >= readiness.timeout {
            return Err(ReadinessError::TimedOut {
                path: path.to_path_buf(),
                timeout: readiness.timeout,
            });
        }
        std::thread::sleep(readiness.poll_interval);
    }
}

/// Force-kill daemon instances that outlived the run. `pkill` exiting
/// non-zero means nothing matched, which is the expected idle case.
pub fn kill_leftover_daemons(config: &LabConfig) {
    for binary in [config.isisd_bin.as_str(), config.zebra_bin.as_str()] {
        let name = Path::new(binary)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(binary);
        let spec = ProcessSpec::new("pkill").args(["-9", "-x", name]);
        match spec.output() {
            Ok(out) if out.status.success() => info!("killed leftover {name} processes"),
            Ok(_) => debug!("no leftover {name} processes"),
            Err(err) => warn!("failed to run pkill for {name}: {err}"),
        }
    }
}

/// Delete control sockets and interface-state files inside the run
/// directory. Nothing outside it is touched. Returns the number of files
/// removed; a missing directory or file counts as already clean.
pub fn remove_artifacts(run_dir: &Path) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(run_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        let ext = path.extension().and_then(|e| e.to_str());
        if matches!(ext, Some("api") | Some("interface")) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }
    }
    Ok(removed)
}
