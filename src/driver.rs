//! End-to-end lab orchestration.
//!
//! One run walks the phases Unstarted → Built → Running → DaemonsLaunched
//! → Interactive → Stopped → Cleaned, in order. Setup, launch and
//! readiness failures abort the run, but teardown executes regardless and
//! is idempotent: leftover daemons are killed by name and artifact cleanup
//! is scoped to the run directory.

use std::fmt;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info, warn};

use crate::cli;
use crate::config::LabConfig;
use crate::emulation::Emulation;
use crate::quagga;
use crate::topology::Topology;

/// The run's position in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unstarted,
    Built,
    Running,
    DaemonsLaunched,
    Interactive,
    Stopped,
    Cleaned,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Unstarted => "unstarted",
            Phase::Built => "built",
            Phase::Running => "running",
            Phase::DaemonsLaunched => "daemons-launched",
            Phase::Interactive => "interactive",
            Phase::Stopped => "stopped",
            Phase::Cleaned => "cleaned",
        };
        write!(f, "{name}")
    }
}

fn advance(phase: &mut Phase, next: Phase) {
    debug!("phase {phase} -> {next}");
    *phase = next;
}

/// Per-run options from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Drop into the interactive shell after the daemons are up.
    pub interactive: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { interactive: true }
    }
}

/// Run one lab end to end.
pub fn run(topology: Topology, config: &LabConfig, options: &RunOptions) -> Result<()> {
    let mut phase = Phase::Unstarted;

    topology.validate().wrap_err("invalid topology declaration")?;
    advance(&mut phase, Phase::Built);

    std::fs::create_dir_all(&config.run_dir).wrap_err_with(|| {
        format!("Failed to create run directory '{}'", config.run_dir.display())
    })?;
    if config.generate_configs {
        let written = quagga::configgen::write_configs(&topology, config)?;
        if written > 0 {
            info!(
                "generated {written} Quagga configuration files in '{}'",
                config.conf_dir.display()
            );
        }
    }

    let mut emulation =
        Emulation::start(topology, config).wrap_err("failed to start the emulated network")?;
    advance(&mut phase, Phase::Running);

    let result = launch_and_interact(&emulation, config, options, &mut phase);

    // Teardown runs no matter how the launch went.
    emulation.stop();
    advance(&mut phase, Phase::Stopped);

    quagga::kill_leftover_daemons(config);
    match quagga::remove_artifacts(&config.run_dir) {
        Ok(removed) if removed > 0 => {
            info!("removed {removed} artifact files from '{}'", config.run_dir.display());
        }
        Ok(_) => {}
        Err(err) => warn!(
            "artifact cleanup in '{}' failed: {err}",
            config.run_dir.display()
        ),
    }
    advance(&mut phase, Phase::Cleaned);

    result
}

fn launch_and_interact(
    emulation: &Emulation,
    config: &LabConfig,
    options: &RunOptions,
    phase: &mut Phase,
) -> Result<()> {
    launch_daemons(emulation, config)?;
    advance(phase, Phase::DaemonsLaunched);

    print_route_tables(emulation);

    if options.interactive {
        advance(phase, Phase::Interactive);
        cli::shell(emulation)?;
    }
    Ok(())
}

/// Start zebra on every router, then isisd once each router's control
/// socket is observed. isisd never starts ahead of its router's zebra.
fn launch_daemons(emulation: &Emulation, config: &LabConfig) -> Result<()> {
    let plan = quagga::launch_plan(emulation.topology(), config);

    for launch in &plan {
        info!("starting zebra on {}", launch.router);
        launch
            .zebra
            .run()
            .wrap_err_with(|| format!("zebra failed to start on {}", launch.router))?;
    }

    for launch in &plan {
        quagga::wait_for_socket(&launch.socket, &config.readiness).wrap_err_with(|| {
            format!("zebra on {} never opened its control socket", launch.router)
        })?;
        info!("starting isisd on {}", launch.router);
        launch
            .isisd
            .run()
            .wrap_err_with(|| format!("isisd failed to start on {}", launch.router))?;
    }

    Ok(())
}

fn print_route_tables(emulation: &Emulation) {
    for router in emulation.topology().routers() {
        let Some(handle) = emulation.node(&router.name) else {
            continue;
        };
        match handle.cmd("route -n") {
            Ok(out) => info!("routing table on {}:\n{}", router.name, out.stdout.trim_end()),
            Err(err) => warn!("could not read routing table on {}: {err}", router.name),
        }
    }
}
