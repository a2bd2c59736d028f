//! Quagga configuration generation.
//!
//! The daemons expect a hand-maintained config file per router. When
//! `generate_configs` is enabled, missing files are written with a minimal
//! working configuration: zebra gets hostname/password/log stanzas, isisd
//! additionally enables IS-IS on every router interface with a NET derived
//! from the configured area and the router's position in the topology.
//! Existing files are never overwritten; an operator-supplied config wins.

use std::fmt::Write as _;

use color_eyre::eyre::WrapErr;
use log::info;

use crate::config::LabConfig;
use crate::topology::Topology;

use super::router_paths;

/// IS-IS instance tag shared by all generated router configs.
pub const ISIS_INSTANCE: &str = "LAB";

/// NET for the router at `index` (0-based): area prefix plus a zero-padded
/// system id and the NSEL byte, e.g. `49.0001.0000.0000.0001.00`.
pub fn isis_net(area: &str, index: usize) -> String {
    format!("{}.0000.0000.{:04}.00", area, index + 1)
}

/// Render the zebra configuration for one router.
pub fn zebra_config(router: &str, config: &LabConfig) -> String {
    let log_file = config.run_dir.join(format!("{router}zebra.log"));
    format!(
        "hostname {router}\n\
         password zebra\n\
         enable password zebra\n\
         log file {}\n",
        log_file.display()
    )
}

/// Render the isisd configuration for the router at `index`.
pub fn isisd_config(topology: &Topology, router: &str, index: usize, config: &LabConfig) -> String {
    let log_file = config.run_dir.join(format!("{router}isisd.log"));
    let mut out = String::new();
    let _ = write!(
        out,
        "hostname {router}\n\
         password zebra\n\
         log file {}\n\
         !\n",
        log_file.display()
    );
    for iface in topology.interfaces_of(router) {
        let _ = write!(out, "interface {}\n ip router isis {ISIS_INSTANCE}\n!\n", iface.name);
    }
    let _ = write!(
        out,
        "router isis {ISIS_INSTANCE}\n \
         net {}\n \
         metric-style wide\n\
         !\n",
        isis_net(&config.isis_area, index)
    );
    out
}

/// Write any missing configuration files for the topology's routers.
/// Returns the number of files created.
pub fn write_configs(topology: &Topology, config: &LabConfig) -> color_eyre::Result<usize> {
    std::fs::create_dir_all(&config.conf_dir).wrap_err_with(|| {
        format!("Failed to create config directory '{}'", config.conf_dir.display())
    })?;

    let mut written = 0;
    for (index, router) in topology.routers().enumerate() {
        let paths = router_paths(&router.name, config);
        if !paths.zebra_conf.exists() {
            std::fs::write(&paths.zebra_conf, zebra_config(&router.name, config))
                .wrap_err_with(|| format!("Failed to write '{}'", paths.zebra_conf.display()))?;
            info!("generated {}", paths.zebra_conf.display());
            written += 1;
        }
        if !paths.isisd_conf.exists() {
            std::fs::write(
                &paths.isisd_conf,
                isisd_config(topology, &router.name, index, config),
            )
            .wrap_err_with(|| format!("Failed to write '{}'", paths.isisd_conf.display()))?;
            info!("generated {}", paths.isisd_conf.display());
            written += 1;
        }
    }
    Ok(written)
}
