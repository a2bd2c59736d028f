//! Lab configuration.
//!
//! Everything the lab scripts used to hardcode lives here instead: the
//! Quagga configuration directory, the run directory for control sockets
//! and interface-state files, daemon binary names, the OpenFlow controller
//! address and the zebra readiness bounds. A missing configuration file
//! yields the defaults, which reproduce the original deployment layout.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::WrapErr;

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid controller configuration: {0}")]
    InvalidController(String),

    #[error("Invalid readiness configuration: {0}")]
    InvalidReadiness(String),

    #[error("Invalid IS-IS area '{0}': expected dotted hex groups such as 49.0001")]
    InvalidArea(String),
}

/// Top-level lab configuration, loaded from YAML with full defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Directory holding the per-router zebra/isisd configuration files.
    pub conf_dir: PathBuf,
    /// Directory receiving the per-run artifacts: control sockets and
    /// interface-state files. Cleanup is scoped to this directory.
    pub run_dir: PathBuf,
    /// zebra executable, resolved through PATH unless absolute.
    pub zebra_bin: String,
    /// isisd executable, resolved through PATH unless absolute.
    pub isisd_bin: String,
    /// Generate missing Quagga configuration files before launching.
    pub generate_configs: bool,
    /// IS-IS area prefix used when generating isisd configurations.
    pub isis_area: String,
    pub controller: ControllerConfig,
    pub readiness: ReadinessConfig,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            conf_dir: PathBuf::from("/usr/local/etc/quagga"),
            run_dir: PathBuf::from("/tmp/isislab"),
            zebra_bin: "zebra".to_string(),
            isisd_bin: "isisd".to_string(),
            generate_configs: true,
            isis_area: "49.0001".to_string(),
            controller: ControllerConfig::default(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl LabConfig {
    /// Load a configuration file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> color_eyre::Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .wrap_err_with(|| format!("Failed to read config file '{}'", path.display()))?;
                serde_yaml::from_str(&contents)
                    .wrap_err_with(|| format!("Failed to parse config file '{}'", path.display()))?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.controller.port == 0 {
            return Err(ValidationError::InvalidController(
                "controller port cannot be 0".to_string(),
            ));
        }

        if self.readiness.poll_interval.is_zero() {
            return Err(ValidationError::InvalidReadiness(
                "poll_interval cannot be zero".to_string(),
            ));
        }
        if self.readiness.timeout < self.readiness.poll_interval {
            return Err(ValidationError::InvalidReadiness(format!(
                "timeout {:?} is shorter than poll_interval {:?}",
                self.readiness.timeout, self.readiness.poll_interval
            )));
        }

        let area_ok = !self.isis_area.is_empty()
            && self
                .isis_area
                .split('.')
                .all(|group| !group.is_empty() && group.chars().all(|c| c.is_ascii_hexdigit()));
        if !area_ok {
            return Err(ValidationError::InvalidArea(self.isis_area.clone()));
        }

        Ok(())
    }
}

/// Remote OpenFlow controller endpoint for the SDN topology's switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::new(192, 168, 56, 106),
            port: 6654,
        }
    }
}

/// Bounds for the zebra control-socket readiness poll. Replaces the fixed
/// startup sleep: isisd is only launched once the socket exists, and a
/// socket that never appears is an error rather than a silent continue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
        }
    }
}
