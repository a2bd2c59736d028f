//! Emulated network lifecycle.
//!
//! [`Emulation::start`] turns a validated [`Topology`] into live OS
//! constructs (network namespaces, veth pairs, OVS bridges) by executing
//! the setup plan, and hands out per-node [`NodeHandle`]s. [`Emulation::stop`]
//! runs the teardown plan tolerantly: a target that is already gone is the
//! expected case on repeated teardown.

pub mod node;
pub mod plan;

use std::collections::HashMap;

use color_eyre::eyre::WrapErr;
use log::{info, warn};

use crate::config::LabConfig;
use crate::topology::Topology;

pub use node::NodeHandle;
pub use plan::in_netns;

/// A started emulated network.
#[derive(Debug)]
pub struct Emulation {
    topology: Topology,
    handles: HashMap<String, NodeHandle>,
    started: bool,
}

impl Emulation {
    /// Validate the topology and bring the network up. Any failing setup
    /// step aborts with its command line in the error context.
    pub fn start(topology: Topology, config: &LabConfig) -> color_eyre::Result<Self> {
        topology.validate()?;

        let steps = plan::setup_plan(&topology, config);
        info!(
            "bringing up '{}': {} nodes, {} links, {} setup steps",
            topology.name,
            topology.nodes().len(),
            topology.links().len(),
            steps.len()
        );
        for step in &steps {
            step.run()
                .wrap_err_with(|| format!("setup step failed: {}", step.rendered()))?;
        }

        let handles = topology
            .nodes()
            .iter()
            .map(|n| (n.name.clone(), NodeHandle::new(n.name.as_str(), n.role)))
            .collect();

        Ok(Self {
            topology,
            handles,
            started: true,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn node(&self, name: &str) -> Option<&NodeHandle> {
        self.handles.get(name)
    }

    /// Tear the network down. Idempotent: a second call is a no-op, and
    /// individual steps whose targets are already gone only log.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        info!("tearing down '{}'", self.topology.name);
        for step in plan::stop_plan(&self.topology) {
            match step.output() {
                Ok(out) if !out.status.success() => {
                    warn!("teardown step '{}' exited with {}", step.rendered(), out.status);
                }
                Ok(_) => {}
                Err(err) => warn!("teardown step '{}' failed: {err}", step.rendered()),
            }
        }
        self.started = false;
    }
}
