//! Per-node command execution.

use crate::process::{CommandOutput, ProcessError, ProcessSpec};
use crate::topology::NodeRole;

/// Handle to one instantiated node. Routers and hosts execute inside their
/// network namespace; switches are bridges in the root namespace.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    name: String,
    role: NodeRole,
}

impl NodeHandle {
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Run a shell command on this node, capturing its output. The exit
    /// status is reported in the output, not turned into an error: the
    /// operator judges the result.
    pub fn cmd(&self, command: &str) -> Result<CommandOutput, ProcessError> {
        self.spec_for(command).output()
    }

    fn spec_for(&self, command: &str) -> ProcessSpec {
        match self.role {
            NodeRole::Router | NodeRole::Host => ProcessSpec::new("ip").args([
                "netns",
                "exec",
                self.name.as_str(),
                "sh",
                "-c",
                command,
            ]),
            NodeRole::Switch => ProcessSpec::new("sh").args(["-c", command]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_command_runs_in_namespace() {
        let handle = NodeHandle::new("r1", NodeRole::Router);
        assert_eq!(
            handle.spec_for("route -n").rendered(),
            "ip netns exec r1 sh -c route -n"
        );
    }

    #[test]
    fn test_switch_command_runs_in_root_namespace() {
        let handle = NodeHandle::new("s1", NodeRole::Switch);
        assert_eq!(handle.spec_for("ovs-ofctl dump-flows s1").program, "sh");
    }
}
