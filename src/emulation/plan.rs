//! Setup and teardown command plans.
//!
//! A plan is an ordered `Vec<ProcessSpec>` derived from a validated
//! topology: namespaces first, then bridges, then veth pairs with their
//! addresses, then per-node start actions and host default routes. Keeping
//! the plan a plain value means sequencing is testable without root and the
//! executing layer stays a dumb loop.

use std::collections::HashMap;

use crate::config::LabConfig;
use crate::process::ProcessSpec;
use crate::topology::{Cidr, LinkEnd, NodeRole, Topology};

/// Wrap a command so it executes inside the named network namespace.
pub fn in_netns(netns: &str, spec: &ProcessSpec) -> ProcessSpec {
    let mut wrapped = ProcessSpec::new("ip")
        .args(["netns", "exec", netns])
        .arg(spec.program.clone())
        .args(spec.args.iter().cloned());
    wrapped.cwd = spec.cwd.clone();
    wrapped
}

fn is_namespaced(role: NodeRole) -> bool {
    matches!(role, NodeRole::Router | NodeRole::Host)
}

/// Map of (node, ifname) to the address the interface ends up with.
fn resolved_addresses(topology: &Topology) -> HashMap<(String, String), Option<Cidr>> {
    let mut addresses = HashMap::new();
    for node in topology.nodes() {
        for iface in topology.interfaces_of(&node.name) {
            addresses.insert((node.name.clone(), iface.name), iface.ip);
        }
    }
    addresses
}

fn ip_in_netns(netns: &str, args: &[&str]) -> ProcessSpec {
    ProcessSpec::new("ip")
        .args(["netns", "exec", netns, "ip"])
        .args(args.iter().copied())
}

fn addr_and_up(
    steps: &mut Vec<ProcessSpec>,
    end: &LinkEnd,
    addresses: &HashMap<(String, String), Option<Cidr>>,
) {
    let key = (end.node.clone(), end.ifname.clone());
    if let Some(Some(ip)) = addresses.get(&key) {
        let addr = ip.to_string();
        steps.push(ip_in_netns(
            &end.node,
            &["addr", "add", addr.as_str(), "dev", end.ifname.as_str()],
        ));
    }
    steps.push(ip_in_netns(
        &end.node,
        &["link", "set", end.ifname.as_str(), "up"],
    ));
}

/// Build the ordered setup plan for a validated topology.
pub fn setup_plan(topology: &Topology, config: &LabConfig) -> Vec<ProcessSpec> {
    let addresses = resolved_addresses(topology);
    let mut steps = Vec::new();

    for node in topology.nodes() {
        match node.role {
            NodeRole::Router | NodeRole::Host => {
                steps.push(ProcessSpec::new("ip").args(["netns", "add", node.name.as_str()]));
                steps.push(ip_in_netns(&node.name, &["link", "set", "lo", "up"]));
            }
            NodeRole::Switch => {
                steps.push(ProcessSpec::new("ovs-vsctl").args(["add-br", node.name.as_str()]));
                if let Some(dpid) = &node.dpid {
                    let dpid_arg = format!("other-config:datapath-id={dpid}");
                    steps.push(ProcessSpec::new("ovs-vsctl").args([
                        "set",
                        "bridge",
                        node.name.as_str(),
                        dpid_arg.as_str(),
                    ]));
                }
                let target = format!("tcp:{}:{}", config.controller.ip, config.controller.port);
                steps.push(ProcessSpec::new("ovs-vsctl").args([
                    "set-controller",
                    node.name.as_str(),
                    target.as_str(),
                ]));
                steps.push(ProcessSpec::new("ovs-vsctl").args([
                    "set-fail-mode",
                    node.name.as_str(),
                    "secure",
                ]));
                steps.push(ProcessSpec::new("ip").args(["link", "set", node.name.as_str(), "up"]));
            }
        }
    }

    for link in topology.links() {
        // validate() guarantees both endpoints resolve
        let role_a = topology.node(&link.a.node).map(|n| n.role);
        let role_b = topology.node(&link.b.node).map(|n| n.role);
        let (Some(role_a), Some(role_b)) = (role_a, role_b) else {
            continue;
        };

        match (is_namespaced(role_a), is_namespaced(role_b)) {
            (true, true) => {
                steps.push(ProcessSpec::new("ip").args([
                    "link",
                    "add",
                    link.a.ifname.as_str(),
                    "netns",
                    link.a.node.as_str(),
                    "type",
                    "veth",
                    "peer",
                    "name",
                    link.b.ifname.as_str(),
                    "netns",
                    link.b.node.as_str(),
                ]));
                addr_and_up(&mut steps, &link.a, &addresses);
                addr_and_up(&mut steps, &link.b, &addresses);
            }
            (true, false) | (false, true) => {
                // one end stays in the root namespace, attached to the bridge
                let (ns_end, sw_end) = if is_namespaced(role_a) {
                    (&link.a, &link.b)
                } else {
                    (&link.b, &link.a)
                };
                steps.push(ProcessSpec::new("ip").args([
                    "link",
                    "add",
                    sw_end.ifname.as_str(),
                    "type",
                    "veth",
                    "peer",
                    "name",
                    ns_end.ifname.as_str(),
                    "netns",
                    ns_end.node.as_str(),
                ]));
                steps.push(ProcessSpec::new("ovs-vsctl").args([
                    "add-port",
                    sw_end.node.as_str(),
                    sw_end.ifname.as_str(),
                ]));
                steps.push(ProcessSpec::new("ip").args([
                    "link",
                    "set",
                    sw_end.ifname.as_str(),
                    "up",
                ]));
                addr_and_up(&mut steps, ns_end, &addresses);
            }
            (false, false) => {
                steps.push(ProcessSpec::new("ip").args([
                    "link",
                    "add",
                    link.a.ifname.as_str(),
                    "type",
                    "veth",
                    "peer",
                    "name",
                    link.b.ifname.as_str(),
                ]));
                for end in [&link.a, &link.b] {
                    steps.push(ProcessSpec::new("ovs-vsctl").args([
                        "add-port",
                        end.node.as_str(),
                        end.ifname.as_str(),
                    ]));
                    steps.push(ProcessSpec::new("ip").args([
                        "link",
                        "set",
                        end.ifname.as_str(),
                        "up",
                    ]));
                }
            }
        }
    }

    for node in topology.nodes() {
        for action in &node.start_actions {
            if is_namespaced(node.role) {
                steps.push(in_netns(&node.name, action));
            } else {
                steps.push(action.clone());
            }
        }
    }

    for host in topology.hosts() {
        if let Some(gateway) = host.default_route {
            let via = gateway.to_string();
            steps.push(ip_in_netns(
                &host.name,
                &["route", "add", "default", "via", via.as_str()],
            ));
        }
    }

    steps
}

/// Build the teardown plan: stop actions, then namespace and bridge
/// removal. Every step is expected to be safely skippable when its target
/// is already gone.
pub fn stop_plan(topology: &Topology) -> Vec<ProcessSpec> {
    let mut steps = Vec::new();

    for node in topology.nodes() {
        for action in &node.stop_actions {
            if is_namespaced(node.role) {
                steps.push(in_netns(&node.name, action));
            } else {
                steps.push(action.clone());
            }
        }
    }

    // switch-switch veths live in the root namespace and outlive the bridge
    for link in topology.links() {
        let both_switches = [&link.a, &link.b].iter().all(|end| {
            topology
                .node(&end.node)
                .is_some_and(|n| n.role == NodeRole::Switch)
        });
        if both_switches {
            steps.push(ProcessSpec::new("ip").args(["link", "delete", link.a.ifname.as_str()]));
        }
    }

    for node in topology.nodes() {
        match node.role {
            NodeRole::Router | NodeRole::Host => {
                steps.push(ProcessSpec::new("ip").args(["netns", "delete", node.name.as_str()]));
            }
            NodeRole::Switch => {
                steps.push(ProcessSpec::new("ovs-vsctl").args([
                    "--if-exists",
                    "del-br",
                    node.name.as_str(),
                ]));
            }
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{backbone, sdn};

    fn rendered(steps: &[ProcessSpec]) -> Vec<String> {
        steps.iter().map(|s| s.rendered()).collect()
    }

    #[test]
    fn test_in_netns_wrapping() {
        let spec = ProcessSpec::new("sysctl").args(["-w", "net.ipv4.ip_forward=1"]);
        assert_eq!(
            in_netns("r1", &spec).rendered(),
            "ip netns exec r1 sysctl -w net.ipv4.ip_forward=1"
        );
    }

    #[test]
    fn test_backbone_setup_plan_contents() {
        let config = LabConfig::default();
        let plan = rendered(&setup_plan(&backbone(), &config));

        assert!(plan.contains(&"ip netns add r1".to_string()));
        assert!(plan.contains(&"ip netns exec r1 ip addr add 192.168.5.1/30 dev r1-eth1".to_string()));
        assert!(plan.contains(&"ip netns exec r1 ip addr add 192.168.0.1/24 dev r1-eth0".to_string()));
        assert!(plan.contains(&"ip netns exec r4 ip addr add 192.168.5.9/30 dev r4-eth1".to_string()));
        assert!(plan.contains(&"ip netns exec r1 sysctl -w net.ipv4.ip_forward=1".to_string()));
        assert!(plan.contains(&"ip netns exec h1 ip route add default via 192.168.0.1".to_string()));
        // no switches in the backbone lab
        assert!(!plan.iter().any(|s| s.starts_with("ovs-vsctl")));
    }

    #[test]
    fn test_namespaces_created_before_links() {
        let config = LabConfig::default();
        let plan = rendered(&setup_plan(&backbone(), &config));
        let last_ns_add = plan
            .iter()
            .rposition(|s| s.starts_with("ip netns add"))
            .unwrap();
        let first_link = plan.iter().position(|s| s.starts_with("ip link add")).unwrap();
        assert!(last_ns_add < first_link);
    }

    #[test]
    fn test_sdn_setup_plan_wires_controller() {
        let config = LabConfig::default();
        let plan = rendered(&setup_plan(&sdn(), &config));

        assert!(plan.contains(&"ovs-vsctl add-br s1".to_string()));
        assert!(plan
            .contains(&"ovs-vsctl set bridge s1 other-config:datapath-id=1000000000000001".to_string()));
        assert!(plan.contains(&"ovs-vsctl set-controller s1 tcp:192.168.56.106:6654".to_string()));
        assert!(plan.contains(&"ovs-vsctl add-port s1 s1-eth1".to_string()));
        assert!(plan.contains(&"ovs-vsctl add-port s1 s1-eth2".to_string()));
    }

    #[test]
    fn test_stop_plan_disables_forwarding_then_deletes() {
        let plan = rendered(&stop_plan(&backbone()));
        let sysctl_off = plan
            .iter()
            .position(|s| s == "ip netns exec r1 sysctl -w net.ipv4.ip_forward=0")
            .unwrap();
        let ns_delete = plan.iter().position(|s| s == "ip netns delete r1").unwrap();
        assert!(sysctl_off < ns_delete);
    }

    #[test]
    fn test_sdn_stop_plan_removes_bridges() {
        let plan = rendered(&stop_plan(&sdn()));
        assert!(plan.contains(&"ovs-vsctl --if-exists del-br s1".to_string()));
        assert!(plan.contains(&"ip netns delete h3".to_string()));
    }
}
