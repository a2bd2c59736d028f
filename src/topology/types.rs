//! Topology type definitions.
//!
//! A [`Topology`] is a pure value: the declared nodes, their roles and
//! default addresses, and the links between named interfaces. It is built
//! by a factory function, validated once, and passed to the emulation layer
//! unchanged. Nothing here touches the system.

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::process::ProcessSpec;

/// Topology declaration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("link references undeclared node '{0}'")]
    UnknownEndpoint(String),

    #[error("link connects node '{0}' to itself")]
    SelfLink(String),

    #[error("duplicate interface '{ifname}' on node '{node}'")]
    DuplicateInterface { node: String, ifname: String },

    #[error("invalid CIDR address '{0}'")]
    InvalidCidr(String),
}

/// An IPv4 address with prefix length, e.g. `192.168.5.1/30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl Cidr {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        Self { addr, prefix_len }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for Cidr {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TopologyError::InvalidCidr(s.to_string());
        let (addr, len) = s.split_once('/').ok_or_else(invalid)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix_len: u8 = len.parse().map_err(|_| invalid())?;
        if prefix_len > 32 {
            return Err(invalid());
        }
        Ok(Self { addr, prefix_len })
    }
}

/// Role of a declared node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Namespaced node with IP forwarding enabled, runs the routing daemons.
    Router,
    /// Namespaced end host with a default route towards its gateway.
    Host,
    /// Open vSwitch bridge under the external OpenFlow controller.
    Switch,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Router => write!(f, "router"),
            NodeRole::Host => write!(f, "host"),
            NodeRole::Switch => write!(f, "switch"),
        }
    }
}

/// A declared node.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub role: NodeRole,
    /// Applied to the node's first declared interface unless that link
    /// endpoint carries its own address.
    pub default_ip: Option<Cidr>,
    /// Default gateway, set for hosts.
    pub default_route: Option<Ipv4Addr>,
    /// OpenFlow datapath id, set for switches.
    pub dpid: Option<String>,
    /// Commands run inside the node once it is up.
    pub start_actions: Vec<ProcessSpec>,
    /// Commands run inside the node before it is torn down.
    pub stop_actions: Vec<ProcessSpec>,
}

/// One endpoint of a link: the owning node, the interface name on that
/// node, and an optional address overriding the node default.
#[derive(Debug, Clone)]
pub struct LinkEnd {
    pub node: String,
    pub ifname: String,
    pub ip: Option<Cidr>,
}

impl LinkEnd {
    pub fn new(node: impl Into<String>, ifname: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ifname: ifname.into(),
            ip: None,
        }
    }

    pub fn with_ip(mut self, ip: Cidr) -> Self {
        self.ip = Some(ip);
        self
    }
}

/// An undirected link between two interfaces on two distinct nodes.
#[derive(Debug, Clone)]
pub struct LinkSpec {
    pub a: LinkEnd,
    pub b: LinkEnd,
}

impl LinkSpec {
    /// The endpoint on `node`, if any.
    pub fn end_on(&self, node: &str) -> Option<&LinkEnd> {
        if self.a.node == node {
            Some(&self.a)
        } else if self.b.node == node {
            Some(&self.b)
        } else {
            None
        }
    }

    /// The endpoint opposite `node`, if `node` is on this link.
    pub fn peer_of(&self, node: &str) -> Option<&LinkEnd> {
        if self.a.node == node {
            Some(&self.b)
        } else if self.b.node == node {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// A resolved interface view: name plus the address it ends up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub ip: Option<Cidr>,
}

/// The full declared network: nodes and links.
#[derive(Debug, Clone)]
pub struct Topology {
    pub name: String,
    nodes: Vec<NodeSpec>,
    links: Vec<LinkSpec>,
}

impl Topology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Declare a router. Routers enable IPv4 forwarding on start and
    /// disable it again on stop.
    pub fn add_router(&mut self, name: &str, default_ip: Cidr) {
        self.nodes.push(NodeSpec {
            name: name.to_string(),
            role: NodeRole::Router,
            default_ip: Some(default_ip),
            default_route: None,
            dpid: None,
            start_actions: vec![ProcessSpec::new("sysctl")
                .args(["-w", "net.ipv4.ip_forward=1"])],
            stop_actions: vec![ProcessSpec::new("sysctl")
                .args(["-w", "net.ipv4.ip_forward=0"])],
        });
    }

    /// Declare an end host with its address and default gateway.
    pub fn add_host(&mut self, name: &str, ip: Cidr, gateway: Ipv4Addr) {
        self.nodes.push(NodeSpec {
            name: name.to_string(),
            role: NodeRole::Host,
            default_ip: Some(ip),
            default_route: Some(gateway),
            dpid: None,
            start_actions: Vec::new(),
            stop_actions: Vec::new(),
        });
    }

    /// Declare an OpenFlow switch with its datapath id.
    pub fn add_switch(&mut self, name: &str, dpid: &str) {
        self.nodes.push(NodeSpec {
            name: name.to_string(),
            role: NodeRole::Switch,
            default_ip: None,
            default_route: None,
            dpid: Some(dpid.to_string()),
            start_actions: Vec::new(),
            stop_actions: Vec::new(),
        });
    }

    /// Declare a link between two endpoints.
    pub fn add_link(&mut self, a: LinkEnd, b: LinkEnd) {
        self.links.push(LinkSpec { a, b });
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn links(&self) -> &[LinkSpec] {
        &self.links
    }

    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn routers(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Router)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Host)
    }

    pub fn switches(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Switch)
    }

    /// The node's interfaces in link-declaration order, with addresses
    /// resolved: an endpoint override wins, otherwise the node's default
    /// address goes to its first interface.
    pub fn interfaces_of(&self, name: &str) -> Vec<Interface> {
        let default_ip = self.node(name).and_then(|n| n.default_ip);
        let mut interfaces = Vec::new();
        for link in &self.links {
            if let Some(end) = link.end_on(name) {
                let ip = match end.ip {
                    Some(ip) => Some(ip),
                    None if interfaces.is_empty() => default_ip,
                    None => None,
                };
                interfaces.push(Interface {
                    name: end.ifname.clone(),
                    ip,
                });
            }
        }
        interfaces
    }

    /// Check the declaration invariants: unique node names, both link
    /// endpoints on declared and distinct nodes, interface names unique
    /// per node.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut names = HashSet::new();
        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                return Err(TopologyError::DuplicateNode(node.name.clone()));
            }
        }

        let mut interfaces = HashSet::new();
        for link in &self.links {
            for end in [&link.a, &link.b] {
                if !names.contains(end.node.as_str()) {
                    return Err(TopologyError::UnknownEndpoint(end.node.clone()));
                }
                if !interfaces.insert((end.node.clone(), end.ifname.clone())) {
                    return Err(TopologyError::DuplicateInterface {
                        node: end.node.clone(),
                        ifname: end.ifname.clone(),
                    });
                }
            }
            if link.a.node == link.b.node {
                return Err(TopologyError::SelfLink(link.a.node.clone()));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "topology {}", self.name)?;
        for node in &self.nodes {
            write!(f, "  {} ({})", node.name, node.role)?;
            for iface in self.interfaces_of(&node.name) {
                match iface.ip {
                    Some(ip) => write!(f, " {}={}", iface.name, ip)?,
                    None => write!(f, " {}", iface.name)?,
                }
            }
            writeln!(f)?;
        }
        for link in &self.links {
            writeln!(
                f,
                "  link {}:{} -- {}:{}",
                link.a.node, link.a.ifname, link.b.node, link.b.ifname
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Cidr {
        s.parse().unwrap()
    }

    fn two_routers() -> Topology {
        let mut topo = Topology::new("test");
        topo.add_router("r1", cidr("10.0.0.1/30"));
        topo.add_router("r2", cidr("10.0.0.2/30"));
        topo
    }

    #[test]
    fn test_cidr_parse_and_display() {
        let ip = cidr("192.168.5.1/30");
        assert_eq!(ip.addr, Ipv4Addr::new(192, 168, 5, 1));
        assert_eq!(ip.prefix_len, 30);
        assert_eq!(ip.to_string(), "192.168.5.1/30");

        assert!("192.168.5.1".parse::<Cidr>().is_err());
        assert!("192.168.5.1/33".parse::<Cidr>().is_err());
        assert!("not-an-ip/24".parse::<Cidr>().is_err());
    }

    #[test]
    fn test_duplicate_node_name_rejected() {
        let mut topo = two_routers();
        topo.add_router("r1", cidr("10.0.1.1/30"));
        assert_eq!(
            topo.validate(),
            Err(TopologyError::DuplicateNode("r1".to_string()))
        );
    }

    #[test]
    fn test_dangling_endpoint_rejected() {
        let mut topo = two_routers();
        topo.add_link(LinkEnd::new("r1", "r1-eth1"), LinkEnd::new("r9", "r9-eth1"));
        assert_eq!(
            topo.validate(),
            Err(TopologyError::UnknownEndpoint("r9".to_string()))
        );
    }

    #[test]
    fn test_self_link_rejected() {
        let mut topo = two_routers();
        topo.add_link(LinkEnd::new("r1", "r1-eth1"), LinkEnd::new("r1", "r1-eth2"));
        assert_eq!(topo.validate(), Err(TopologyError::SelfLink("r1".to_string())));
    }

    #[test]
    fn test_duplicate_interface_rejected() {
        let mut topo = two_routers();
        topo.add_link(LinkEnd::new("r1", "r1-eth1"), LinkEnd::new("r2", "r2-eth1"));
        topo.add_link(LinkEnd::new("r1", "r1-eth1"), LinkEnd::new("r2", "r2-eth2"));
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::DuplicateInterface { .. })
        ));
    }

    #[test]
    fn test_default_ip_lands_on_first_interface() {
        let mut topo = two_routers();
        topo.add_link(LinkEnd::new("r1", "r1-eth1"), LinkEnd::new("r2", "r2-eth1"));
        topo.add_link(
            LinkEnd::new("r1", "r1-eth0").with_ip(cidr("192.168.0.1/24")),
            LinkEnd::new("r2", "r2-eth2"),
        );

        let interfaces = topo.interfaces_of("r1");
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[0].name, "r1-eth1");
        assert_eq!(interfaces[0].ip, Some(cidr("10.0.0.1/30")));
        assert_eq!(interfaces[1].name, "r1-eth0");
        assert_eq!(interfaces[1].ip, Some(cidr("192.168.0.1/24")));

        // r2's second interface has neither override nor default claim
        let interfaces = topo.interfaces_of("r2");
        assert_eq!(interfaces[1].ip, None);
    }

    #[test]
    fn test_router_forwarding_actions() {
        let topo = two_routers();
        let r1 = topo.node("r1").unwrap();
        assert_eq!(r1.start_actions.len(), 1);
        assert_eq!(r1.start_actions[0].rendered(), "sysctl -w net.ipv4.ip_forward=1");
        assert_eq!(r1.stop_actions[0].rendered(), "sysctl -w net.ipv4.ip_forward=0");
    }

    #[test]
    fn test_link_end_lookup() {
        let mut topo = two_routers();
        topo.add_link(LinkEnd::new("r1", "r1-eth1"), LinkEnd::new("r2", "r2-eth1"));
        let link = &topo.links()[0];
        assert_eq!(link.end_on("r1").unwrap().ifname, "r1-eth1");
        assert_eq!(link.peer_of("r1").unwrap().node, "r2");
        assert!(link.end_on("r3").is_none());
    }
}
