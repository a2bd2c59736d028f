//! The two lab topologies.
//!
//! Addressing convention: each router-router link sits on its own /30 out
//! of 192.168.5.0/24, each router fronts one stub /24 for its host. Router
//! defaults land on the first declared interface, matching how the host
//! subnets hang off the explicitly addressed `*-eth0` legs.

use std::net::Ipv4Addr;

use super::types::{Cidr, LinkEnd, Topology};

fn cidr(addr: [u8; 4], prefix_len: u8) -> Cidr {
    Cidr::new(Ipv4Addr::from(addr), prefix_len)
}

/// Four routers in a ring, one host behind each.
///
/// r1 -- r2 -- r3 -- r4 -- r1, with h1..h4 on the stub subnets
/// 192.168.0.0/24, 192.168.3.0/24, 192.168.1.0/24 and 192.168.4.0/24.
pub fn backbone() -> Topology {
    let mut topo = Topology::new("backbone");

    topo.add_router("r1", cidr([192, 168, 5, 1], 30));
    topo.add_router("r2", cidr([192, 168, 5, 2], 30));
    topo.add_router("r3", cidr([192, 168, 5, 6], 30));
    topo.add_router("r4", cidr([192, 168, 5, 9], 30));

    topo.add_host("h1", cidr([192, 168, 0, 2], 24), Ipv4Addr::new(192, 168, 0, 1));
    topo.add_host("h2", cidr([192, 168, 3, 2], 24), Ipv4Addr::new(192, 168, 3, 1));
    topo.add_host("h3", cidr([192, 168, 1, 2], 24), Ipv4Addr::new(192, 168, 1, 1));
    topo.add_host("h4", cidr([192, 168, 4, 2], 24), Ipv4Addr::new(192, 168, 4, 1));

    topo.add_link(LinkEnd::new("r1", "r1-eth1"), LinkEnd::new("r2", "r2-eth1"));
    topo.add_link(
        LinkEnd::new("r2", "r2-eth2").with_ip(cidr([192, 168, 5, 5], 30)),
        LinkEnd::new("r3", "r3-eth1"),
    );
    topo.add_link(
        LinkEnd::new("r4", "r4-eth1"),
        LinkEnd::new("r3", "r3-eth2").with_ip(cidr([192, 168, 5, 10], 30)),
    );
    topo.add_link(
        LinkEnd::new("r4", "r4-eth2").with_ip(cidr([192, 168, 5, 14], 30)),
        LinkEnd::new("r1", "r1-eth2").with_ip(cidr([192, 168, 5, 13], 30)),
    );

    topo.add_link(
        LinkEnd::new("h1", "h1-eth0"),
        LinkEnd::new("r1", "r1-eth0").with_ip(cidr([192, 168, 0, 1], 24)),
    );
    topo.add_link(
        LinkEnd::new("h2", "h2-eth0"),
        LinkEnd::new("r2", "r2-eth0").with_ip(cidr([192, 168, 3, 1], 24)),
    );
    topo.add_link(
        LinkEnd::new("h3", "h3-eth0"),
        LinkEnd::new("r3", "r3-eth0").with_ip(cidr([192, 168, 1, 1], 24)),
    );
    topo.add_link(
        LinkEnd::new("h4", "h4-eth0"),
        LinkEnd::new("r4", "r4-eth0").with_ip(cidr([192, 168, 4, 1], 24)),
    );

    topo
}

/// Three routers in a triangle, each fronting an OpenFlow switch with one
/// host behind it. The switches are controlled by the external controller
/// named in the lab configuration; hosts never attach to routers directly.
pub fn sdn() -> Topology {
    let mut topo = Topology::new("sdn");

    topo.add_router("r1", cidr([192, 168, 5, 1], 30));
    topo.add_router("r2", cidr([192, 168, 5, 2], 30));
    topo.add_router("r3", cidr([192, 168, 5, 6], 30));

    topo.add_switch("s1", "1000000000000001");
    topo.add_switch("s2", "1000000000000002");
    topo.add_switch("s3", "1000000000000003");

    topo.add_host("h1", cidr([192, 168, 0, 2], 24), Ipv4Addr::new(192, 168, 0, 1));
    topo.add_host("h2", cidr([192, 168, 3, 2], 24), Ipv4Addr::new(192, 168, 3, 1));
    topo.add_host("h3", cidr([192, 168, 1, 2], 24), Ipv4Addr::new(192, 168, 1, 1));

    topo.add_link(LinkEnd::new("r1", "r1-eth1"), LinkEnd::new("r2", "r2-eth1"));
    topo.add_link(
        LinkEnd::new("r2", "r2-eth2").with_ip(cidr([192, 168, 5, 5], 30)),
        LinkEnd::new("r3", "r3-eth1"),
    );
    topo.add_link(
        LinkEnd::new("r3", "r3-eth2").with_ip(cidr([192, 168, 5, 10], 30)),
        LinkEnd::new("r1", "r1-eth2").with_ip(cidr([192, 168, 5, 9], 30)),
    );

    topo.add_link(
        LinkEnd::new("s1", "s1-eth1"),
        LinkEnd::new("r1", "r1-eth0").with_ip(cidr([192, 168, 0, 1], 24)),
    );
    topo.add_link(
        LinkEnd::new("s2", "s2-eth1"),
        LinkEnd::new("r2", "r2-eth0").with_ip(cidr([192, 168, 3, 1], 24)),
    );
    topo.add_link(
        LinkEnd::new("s3", "s3-eth1"),
        LinkEnd::new("r3", "r3-eth0").with_ip(cidr([192, 168, 1, 1], 24)),
    );

    topo.add_link(LinkEnd::new("h1", "h1-eth0"), LinkEnd::new("s1", "s1-eth2"));
    topo.add_link(LinkEnd::new("h2", "h2-eth0"), LinkEnd::new("s2", "s2-eth2"));
    topo.add_link(LinkEnd::new("h3", "h3-eth0"), LinkEnd::new("s3", "s3-eth2"));

    topo
}
