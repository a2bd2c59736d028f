//! Topology-shape and sequencing properties of the two lab presets.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use isislab::config::LabConfig;
use isislab::quagga::{self, configgen};
use isislab::topology::{backbone, sdn, NodeRole, Topology};

fn node_role(topo: &Topology, name: &str) -> NodeRole {
    topo.node(name).unwrap().role
}

#[test]
fn test_backbone_shape() {
    let topo = backbone();
    assert!(topo.validate().is_ok());

    assert_eq!(topo.routers().count(), 4);
    assert_eq!(topo.hosts().count(), 4);
    assert_eq!(topo.switches().count(), 0);
    assert_eq!(topo.links().len(), 8);

    let router_links = topo
        .links()
        .iter()
        .filter(|l| {
            node_role(&topo, &l.a.node) == NodeRole::Router
                && node_role(&topo, &l.b.node) == NodeRole::Router
        })
        .count();
    assert_eq!(router_links, 4);
}

#[test]
fn test_backbone_r1_addresses() {
    let topo = backbone();
    let interfaces = topo.interfaces_of("r1");

    let host_facing = interfaces.iter().find(|i| i.name == "r1-eth0").unwrap();
    assert_eq!(host_facing.ip.unwrap().to_string(), "192.168.0.1/24");

    let r2_facing = interfaces.iter().find(|i| i.name == "r1-eth1").unwrap();
    assert_eq!(r2_facing.ip.unwrap().to_string(), "192.168.5.1/30");
}

#[test]
fn test_every_router_toggles_forwarding() {
    for topo in [backbone(), sdn()] {
        for router in topo.routers() {
            let enables = router
                .start_actions
                .iter()
                .any(|a| a.rendered() == "sysctl -w net.ipv4.ip_forward=1");
            let disables = router
                .stop_actions
                .iter()
                .any(|a| a.rendered() == "sysctl -w net.ipv4.ip_forward=0");
            assert!(enables, "{} does not enable forwarding on start", router.name);
            assert!(disables, "{} does not disable forwarding on stop", router.name);
        }
    }
}

#[test]
fn test_sdn_shape() {
    let topo = sdn();
    assert!(topo.validate().is_ok());

    assert_eq!(topo.routers().count(), 3);
    assert_eq!(topo.switches().count(), 3);
    assert_eq!(topo.hosts().count(), 3);
}

#[test]
fn test_sdn_hosts_attach_only_to_switches() {
    let topo = sdn();
    for host in topo.hosts() {
        for link in topo.links() {
            if let Some(peer) = link.peer_of(&host.name) {
                assert_eq!(
                    node_role(&topo, &peer.node),
                    NodeRole::Switch,
                    "{} attaches to non-switch {}",
                    host.name,
                    peer.node
                );
            }
        }
    }
}

#[test]
fn test_no_dangling_link_endpoints() {
    for topo in [backbone(), sdn()] {
        let declared: HashSet<_> = topo.nodes().iter().map(|n| n.name.as_str()).collect();
        for link in topo.links() {
            assert!(declared.contains(link.a.node.as_str()));
            assert!(declared.contains(link.b.node.as_str()));
        }
    }
}

#[test]
fn test_node_names_are_unique() {
    for topo in [backbone(), sdn()] {
        let mut seen = HashSet::new();
        for node in topo.nodes() {
            assert!(seen.insert(node.name.clone()), "duplicate node {}", node.name);
        }
    }
}

#[test]
fn test_isisd_never_precedes_zebra() {
    let config = LabConfig::default();
    let plan = quagga::launch_plan(&backbone(), &config);

    // the driver runs all zebra invocations, then waits on each socket
    // before the matching isisd; the plan pairs them per router
    for launch in &plan {
        assert_eq!(launch.zebra.args[3], config.zebra_bin);
        assert_eq!(launch.isisd.args[3], config.isisd_bin);
        let socket = launch.socket.display().to_string();
        assert!(launch.zebra.args.contains(&socket));
        assert!(launch.isisd.args.contains(&socket));
    }

    let routers: Vec<_> = plan.iter().map(|l| l.router.as_str()).collect();
    assert_eq!(routers, ["r1", "r2", "r3", "r4"]);
}

#[test]
fn test_launch_and_teardown_leave_no_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LabConfig::default();
    config.run_dir = dir.path().to_path_buf();
    config.conf_dir = dir.path().join("conf");

    let topo = backbone();
    configgen::write_configs(&topo, &config).unwrap();

    // simulate the daemons creating their runtime artifacts
    for launch in quagga::launch_plan(&topo, &config) {
        std::fs::write(&launch.socket, b"").unwrap();
    }
    for router in topo.routers() {
        let paths = quagga::router_paths(&router.name, &config);
        std::fs::write(&paths.zebra_interface, b"").unwrap();
        std::fs::write(&paths.isisd_interface, b"").unwrap();
    }

    let removed = quagga::remove_artifacts(&config.run_dir).unwrap();
    assert_eq!(removed, 12);

    // nothing matching the artifact patterns survives, configs do
    for entry in std::fs::read_dir(&config.run_dir).unwrap() {
        let path = entry.unwrap().path();
        let ext = path.extension().and_then(|e| e.to_str());
        assert!(!matches!(ext, Some("api") | Some("interface")), "{path:?} survived");
    }
    assert!(config.conf_dir.join("r1zebra.conf").exists());

    // teardown twice in a row is clean
    assert_eq!(quagga::remove_artifacts(&config.run_dir).unwrap(), 0);
}

#[test]
fn test_generated_configs_enable_isis_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LabConfig::default();
    config.conf_dir = dir.path().to_path_buf();

    let topo = sdn();
    let written = configgen::write_configs(&topo, &config).unwrap();
    assert_eq!(written, 6);

    let r2 = std::fs::read_to_string(dir.path().join("r2isisd.conf")).unwrap();
    assert!(r2.contains("router isis LAB"));
    assert!(r2.contains("net 49.0001.0000.0000.0002.00"));
    assert!(r2.contains("interface r2-eth0"));
    assert!(r2.contains("interface r2-eth1"));
    assert!(r2.contains("interface r2-eth2"));
}

#[test]
fn test_sdn_router_triangle_addresses() {
    let topo = sdn();

    let r3 = topo.interfaces_of("r3");
    assert_eq!(
        r3.iter().find(|i| i.name == "r3-eth2").unwrap().ip.unwrap().to_string(),
        "192.168.5.10/30"
    );

    for host in topo.hosts() {
        let gateway = topo.node(&host.name).unwrap().default_route.unwrap();
        assert_ne!(gateway, Ipv4Addr::UNSPECIFIED);
    }
}
