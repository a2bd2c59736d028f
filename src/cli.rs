//! Interactive lab shell.
//!
//! A reedline prompt bound to the running emulation. Any first word that
//! is not a built-in command is treated as a node name and the rest of the
//! line runs on that node.

use std::net::Ipv4Addr;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};

use crate::emulation::Emulation;
use crate::routes::RouteTable;

enum Flow {
    Continue,
    Quit,
}

/// Run the shell until the operator exits it.
pub fn shell(emulation: &Emulation) -> Result<()> {
    println!("isislab shell: 'help' lists commands, 'exit' tears the lab down");

    let mut editor = Reedline::create();
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("isislab".to_string()),
        DefaultPromptSegment::Empty,
    );

    loop {
        match editor.read_line(&prompt).wrap_err("failed to read shell input")? {
            Signal::Success(line) => {
                if let Flow::Quit = dispatch(emulation, line.trim()) {
                    break;
                }
            }
            Signal::CtrlC => continue,
            Signal::CtrlD => break,
        }
    }
    Ok(())
}

fn dispatch(emulation: &Emulation, line: &str) -> Flow {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Flow::Continue;
    };
    let args: Vec<&str> = words.collect();

    match command {
        "exit" | "quit" => return Flow::Quit,
        "help" => print_help(),
        "nodes" => {
            for node in emulation.topology().nodes() {
                println!("{} ({})", node.name, node.role);
            }
        }
        "links" => {
            for link in emulation.topology().links() {
                println!(
                    "{}:{} -- {}:{}",
                    link.a.node, link.a.ifname, link.b.node, link.b.ifname
                );
            }
        }
        "routes" => routes(emulation, &args),
        "ping" => ping(emulation, &args),
        node => {
            let rest = line[command.len()..].trim_start();
            node_command(emulation, node, rest);
        }
    }
    Flow::Continue
}

fn print_help() {
    println!("  help                      this text");
    println!("  nodes                     list declared nodes");
    println!("  links                     list declared links");
    println!("  routes <router>           parsed forwarding table of a router");
    println!("  ping <src> <dst> [count]  ping a node or address from a node");
    println!("  <node> <command...>       run a command on a node");
    println!("  exit | quit               leave the shell and tear down");
}

fn routes(emulation: &Emulation, args: &[&str]) {
    let &[router] = args else {
        println!("usage: routes <router>");
        return;
    };
    let Some(handle) = emulation.node(router) else {
        println!("unknown node '{router}'");
        return;
    };
    match handle.cmd("route -n") {
        Ok(out) if out.status.success() => match RouteTable::parse(&out.stdout) {
            Ok(table) => print!("{table}"),
            // fall back to the raw capture rather than hiding it
            Err(_) => print!("{}", out.stdout),
        },
        Ok(out) => println!("route -n failed on {router}: {}", out.stderr.trim_end()),
        Err(err) => println!("route -n failed on {router}: {err}"),
    }
}

/// Address of a node's first numbered interface.
fn first_ip(emulation: &Emulation, node: &str) -> Option<Ipv4Addr> {
    emulation
        .topology()
        .interfaces_of(node)
        .into_iter()
        .find_map(|iface| iface.ip.map(|ip| ip.addr))
}

fn ping(emulation: &Emulation, args: &[&str]) {
    let (src, dst, count) = match *args {
        [src, dst] => (src, dst, 3u32),
        [src, dst, count] => match count.parse() {
            Ok(count) => (src, dst, count),
            Err(_) => {
                println!("invalid count '{count}'");
                return;
            }
        },
        _ => {
            println!("usage: ping <src> <dst> [count]");
            return;
        }
    };

    let Some(handle) = emulation.node(src) else {
        println!("unknown node '{src}'");
        return;
    };
    let target = match first_ip(emulation, dst) {
        Some(addr) => addr,
        None => match dst.parse() {
            Ok(addr) => addr,
            Err(_) => {
                println!("'{dst}' is neither a known node nor an address");
                return;
            }
        },
    };

    match handle.cmd(&format!("ping -c {count} {target}")) {
        Ok(out) => {
            print!("{}", out.stdout);
            if !out.status.success() {
                print!("{}", out.stderr);
            }
        }
        Err(err) => println!("ping failed on {src}: {err}"),
    }
}

fn node_command(emulation: &Emulation, node: &str, command: &str) {
    let Some(handle) = emulation.node(node) else {
        println!("unknown command or node '{node}' ('help' lists commands)");
        return;
    };
    if command.is_empty() {
        println!("usage: {node} <command...>");
        return;
    }
    match handle.cmd(command) {
        Ok(out) => {
            print!("{}", out.stdout);
            if !out.stderr.is_empty() {
                eprint!("{}", out.stderr);
            }
        }
        Err(err) => println!("command failed on {node}: {err}"),
    }
}
