use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use isislab::config::LabConfig;
use isislab::driver::{self, RunOptions};
use isislab::quagga::configgen;
use isislab::topology::{self, Topology};

/// Emulation harness for Quagga IS-IS routing labs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Topology preset to emulate
    #[arg(short, long, value_enum, default_value = "backbone")]
    topology: TopologyChoice,

    /// Path to the lab configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the interactive shell and tear down right after launch
    #[arg(long)]
    batch: bool,

    /// Print the declared topology and exit
    #[arg(long)]
    print_topology: bool,

    /// Generate the Quagga configuration files and exit
    #[arg(long)]
    write_configs: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum TopologyChoice {
    /// Four routers in a ring, one host behind each
    Backbone,
    /// Three routers, three OpenFlow switches under the external controller
    Sdn,
}

impl TopologyChoice {
    fn build(self) -> Topology {
        match self {
            Self::Backbone => topology::backbone(),
            Self::Sdn => topology::sdn(),
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = LabConfig::load(args.config.as_deref())?;
    config.validate()?;

    let topology = args.topology.build();

    if args.print_topology {
        print!("{topology}");
        return Ok(());
    }

    if args.write_configs {
        let written = configgen::write_configs(&topology, &config)?;
        info!(
            "{written} configuration files written to '{}'",
            config.conf_dir.display()
        );
        return Ok(());
    }

    if unsafe { libc::geteuid() } != 0 {
        return Err(eyre!("isislab needs root to create network namespaces"));
    }

    info!("starting lab '{}'", topology.name);
    driver::run(
        topology,
        &config,
        &RunOptions {
            interactive: !args.batch,
        },
    )
}
