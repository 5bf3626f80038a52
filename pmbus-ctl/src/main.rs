//! `pmbus`: read, decode and configure PMBus power modules over Linux i2c-dev.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use pmbus_ctl::cmd::{self, Command, Session};
use pmbus_ctl::config::{Config, FamilySelect};
use pmbus_ctl::error::exit_code_for;
use pmbus_ctl::parse::parse_addr;
use pmbus_ctl::tracing::prelude::*;
use pmbus_ctl::{output, tracing, transport};

/// PMBus register access for Flex BMR power modules
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// i2c-dev adapter [default: /dev/i2c-1, or $PMBUS_BUS]
    #[arg(long, global = true)]
    bus: Option<PathBuf>,

    /// 7-bit device address [default: 0x40, or $PMBUS_ADDR]
    #[arg(long, global = true, value_parser = parse_addr)]
    addr: Option<u8>,

    /// auto, bmr685 or bmr456 [default: auto, or $PMBUS_FAMILY]
    #[arg(long, global = true)]
    family: Option<FamilySelect>,

    /// Single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    /// More logging on stderr; repeat for register traffic
    #[arg(short = 'd', long = "debug", global = true, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::from_env().context("invalid PMBUS_* environment")?;
        if let Some(bus) = &self.bus {
            config.bus = bus.clone();
        }
        if let Some(addr) = self.addr {
            config.addr = addr;
        }
        if let Some(family) = self.family {
            config.family = family;
        }
        if self.compact {
            config.pretty = false;
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config()?;
    debug!(bus = %config.bus.display(), addr = %format!("0x{:02X}", config.addr), "Configuration");

    let document = if cli.command.needs_bus() {
        let bus = transport::open(&config.bus, config.addr)
            .with_context(|| format!("opening device 0x{:02X} on {}", config.addr, config.bus.display()))?;
        let mut session = Session::connect(bus, config.family);
        cmd::run(&mut session, &cli.command).context("command failed")?
    } else {
        cmd::registers(config.family)
    };

    output::emit(&document, &config.output()).context("writing output")?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    tracing::init_stderr(cli.debug);

    if let Err(err) = run(&cli) {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(exit_code_for(&err));
    }
}
