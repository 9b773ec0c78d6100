mod cli;
mod order;
mod repl;
mod signals;

use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use plazza_fleet::{FleetConfig, KitchenManager};

use crate::cli::Cli;
use crate::repl::Repl;

const IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const RETIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            process::exit(84);
        }
    };

    if !cli.arguments_are_valid() {
        eprintln!("usage: plazza <multiplier> <cooks_per_kitchen> <restock_time_ms>");
        eprintln!("all three arguments must be positive");
        process::exit(84);
    }

    if let Err(err) = plazza_protocol::logging::init(&cli.log_file, cli.verbose) {
        eprintln!("failed to open log file {:?}: {err}", cli.log_file);
        process::exit(84);
    }

    signals::install().context("failed to install signal handlers")?;

    let config = FleetConfig {
        cooks_per_kitchen: cli.cooks_per_kitchen as u32,
        restock_period: Duration::from_millis(cli.restock_time_ms),
        idle_timeout: IDLE_TIMEOUT,
        retire_timeout: RETIRE_TIMEOUT,
        verbose: cli.verbose,
    };
    let manager = KitchenManager::new(config);

    tracing::info!(
        multiplier = cli.multiplier,
        cooks_per_kitchen = cli.cooks_per_kitchen,
        restock_time_ms = cli.restock_time_ms,
        "plazza starting"
    );
    println!("plazza ready — type 'help' for the command list");

    Repl::new(&manager, cli.multiplier).run();

    manager.shutdown();
    tracing::info!("fleet shut down cleanly");
    Ok(())
}
