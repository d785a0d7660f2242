mod config;
mod manager;
mod model;
mod outliers;
mod plot;
mod stats;
mod table;
mod weekday;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    work_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Average consumption per day of the week.
    Weekday,

    /// Flag observations outside the forecast prediction interval.
    Outliers,

    /// Remove generated reports and charts.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.work_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Weekday => mgr.run_weekday()?,
        Command::Outliers => mgr.run_outliers()?,
        Command::Clean => mgr.clean()?,
    }

    Ok(())
}
