//! `taosgen`: synthetic time-series data generator and load driver.
//!
//! USAGE:
//!     taosgen -c <config.yaml> [--host HOST] [--port PORT] [--user USER]
//!             [--password PASSWORD] [-v]
//!
//! Connection flags override the same settings in the environment
//! (`TAOS_HOST`, `TAOS_PORT`, `TAOS_USER`, `TAOS_PASSWORD`) which in turn
//! override the YAML configuration file passed via `-c`.

mod cli;
mod compress;
mod config;
mod orchestrator;
mod table_names;
mod writer;

use clap::Parser;
use cli::Cli;
use config::RunConfig;
use log::LevelFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::new().filter_level(LevelFilter::Debug).init();
    } else {
        env_logger::init();
    }

    let mut config = RunConfig::load(&cli.config)?;
    config.apply_overrides(&cli);

    let summary = orchestrator::run(&config, &cli.config)?;
    log::info!(
        "run complete: {} rows written in {:.2}s",
        summary.total_rows_written,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
