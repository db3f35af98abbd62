#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the tourism map pipeline.
//!
//! Turns the parsed establishment export into the two dashboard artifacts:
//! per-municipality KPIs and the establishment density surface.

mod output;
mod pipeline;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tourism_map_config::PipelineConfig;

#[derive(Parser)]
#[command(name = "tourism_map_cli", about = "Tourism establishment map pipeline")]
struct Cli {
    /// TOML file overriding the built-in configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, categorise and geolocate establishments, then attach room
    /// totals
    Prepare,
    /// Aggregate prepared establishments into per-municipality KPIs
    Municipalities,
    /// Estimate establishment density over the region
    Density,
    /// Run every stage, writing outputs only if all succeed
    All,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::embedded()?,
    };

    let start = Instant::now();
    match cli.command {
        Commands::Prepare => {
            let records = pipeline::prepare(&config)?;
            log::info!(
                "Prepared {} establishments in {:.1}s",
                records.len(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Municipalities => {
            pipeline::municipalities(&config)?;
            log::info!(
                "Municipality KPIs complete in {:.1}s",
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Density => {
            pipeline::density(&config)?;
            log::info!(
                "Density estimation complete in {:.1}s",
                start.elapsed().as_secs_f64()
            );
        }
        Commands::All => pipeline::run_all(&config)?,
    }

    Ok(())
}
