#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for compiling, solving and editing platformer levels.

mod config;
mod layout_transfer;
mod logging;
mod report;
mod simulate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::{
    config::{load_level, Settings},
    layout_transfer::LevelSnapshot,
};

/// Plans and evaluates jump routes through tile levels.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// TOML file with [jump], [controller] and [evaluator] tables
    #[arg(short, long, global = true)]
    tuning: Option<PathBuf>,
    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Compile the level and print the agent's route to the goal
    Plan {
        /// Level file, one row per line
        level: PathBuf,
    },
    /// Rank terrain edits around the route's most expensive jump
    Evaluate {
        /// Level file, one row per line
        level: PathBuf,
        /// Score edits against the player's route instead of the agent's
        #[arg(long)]
        opponent: bool,
    },
    /// Follow the route with the trajectory controller
    Simulate {
        /// Level file, one row per line
        level: PathBuf,
        /// Maximum number of 60 Hz ticks to run
        #[arg(long, default_value_t = 1_200)]
        ticks: u32,
    },
    /// Print a single-line snapshot of a level file
    Export {
        /// Level file, one row per line
        level: PathBuf,
    },
    /// Print the level rows stored in a snapshot
    Import {
        /// Snapshot produced by `export`
        snapshot: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let settings = Settings::load(args.tuning.as_deref())?;
    for line in run(args.command, &settings)? {
        println!("{line}");
    }
    Ok(())
}

fn run(mode: Mode, settings: &Settings) -> Result<Vec<String>> {
    match mode {
        Mode::Plan { level } => Ok(report::plan(&load_level(&level)?, settings)),
        Mode::Evaluate { level, opponent } => {
            report::evaluate(&load_level(&level)?, settings, opponent)
        }
        Mode::Simulate { level, ticks } => report::simulate(&load_level(&level)?, settings, ticks),
        Mode::Export { level } => {
            let snapshot = LevelSnapshot::capture(&load_level(&level)?)
                .with_context(|| format!("cannot export {}", level.display()))?;
            Ok(vec![snapshot.encode()?])
        }
        Mode::Import { snapshot } => {
            let snapshot = LevelSnapshot::decode(&snapshot).context("invalid level snapshot")?;
            Ok(snapshot.grid.to_rows())
        }
    }
}
