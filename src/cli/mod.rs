//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the harvester using clap.

pub mod commands;

use clap::{Parser, Subcommand};
use crate::config::DEFAULT_CONFIG_PATH;

/// Harvester - resumable FHIR encounter harvester
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(version, about, long_about = None)]
#[command(author = "Harvester Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "HARVESTER_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HARVESTER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Harvest encounters day by day and publish them to the queue
    Harvest(commands::harvest::HarvestArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the cursor and quarantine sets
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
