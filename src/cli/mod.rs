//! CLI module for foliox
//!
//! Command-line interface for the look-through exposure analyzer. Uses
//! clap for argument parsing and a structured command pattern: each
//! subcommand owns an `Args` struct and a `Command` that executes it
//! against the shared data directory.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

use crate::data_paths::{DataPaths, DEFAULT_DATA_DIR};
use crate::logging::{self, LoggingConfig};

use commands::analyze::{AnalyzeArgs, AnalyzeCommand};
use commands::cache::{CacheArgs, CacheCommand};
use commands::export::{ExportArgs, ExportCommand};
use commands::fetch::{FetchArgs, FetchCommand};
use commands::init::{InitArgs, InitCommand};

#[derive(Parser)]
#[command(name = "foliox")]
#[command(version)]
#[command(about = "Look-through exposure analysis for ETF portfolios", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory path (default: ./data)
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter portfolio file
    Init(InitArgs),

    /// Resolve the portfolio and print exposure breakdowns
    Analyze(AnalyzeArgs),

    /// Pre-fetch raw holdings for every fund line
    Fetch(FetchArgs),

    /// Inspect or clear the raw holdings cache
    Cache(CacheArgs),

    /// Write every exposure view as CSV
    Export(ExportArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let data_paths = DataPaths::new(&self.data_dir);

        // Ensure all directories exist
        data_paths.ensure_directories()?;

        logging::init_logging(LoggingConfig::new(data_paths.clone(), self.verbose))?;

        match self.command {
            Commands::Init(args) => InitCommand::new(args).execute(data_paths).await,
            Commands::Analyze(args) => AnalyzeCommand::new(args).execute(data_paths).await,
            Commands::Fetch(args) => FetchCommand::new(args).execute(data_paths).await,
            Commands::Cache(args) => CacheCommand::new(args).execute(data_paths).await,
            Commands::Export(args) => ExportCommand::new(args).execute(data_paths).await,
        }
    }
}
