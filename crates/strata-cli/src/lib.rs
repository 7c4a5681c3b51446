//! Strata CLI library

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod error;

pub use error::{Error, Result};

/// Strata - ordered platform composition and manifest chains
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Deployment config file (defaults to $STRATA_CONFIG, then ./strata.yaml)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the platform composition and print the ordered plan
    Plan(commands::plan::PlanArgs),
    /// Load or apply ordered manifest chains
    #[command(subcommand)]
    Manifests(commands::manifests::ManifestsCommand),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let config = self.config.as_deref();
        match self.command {
            Commands::Plan(args) => commands::plan::run(args, config).await,
            Commands::Manifests(cmd) => commands::manifests::run(cmd, config).await,
        }
    }
}
