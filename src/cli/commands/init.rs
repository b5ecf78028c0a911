use anyhow::{anyhow, Result};
use clap::Args;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::config::{DEFAULT_PORTFOLIO_FILE, STARTER_PORTFOLIO};
use crate::data_paths::DataPaths;

#[derive(Args, Clone)]
pub struct InitArgs {
    /// Portfolio file to create
    #[arg(long, default_value = DEFAULT_PORTFOLIO_FILE)]
    pub portfolio: PathBuf,

    /// Overwrite an existing portfolio file
    #[arg(long)]
    pub force: bool,
}

pub struct InitCommand {
    args: InitArgs,
}

impl InitCommand {
    pub fn new(args: InitArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, _data_paths: DataPaths) -> Result<()> {
        if self.args.portfolio.exists() && !self.args.force {
            return Err(anyhow!(
                "{} already exists (use --force to overwrite)",
                self.args.portfolio.display()
            ));
        }

        std::fs::write(&self.args.portfolio, STARTER_PORTFOLIO)?;
        println!(
            "{}",
            format!("✅ Wrote starter portfolio to {}", self.args.portfolio.display())
                .bright_green()
        );
        println!(
            "{}",
            "   Edit it, then run: foliox analyze".bright_black()
        );
        Ok(())
    }
}
