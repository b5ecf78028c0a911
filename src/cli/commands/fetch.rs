use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use super::{build_resolver, ResolveOptions};
use crate::config::{self, DEFAULT_PORTFOLIO_FILE};
use crate::data_paths::DataPaths;
use crate::holdings::ResolutionResult;

#[derive(Args, Clone)]
pub struct FetchArgs {
    /// Portfolio file whose funds should be fetched
    #[arg(long, default_value = DEFAULT_PORTFOLIO_FILE)]
    pub portfolio: PathBuf,

    /// Re-fetch even when the cache is fresh
    #[arg(long)]
    pub refresh: bool,

    /// Cache entries older than this are re-fetched
    #[arg(long, default_value_t = 24)]
    pub max_age_hours: i64,
}

pub struct FetchCommand {
    args: FetchArgs,
}

impl FetchCommand {
    pub fn new(args: FetchArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let lines = config::load_portfolio(&self.args.portfolio)?;
        let references: Vec<String> = lines
            .iter()
            .filter_map(|line| line.fund_reference().map(str::to_string))
            .collect();

        if references.is_empty() {
            println!("{}", "📍 No fund lines in portfolio, nothing to fetch".bright_yellow());
            return Ok(());
        }

        println!(
            "{}",
            format!("🔄 Fetching holdings for {} fund(s)...", references.len()).bright_blue()
        );

        let resolver = build_resolver(
            &data_paths,
            ResolveOptions {
                offline: false,
                force_refresh: self.args.refresh,
                max_age_hours: self.args.max_age_hours,
            },
        )?;
        let resolutions = resolver.resolve_many(&references, self.args.refresh).await;

        let mut failures = 0;
        for reference in &references {
            match resolutions.get(reference) {
                Some(ResolutionResult::Resolved {
                    constituents,
                    report,
                    stale,
                }) => {
                    let status = if *stale {
                        format!("{} (stale cache)", "⚠️".bright_yellow())
                    } else {
                        format!("{}", "✓".bright_green())
                    };
                    println!(
                        "  {} {} - {} holdings ({} dropped)",
                        status,
                        reference,
                        constituents.len().to_string().bright_green(),
                        report.rows_dropped
                    );
                }
                Some(ResolutionResult::Unresolved { reason }) => {
                    failures += 1;
                    println!(
                        "  {} {} - {}",
                        "❌".bright_red(),
                        reference,
                        reason.bright_red()
                    );
                }
                None => {}
            }
        }

        if failures > 0 {
            println!(
                "\n{}",
                format!("⚠️  {} fund(s) could not be fetched", failures).bright_yellow()
            );
        } else {
            println!("\n{}", "✅ All funds fetched and cached".bright_green());
        }
        Ok(())
    }
}
