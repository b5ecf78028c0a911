use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use super::{load_and_resolve, ResolveOptions};
use crate::config::DEFAULT_PORTFOLIO_FILE;
use crate::data_paths::DataPaths;
use crate::display;
use crate::portfolio::{aggregate, compose, Dimension, PortfolioViews};

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    /// Portfolio file to analyze
    #[arg(long, default_value = DEFAULT_PORTFOLIO_FILE)]
    pub portfolio: PathBuf,

    /// Use cached holdings only, never fetch
    #[arg(long)]
    pub offline: bool,

    /// Force re-fetch of all fund holdings, ignoring cache freshness
    #[arg(long)]
    pub refresh: bool,

    /// Cache entries older than this are re-fetched
    #[arg(long, default_value_t = 24)]
    pub max_age_hours: i64,

    /// Rows shown per breakdown table
    #[arg(long, default_value_t = 15)]
    pub top: usize,

    /// Only print a single breakdown dimension
    #[arg(long, value_enum)]
    pub dimension: Option<Dimension>,

    /// Include equity and bond deep-dive tables
    #[arg(long)]
    pub detailed: bool,
}

pub struct AnalyzeCommand {
    args: AnalyzeArgs,
}

impl AnalyzeCommand {
    pub fn new(args: AnalyzeArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let opts = ResolveOptions {
            offline: self.args.offline,
            force_refresh: self.args.refresh,
            max_age_hours: self.args.max_age_hours,
        };

        println!(
            "{}",
            format!("🔄 Analyzing {}...", self.args.portfolio.display()).bright_blue()
        );
        let (lines, resolutions) =
            load_and_resolve(&self.args.portfolio, &data_paths, opts).await?;
        let (rows, report) = compose(&lines, &resolutions)?;

        if let Some(dimension) = self.args.dimension {
            let buckets = aggregate(&rows, dimension);
            display::print_breakdown(
                &format!("Exposure by {}", dimension),
                dimension.as_str(),
                &buckets,
                self.args.top,
            );
            display::print_warnings(&report);
            return Ok(());
        }

        let views = PortfolioViews::build(&rows);
        display::print_summary(&views.metrics);
        display::print_breakdown("Asset allocation", "Asset Class", &views.global_by_asset, self.args.top);
        display::print_breakdown("Geographic exposure", "Country", &views.global_by_country, self.args.top);
        display::print_breakdown("Sector exposure", "Sector", &views.global_by_sector, self.args.top);
        display::print_breakdown(
            "Top single holdings (share of equity)",
            "Holding",
            &views.equity_by_holding,
            self.args.top,
        );

        if self.args.detailed {
            display::print_breakdown("Equity by sector", "Sector", &views.equity_by_sector, self.args.top);
            display::print_breakdown("Equity by country", "Country", &views.equity_by_country, self.args.top);
            display::print_breakdown("Bond segments", "Segment", &views.bond_by_segment, self.args.top);
            display::print_breakdown("Bonds by country", "Country", &views.bond_by_country, self.args.top);
        }

        display::print_warnings(&report);

        println!(
            "\n{}",
            format!(
                "✅ Composed {} exposure rows from {} portfolio lines",
                report.row_count, report.line_count
            )
            .bright_green()
        );
        Ok(())
    }
}
