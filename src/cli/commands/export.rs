use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use super::{load_and_resolve, ResolveOptions};
use crate::config::DEFAULT_PORTFOLIO_FILE;
use crate::data_paths::DataPaths;
use crate::display;
use crate::portfolio::{compose, PortfolioViews};
use crate::types::{AggregationBucket, ExposureRow};

#[derive(Args, Clone)]
pub struct ExportArgs {
    /// Portfolio file to export
    #[arg(long, default_value = DEFAULT_PORTFOLIO_FILE)]
    pub portfolio: PathBuf,

    /// Use cached holdings only, never fetch
    #[arg(long)]
    pub offline: bool,

    /// Force re-fetch of all fund holdings before exporting
    #[arg(long)]
    pub refresh: bool,

    /// Cache entries older than this are re-fetched
    #[arg(long, default_value_t = 24)]
    pub max_age_hours: i64,
}

pub struct ExportCommand {
    args: ExportArgs,
}

impl ExportCommand {
    pub fn new(args: ExportArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let opts = ResolveOptions {
            offline: self.args.offline,
            force_refresh: self.args.refresh,
            max_age_hours: self.args.max_age_hours,
        };

        let (lines, resolutions) =
            load_and_resolve(&self.args.portfolio, &data_paths, opts).await?;
        let (rows, report) = compose(&lines, &resolutions)?;
        let views = PortfolioViews::build(&rows);

        let exports_dir = data_paths.exports();
        for (name, buckets) in views.tables() {
            let path = exports_dir.join(format!("{}.csv", name));
            write_buckets(&path, buckets)?;
            println!(
                "{}",
                format!("💾 Saved {} ({} rows)", path.display(), buckets.len()).bright_blue()
            );
        }

        let holdings_path = exports_dir.join("all_holdings.csv");
        write_holdings(&holdings_path, &rows)?;
        println!(
            "{}",
            format!("💾 Saved {} ({} rows)", holdings_path.display(), rows.len()).bright_blue()
        );

        display::print_warnings(&report);
        println!(
            "\n{}",
            format!("✅ Export completed: {}", exports_dir.display()).bright_green()
        );
        Ok(())
    }
}

fn write_buckets(path: &Path, buckets: &[AggregationBucket]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["label", "weight", "count"])?;
    for bucket in buckets {
        let weight = format!("{:.6}", bucket.weight);
        let count = bucket.count.to_string();
        writer.write_record([bucket.label.as_str(), weight.as_str(), count.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_holdings(path: &Path, rows: &[ExposureRow]) -> Result<()> {
    let mut sorted: Vec<&ExposureRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        b.portfolio_weight
            .partial_cmp(&a.portfolio_weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["ticker", "name", "asset_class", "country", "sector", "weight"])?;
    for row in sorted {
        let weight = format!("{:.6}", row.portfolio_weight);
        writer.write_record([
            row.ticker.as_deref().unwrap_or(""),
            row.name.as_str(),
            row.asset_class.as_str(),
            row.country.as_str(),
            row.sector.as_str(),
            weight.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
