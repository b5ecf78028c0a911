use anyhow::Result;
use chrono::Utc;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::data_paths::DataPaths;
use crate::holdings::HoldingCache;

#[derive(Args, Clone)]
pub struct CacheArgs {
    /// Remove all cached holdings
    #[arg(long)]
    pub clear: bool,
}

pub struct CacheCommand {
    args: CacheArgs,
}

impl CacheCommand {
    pub fn new(args: CacheArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, data_paths: DataPaths) -> Result<()> {
        let cache = HoldingCache::new(data_paths.cache())?;

        if self.args.clear {
            let removed = cache.clear()?;
            println!(
                "{}",
                format!("🗑️  Removed {} cached holdings table(s)", removed).bright_yellow()
            );
            return Ok(());
        }

        let entries = cache.entries()?;
        if entries.is_empty() {
            println!("{}", "📍 Cache is empty".bright_yellow());
            return Ok(());
        }

        println!("\n{}", "CACHED HOLDINGS".bright_yellow());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Fund", "Fetched", "Age", "Size"]);

        let now = Utc::now();
        for entry in &entries {
            let age = now - entry.fetched_at;
            table.add_row(vec![
                entry.reference.clone(),
                entry.fetched_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                format_age(age.num_minutes()),
                format!("{:.1} KB", entry.size_bytes as f64 / 1024.0),
            ]);
        }
        println!("{table}");
        println!(
            "{}",
            format!("  {} entries in {}", entries.len(), data_paths.cache().display())
                .bright_black()
        );
        Ok(())
    }
}

fn format_age(minutes: i64) -> String {
    if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 48 * 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}d", minutes / (24 * 60))
    }
}
