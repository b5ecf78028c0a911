//! Console rendering of exposure reports

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::portfolio::{CompositionReport, SummaryMetrics};
use crate::types::AggregationBucket;

pub fn format_pct(weight: f64) -> String {
    format!("{:.2}%", weight * 100.0)
}

/// Headline metrics block shown at the top of the report.
pub fn print_summary(metrics: &SummaryMetrics) {
    println!("\n{}", "PORTFOLIO SUMMARY".bright_yellow());
    println!("{}", "─".repeat(50).bright_black());
    println!(
        "📈 Equity allocation: {}",
        format_pct(metrics.equity_weight).bright_green()
    );
    println!(
        "🛡️  Bond allocation: {}",
        format_pct(metrics.bond_weight).bright_green()
    );
    if metrics.unresolved_weight > 0.0 {
        println!(
            "⚠️  Unresolved weight: {}",
            format_pct(metrics.unresolved_weight).bright_red()
        );
    }
    if let Some(country) = &metrics.top_country {
        println!(
            "🌍 Top country: {} ({})",
            country.label.bright_cyan(),
            format_pct(country.weight)
        );
    }
    if let Some(sector) = &metrics.top_sector {
        println!(
            "🏭 Top sector: {} ({})",
            sector.label.bright_cyan(),
            format_pct(sector.weight)
        );
    }
}

/// One breakdown table. `top` caps the rows shown; the remainder is
/// collapsed into a trailing count so totals stay readable.
pub fn print_breakdown(title: &str, label_header: &str, buckets: &[AggregationBucket], top: usize) {
    println!("\n{}", title.to_uppercase().bright_yellow());

    if buckets.is_empty() {
        println!("{}", "  (no exposure)".bright_black());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![label_header, "Weight", "Holdings"]);

    for bucket in buckets.iter().take(top) {
        table.add_row(vec![
            bucket.label.clone(),
            format_pct(bucket.weight),
            bucket.count.to_string(),
        ]);
    }
    println!("{table}");

    if buckets.len() > top {
        println!(
            "{}",
            format!("  … {} more rows", buckets.len() - top).bright_black()
        );
    }
}

/// Resolution warnings: unresolved and stale funds must be explicit, not
/// silently folded into the tables.
pub fn print_warnings(report: &CompositionReport) {
    if report.is_clean() {
        return;
    }

    println!("\n{}", "WARNINGS".bright_yellow());
    println!("{}", "─".repeat(50).bright_black());
    for fund in &report.unresolved {
        println!(
            "{} {} {}",
            "❌".bright_red(),
            fund.reference.bright_white(),
            format!("({})", fund.reason).bright_black()
        );
    }
    for reference in &report.stale {
        println!(
            "{} {} {}",
            "⚠️".bright_yellow(),
            reference.bright_white(),
            "(served from stale cache)".bright_black()
        );
    }
    for reference in &report.suspicious {
        println!(
            "{} {} {}",
            "⚠️".bright_yellow(),
            reference.bright_white(),
            "(disclosed weights sum suspiciously low)".bright_black()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.1234), "12.34%");
        assert_eq!(format_pct(1.0), "100.00%");
        assert_eq!(format_pct(0.0), "0.00%");
    }
}
