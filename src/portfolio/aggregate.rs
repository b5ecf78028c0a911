//! Exposure aggregation
//!
//! Pure grouping of exposure rows along one dimension. Re-invocable on
//! any in-memory snapshot, which is what makes interactive what-if edits
//! cheap: edit the rows, aggregate again, no fund re-resolution.

use std::collections::HashMap;

use clap::ValueEnum;

use crate::types::{AggregationBucket, ExposureRow};

use super::compose::UNKNOWN;

/// Breakdown dimension for exposure tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dimension {
    AssetClass,
    Country,
    Sector,
    /// Single-issuer view: ticker when present, name otherwise.
    Holding,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::AssetClass => "Asset Class",
            Dimension::Country => "Country",
            Dimension::Sector => "Sector",
            Dimension::Holding => "Holding",
        }
    }

    /// The grouping label a row contributes to under this dimension.
    fn label_for(&self, row: &ExposureRow) -> String {
        let label = match self {
            Dimension::AssetClass => row.asset_class.to_string(),
            Dimension::Country => row.country.clone(),
            Dimension::Sector => row.sector.clone(),
            Dimension::Holding => row
                .ticker
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| row.name.clone()),
        };
        if label.trim().is_empty() {
            UNKNOWN.to_string()
        } else {
            label
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group rows by the chosen dimension, sum weights, count contributors.
/// Sorted weight-descending, label-ascending on ties, for deterministic
/// output.
pub fn aggregate(rows: &[ExposureRow], dimension: Dimension) -> Vec<AggregationBucket> {
    let mut groups: HashMap<String, (f64, usize)> = HashMap::new();
    for row in rows {
        let entry = groups.entry(dimension.label_for(row)).or_insert((0.0, 0));
        entry.0 += row.portfolio_weight;
        entry.1 += 1;
    }

    let mut buckets: Vec<AggregationBucket> = groups
        .into_iter()
        .map(|(label, (weight, count))| AggregationBucket {
            label,
            weight,
            count,
        })
        .collect();

    buckets.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    buckets
}
