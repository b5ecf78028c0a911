//! Derived view catalogue
//!
//! One exposure snapshot fans out into the full set of breakdown tables
//! the report/export layers consume: global views over the whole
//! portfolio, plus equity and bond deep-dives renormalized to their own
//! slice so "top stocks" reads as a share of the equity portion.

use crate::types::{AggregationBucket, AssetClass, ExposureRow};

use super::aggregate::{aggregate, Dimension};

/// Headline numbers for the report summary.
#[derive(Debug, Clone, Default)]
pub struct SummaryMetrics {
    pub equity_weight: f64,
    pub bond_weight: f64,
    pub unresolved_weight: f64,
    pub top_country: Option<AggregationBucket>,
    pub top_sector: Option<AggregationBucket>,
}

/// All derived breakdowns of one composition run.
#[derive(Debug, Clone)]
pub struct PortfolioViews {
    pub global_by_asset: Vec<AggregationBucket>,
    pub global_by_country: Vec<AggregationBucket>,
    pub global_by_sector: Vec<AggregationBucket>,
    /// Equity slice, weights renormalized to the equity total.
    pub equity_by_holding: Vec<AggregationBucket>,
    pub equity_by_sector: Vec<AggregationBucket>,
    pub equity_by_country: Vec<AggregationBucket>,
    /// Bond slice, weights renormalized to the bond total. Bond holdings
    /// tables carry the bond segment in the sector column.
    pub bond_by_segment: Vec<AggregationBucket>,
    pub bond_by_country: Vec<AggregationBucket>,
    pub metrics: SummaryMetrics,
}

impl PortfolioViews {
    pub fn build(rows: &[ExposureRow]) -> Self {
        let global_by_asset = aggregate(rows, Dimension::AssetClass);
        let global_by_country = aggregate(rows, Dimension::Country);
        let global_by_sector = aggregate(rows, Dimension::Sector);

        let equity = slice_renormalized(rows, AssetClass::Equity);
        let bonds = slice_renormalized(rows, AssetClass::Bond);

        let metrics = SummaryMetrics {
            equity_weight: class_weight(&global_by_asset, AssetClass::Equity),
            bond_weight: class_weight(&global_by_asset, AssetClass::Bond),
            unresolved_weight: class_weight(&global_by_asset, AssetClass::Unresolved),
            top_country: global_by_country
                .iter()
                .find(|b| b.label != super::compose::UNKNOWN)
                .cloned(),
            top_sector: global_by_sector
                .iter()
                .find(|b| b.label != super::compose::UNKNOWN)
                .cloned(),
        };

        Self {
            global_by_asset,
            global_by_country,
            global_by_sector,
            equity_by_holding: aggregate(&equity, Dimension::Holding),
            equity_by_sector: aggregate(&equity, Dimension::Sector),
            equity_by_country: aggregate(&equity, Dimension::Country),
            bond_by_segment: aggregate(&bonds, Dimension::Sector),
            bond_by_country: aggregate(&bonds, Dimension::Country),
            metrics,
        }
    }

    /// (name, table) pairs in export order.
    pub fn tables(&self) -> Vec<(&'static str, &[AggregationBucket])> {
        vec![
            ("global_by_asset", self.global_by_asset.as_slice()),
            ("global_by_country", self.global_by_country.as_slice()),
            ("global_by_sector", self.global_by_sector.as_slice()),
            ("equity_by_holding", self.equity_by_holding.as_slice()),
            ("equity_by_sector", self.equity_by_sector.as_slice()),
            ("equity_by_country", self.equity_by_country.as_slice()),
            ("bond_by_segment", self.bond_by_segment.as_slice()),
            ("bond_by_country", self.bond_by_country.as_slice()),
        ]
    }
}

fn class_weight(by_asset: &[AggregationBucket], class: AssetClass) -> f64 {
    by_asset
        .iter()
        .find(|b| b.label == class.to_string())
        .map(|b| b.weight)
        .unwrap_or(0.0)
}

/// Rows of one asset class with weights rescaled so the slice sums to 1.
/// Empty when the class has no (positive) weight.
fn slice_renormalized(rows: &[ExposureRow], class: AssetClass) -> Vec<ExposureRow> {
    let slice: Vec<&ExposureRow> = rows.iter().filter(|r| r.asset_class == class).collect();
    let slice_total: f64 = slice.iter().map(|r| r.portfolio_weight).sum();
    if slice_total <= 0.0 {
        return Vec::new();
    }

    slice
        .into_iter()
        .map(|r| ExposureRow {
            portfolio_weight: r.portfolio_weight / slice_total,
            ..r.clone()
        })
        .collect()
}
