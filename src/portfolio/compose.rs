//! Portfolio composer
//!
//! Merges manually declared line items and resolved fund constituents
//! into one flat, weight-consistent exposure table. Declared weights are
//! normalized to sum 1; every fund line contributes either its resolved
//! constituents or a single `Unresolved` row carrying its full weight, so
//! the final table always accounts for the whole portfolio.

use std::collections::HashMap;

use tracing::warn;

use crate::config::{LineKind, PortfolioLine};
use crate::errors::InvalidPortfolioError;
use crate::holdings::ResolutionResult;
use crate::types::{AssetClass, ExposureRow};

pub const UNKNOWN: &str = "Unknown";

/// A fund line whose constituents could not be determined.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedFund {
    pub reference: String,
    pub reason: String,
}

/// Summary of one composition run, surfaced to the user alongside the
/// exposure table.
#[derive(Debug, Clone, Default)]
pub struct CompositionReport {
    pub unresolved: Vec<UnresolvedFund>,
    /// Fund references served from a cache fallback after a failed fetch.
    pub stale: Vec<String>,
    /// Fund references whose disclosed weights summed suspiciously low.
    pub suspicious: Vec<String>,
    /// Raw sum of declared line weights before normalization.
    pub declared_total: f64,
    pub line_count: usize,
    pub row_count: usize,
}

impl CompositionReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.stale.is_empty() && self.suspicious.is_empty()
    }
}

/// Compose portfolio lines and a resolution snapshot into exposure rows.
///
/// `resolutions` is keyed by fund reference, as produced by
/// `ConstituentResolver::resolve_many`. The sum of returned
/// `portfolio_weight`s equals 1 within floating-point tolerance no matter
/// how many funds were unresolved.
pub fn compose(
    lines: &[PortfolioLine],
    resolutions: &HashMap<String, ResolutionResult>,
) -> Result<(Vec<ExposureRow>, CompositionReport), InvalidPortfolioError> {
    if lines.is_empty() {
        return Err(InvalidPortfolioError::Empty);
    }
    for (index, line) in lines.iter().enumerate() {
        if !(line.weight > 0.0) {
            return Err(InvalidPortfolioError::NonPositiveWeight {
                index,
                weight: line.weight,
            });
        }
    }

    let declared_total: f64 = lines.iter().map(|l| l.weight).sum();
    if declared_total <= 0.0 || !declared_total.is_finite() {
        return Err(InvalidPortfolioError::ZeroTotalWeight(declared_total));
    }

    let mut report = CompositionReport {
        declared_total,
        line_count: lines.len(),
        ..Default::default()
    };

    let mut rows: Vec<ExposureRow> = Vec::new();
    for line in lines {
        let normalized_weight = line.weight / declared_total;

        match &line.kind {
            LineKind::Manual {
                name,
                asset_class,
                country,
                sector,
            } => {
                // Manual assets are a single exposure; they are not
                // decomposed geographically or by sector.
                rows.push(ExposureRow {
                    ticker: None,
                    name: name.clone(),
                    asset_class: *asset_class,
                    country: country.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                    sector: sector.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                    portfolio_weight: normalized_weight,
                });
            }
            LineKind::Fund { reference } => match resolutions.get(reference) {
                Some(ResolutionResult::Resolved {
                    constituents,
                    report: normalization,
                    stale,
                }) => {
                    // A fund that normalized to zero holdings cannot be
                    // decomposed; its weight must still be accounted for.
                    if constituents.is_empty() {
                        report.unresolved.push(UnresolvedFund {
                            reference: reference.clone(),
                            reason: "resolved to zero holdings".to_string(),
                        });
                        rows.push(unresolved_row(reference, normalized_weight));
                        continue;
                    }
                    if *stale {
                        report.stale.push(reference.clone());
                    }
                    if normalization.suspicious {
                        report.suspicious.push(reference.clone());
                    }
                    for constituent in constituents {
                        rows.push(ExposureRow {
                            ticker: constituent.ticker.clone(),
                            name: constituent.name.clone(),
                            asset_class: constituent.asset_class,
                            country: constituent
                                .country
                                .clone()
                                .unwrap_or_else(|| UNKNOWN.to_string()),
                            sector: constituent
                                .sector
                                .clone()
                                .unwrap_or_else(|| UNKNOWN.to_string()),
                            portfolio_weight: normalized_weight * constituent.weight_in_fund,
                        });
                    }
                }
                Some(ResolutionResult::Unresolved { reason }) => {
                    report.unresolved.push(UnresolvedFund {
                        reference: reference.clone(),
                        reason: reason.clone(),
                    });
                    rows.push(unresolved_row(reference, normalized_weight));
                }
                None => {
                    // A reference the resolver never saw is equivalent to
                    // a failed resolution; its weight is still accounted.
                    warn!(%reference, "Fund line missing from resolution snapshot");
                    report.unresolved.push(UnresolvedFund {
                        reference: reference.clone(),
                        reason: "not resolved".to_string(),
                    });
                    rows.push(unresolved_row(reference, normalized_weight));
                }
            },
        }
    }

    let rows = merge_overlaps(rows);
    report.row_count = rows.len();
    Ok((rows, report))
}

fn unresolved_row(reference: &str, weight: f64) -> ExposureRow {
    ExposureRow {
        ticker: None,
        name: reference.to_string(),
        asset_class: AssetClass::Unresolved,
        country: UNKNOWN.to_string(),
        sector: UNKNOWN.to_string(),
        portfolio_weight: weight,
    }
}

/// Merge rows sharing a ticker (or name when no ticker) into one row with
/// summed weight: the same stock held through two funds, or through a
/// fund and a manual line, shows up once in the single-stock view.
fn merge_overlaps(rows: Vec<ExposureRow>) -> Vec<ExposureRow> {
    let mut merged: Vec<ExposureRow> = Vec::with_capacity(rows.len());
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for row in rows {
        match index_by_key.entry(row.overlap_key()) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                merged[*entry.get()].portfolio_weight += row.portfolio_weight;
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(merged.len());
                merged.push(row);
            }
        }
    }

    merged
}
