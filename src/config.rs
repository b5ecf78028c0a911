//! Portfolio declaration loading
//!
//! The portfolio file is a YAML list. Each entry is either a fund line
//! (`url` + `weight`, resolved by look-through) or a manual asset line
//! (`name` + `asset_class` + `weight`, kept as a single exposure).
//! Weights may be fractions or percentages; they are normalized against
//! their sum before composition, so only positivity matters here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::InvalidPortfolioError;
use crate::types::AssetClass;

/// Default portfolio file (relative to current working directory)
pub const DEFAULT_PORTFOLIO_FILE: &str = "portfolio.yaml";

/// One raw entry of the portfolio file, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPortfolioEntry {
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

/// A validated portfolio line. Immutable once handed to composition.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLine {
    pub weight: f64,
    pub kind: LineKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// Resolve via look-through. The reference is opaque to the core:
    /// a fund page URL or a direct holdings-file URL.
    Fund { reference: String },
    /// A single non-fund exposure, not decomposed further.
    Manual {
        name: String,
        asset_class: AssetClass,
        country: Option<String>,
        sector: Option<String>,
    },
}

impl PortfolioLine {
    pub fn fund_reference(&self) -> Option<&str> {
        match &self.kind {
            LineKind::Fund { reference } => Some(reference),
            LineKind::Manual { .. } => None,
        }
    }
}

/// Load and validate a portfolio file.
pub fn load_portfolio(path: impl AsRef<Path>) -> Result<Vec<PortfolioLine>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read portfolio file {}", path.display()))?;
    let entries: Vec<RawPortfolioEntry> = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let lines = validate_entries(&entries)?;
    Ok(lines)
}

/// Validate raw entries into portfolio lines. Structural problems are
/// fatal to the run: they make the weight baseline meaningless.
pub fn validate_entries(
    entries: &[RawPortfolioEntry],
) -> Result<Vec<PortfolioLine>, InvalidPortfolioError> {
    if entries.is_empty() {
        return Err(InvalidPortfolioError::Empty);
    }

    let mut lines = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if !(entry.weight > 0.0) {
            return Err(InvalidPortfolioError::NonPositiveWeight {
                index,
                weight: entry.weight,
            });
        }

        let url = entry.url.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let name = entry.name.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let kind = match (url, name) {
            (Some(reference), _) => LineKind::Fund {
                reference: reference.to_string(),
            },
            (None, Some(name)) => LineKind::Manual {
                name: name.to_string(),
                asset_class: entry
                    .asset_class
                    .as_deref()
                    .map(AssetClass::from_label)
                    .unwrap_or(AssetClass::Other),
                country: entry.country.clone().filter(|s| !s.trim().is_empty()),
                sector: entry.sector.clone().filter(|s| !s.trim().is_empty()),
            },
            (None, None) => return Err(InvalidPortfolioError::MalformedLine { index }),
        };

        lines.push(PortfolioLine {
            weight: entry.weight,
            kind,
        });
    }

    Ok(lines)
}

/// Starter portfolio written by `foliox init`.
pub const STARTER_PORTFOLIO: &str = "\
# foliox portfolio declaration
#
# Fund lines carry a url and are resolved into their underlying
# constituents. Manual lines carry a name and an asset_class and are
# kept as a single exposure. Weights are normalized against their sum.
- url: https://www.ishares.com/it/investitore-privato/it/prodotti/251850/
  weight: 0.6
- name: Cash
  asset_class: Cash
  weight: 0.3
- name: Bitcoin
  asset_class: Crypto
  weight: 0.1
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_portfolio() {
        let yaml = r#"
- url: https://example.com/etf/251850
  weight: 0.7
- name: Cash
  asset_class: Liquidità
  weight: 0.3
"#;
        let entries: Vec<RawPortfolioEntry> = serde_yaml::from_str(yaml).unwrap();
        let lines = validate_entries(&entries).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].fund_reference(),
            Some("https://example.com/etf/251850")
        );
        match &lines[1].kind {
            LineKind::Manual { name, asset_class, .. } => {
                assert_eq!(name, "Cash");
                assert_eq!(*asset_class, AssetClass::Cash);
            }
            other => panic!("expected manual line, got {:?}", other),
        }
    }

    #[test]
    fn test_starter_portfolio_parses() {
        let entries: Vec<RawPortfolioEntry> = serde_yaml::from_str(STARTER_PORTFOLIO).unwrap();
        let lines = validate_entries(&entries).unwrap();
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_line_without_url_or_name_is_malformed() {
        let entries = vec![RawPortfolioEntry {
            weight: 1.0,
            url: None,
            name: None,
            asset_class: None,
            country: None,
            sector: None,
        }];
        let err = validate_entries(&entries).unwrap_err();
        assert!(matches!(err, InvalidPortfolioError::MalformedLine { index: 0 }));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        let entries = vec![RawPortfolioEntry {
            weight: 0.0,
            url: Some("https://example.com/etf".to_string()),
            name: None,
            asset_class: None,
            country: None,
            sector: None,
        }];
        let err = validate_entries(&entries).unwrap_err();
        assert!(matches!(
            err,
            InvalidPortfolioError::NonPositiveWeight { index: 0, .. }
        ));
    }

    #[test]
    fn test_empty_portfolio_rejected() {
        let err = validate_entries(&[]).unwrap_err();
        assert!(matches!(err, InvalidPortfolioError::Empty));
    }
}
