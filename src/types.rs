//! Core type definitions for the look-through pipeline
//!
//! Strongly-typed domain model shared across normalization, resolution,
//! composition and aggregation. All weights are portfolio fractions in
//! [0, 1] once normalized.

use serde::{Deserialize, Serialize};

/// Closed asset-class taxonomy. Free-text labels from raw holdings tables
/// are mapped onto this enum through [`AssetClass::from_label`]; anything
/// unrecognized becomes `Other`. `Unresolved` is reserved for fund lines
/// whose constituents could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Bond,
    Cash,
    Commodity,
    Crypto,
    RealEstate,
    Other,
    Unresolved,
}

/// Alias table: case-insensitive raw label -> canonical class. Covers the
/// English and Italian labels seen in iShares holdings exports.
const ASSET_CLASS_ALIASES: &[(&str, AssetClass)] = &[
    ("equity", AssetClass::Equity),
    ("equities", AssetClass::Equity),
    ("stock", AssetClass::Equity),
    ("azionario", AssetClass::Equity),
    ("azioni", AssetClass::Equity),
    ("bond", AssetClass::Bond),
    ("bonds", AssetClass::Bond),
    ("fixed income", AssetClass::Bond),
    ("obbligazionario", AssetClass::Bond),
    ("obbligazioni", AssetClass::Bond),
    ("cash", AssetClass::Cash),
    ("liquidità", AssetClass::Cash),
    ("liquidita", AssetClass::Cash),
    ("cash and/or derivatives", AssetClass::Cash),
    ("liquidità e/o derivati", AssetClass::Cash),
    ("money market", AssetClass::Cash),
    ("commodity", AssetClass::Commodity),
    ("commodities", AssetClass::Commodity),
    ("materie prime", AssetClass::Commodity),
    ("crypto", AssetClass::Crypto),
    ("cryptocurrency", AssetClass::Crypto),
    ("real estate", AssetClass::RealEstate),
    ("immobiliare", AssetClass::RealEstate),
];

impl AssetClass {
    /// Map a free-text label to the closed enum. Unknown labels fall back
    /// to `Other` rather than failing the row.
    pub fn from_label(label: &str) -> Self {
        let needle = label.trim().to_lowercase();
        if needle.is_empty() {
            return AssetClass::Other;
        }
        ASSET_CLASS_ALIASES
            .iter()
            .find(|(alias, _)| *alias == needle)
            .map(|(_, class)| *class)
            .unwrap_or(AssetClass::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "Equity",
            AssetClass::Bond => "Bond",
            AssetClass::Cash => "Cash",
            AssetClass::Commodity => "Commodity",
            AssetClass::Crypto => "Crypto",
            AssetClass::RealEstate => "Real Estate",
            AssetClass::Other => "Other",
            AssetClass::Unresolved => "Unresolved",
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized underlying holding of a fund. Produced by the schema
/// normalizer, cached implicitly via the raw blob, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub ticker: Option<String>,
    pub name: String,
    pub asset_class: AssetClass,
    /// Fraction of the fund, 0..=1.
    pub weight_in_fund: f64,
    pub country: Option<String>,
    pub sector: Option<String>,
}

/// One resolved line of final portfolio exposure, ready for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureRow {
    pub ticker: Option<String>,
    pub name: String,
    pub asset_class: AssetClass,
    pub country: String,
    pub sector: String,
    /// Contribution to the overall portfolio, 0..=1.
    pub portfolio_weight: f64,
}

impl ExposureRow {
    /// Key used to merge overlapping holdings across funds: ticker when
    /// present, display name otherwise.
    pub fn overlap_key(&self) -> String {
        self.ticker
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.name)
            .to_uppercase()
    }
}

/// One row of an aggregated breakdown table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationBucket {
    pub label: String,
    pub weight: f64,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_class_aliases_case_insensitive() {
        assert_eq!(AssetClass::from_label("Azionario"), AssetClass::Equity);
        assert_eq!(AssetClass::from_label("EQUITY"), AssetClass::Equity);
        assert_eq!(AssetClass::from_label("Obbligazionario"), AssetClass::Bond);
        assert_eq!(AssetClass::from_label("Fixed Income"), AssetClass::Bond);
        assert_eq!(AssetClass::from_label("Liquidità e/o Derivati"), AssetClass::Cash);
    }

    #[test]
    fn test_asset_class_unknown_label_is_other() {
        assert_eq!(AssetClass::from_label("Frontier Markets"), AssetClass::Other);
        assert_eq!(AssetClass::from_label(""), AssetClass::Other);
    }

    #[test]
    fn test_overlap_key_prefers_ticker() {
        let row = ExposureRow {
            ticker: Some("aapl".to_string()),
            name: "Apple Inc".to_string(),
            asset_class: AssetClass::Equity,
            country: "United States".to_string(),
            sector: "Technology".to_string(),
            portfolio_weight: 0.05,
        };
        assert_eq!(row.overlap_key(), "AAPL");

        let unnamed = ExposureRow { ticker: None, ..row };
        assert_eq!(unnamed.overlap_key(), "APPLE INC");
    }
}
