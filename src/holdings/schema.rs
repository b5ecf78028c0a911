//! Schema normalizer for raw holdings tables
//!
//! Fund disclosure files arrive as CSV with no layout guarantees:
//! metadata rows before the header, English or Italian column names,
//! comma or semicolon delimiters, weights as "12,34%" strings or plain
//! fractions, and free-text disclaimer rows at the tail. This module maps
//! all of that onto the canonical [`Constituent`] schema through a
//! declarative header-alias table and tolerant numeric parsing.

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::errors::SchemaError;
use crate::types::{AssetClass, Constituent};

/// Header rows are searched within this many leading rows.
const MAX_HEADER_SCAN: usize = 15;

/// A fund whose constituent weights sum below this is flagged suspicious:
/// the disclosure is likely truncated rather than merely rounded.
const SUSPICIOUS_WEIGHT_SUM: f64 = 0.5;

/// Rounding / cash-drag tolerance on the per-fund weight sum.
const WEIGHT_SUM_TOLERANCE: f64 = 0.02;

/// Parsed weights summing above this are taken to be percent-scaled
/// (a fraction table sums to ~1, a percent table to ~100).
const PERCENT_SCALE_THRESHOLD: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Ticker,
    Name,
    AssetClass,
    Weight,
    Country,
    Sector,
}

/// Canonical field -> accepted raw header names, lowercase. Covers the
/// English and Italian iShares exports plus common generic spellings.
const HEADER_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Ticker,
        &["ticker", "issuer ticker", "ticker dell'emittente"],
    ),
    (Field::Name, &["name", "nome", "holding", "security name"]),
    (
        Field::AssetClass,
        &["asset class", "classe di attività", "classe di attivo"],
    ),
    (
        Field::Weight,
        &[
            "weight",
            "weight (%)",
            "weighting",
            "weighting (%)",
            "ponderazione",
            "ponderazione (%)",
            "peso (%)",
        ],
    ),
    (
        Field::Country,
        &["location", "country", "area geografica", "paese", "geography"],
    ),
    (Field::Sector, &["sector", "settore"]),
];

fn match_field(cell: &str) -> Option<Field> {
    let needle = cell.trim().to_lowercase();
    HEADER_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&needle.as_str()))
        .map(|(field, _)| *field)
}

/// Column indexes resolved from a detected header row.
#[derive(Debug, Default)]
struct ColumnMap {
    ticker: Option<usize>,
    name: Option<usize>,
    asset_class: Option<usize>,
    weight: Option<usize>,
    country: Option<usize>,
    sector: Option<usize>,
}

impl ColumnMap {
    fn from_record(record: &StringRecord) -> Self {
        let mut map = ColumnMap::default();
        for (idx, cell) in record.iter().enumerate() {
            let Some(field) = match_field(cell) else {
                continue;
            };
            let slot = match field {
                Field::Ticker => &mut map.ticker,
                Field::Name => &mut map.name,
                Field::AssetClass => &mut map.asset_class,
                Field::Weight => &mut map.weight,
                Field::Country => &mut map.country,
                Field::Sector => &mut map.sector,
            };
            // First matching column wins.
            if slot.is_none() {
                *slot = Some(idx);
            }
        }
        map
    }

    /// Name and weight are the minimum required to produce constituents.
    fn is_usable(&self) -> bool {
        self.name.is_some() && self.weight.is_some()
    }
}

/// Outcome summary of one normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationReport {
    /// Data rows seen after the header.
    pub rows_seen: usize,
    /// Rows dropped for unparseable, zero or negative weight.
    pub rows_dropped: usize,
    /// Index of the detected header row within the raw table.
    pub header_row: usize,
    /// Sum of normalized constituent weights (fractions).
    pub weight_sum: f64,
    /// True when the weight sum is within rounding tolerance of 1.
    pub complete: bool,
    /// True when the weight sum is low enough to indicate a truncated
    /// disclosure rather than rounding noise.
    pub suspicious: bool,
}

/// Normalize a raw holdings table into canonical constituents.
///
/// Tries comma then semicolon delimiters; the first that yields a header
/// row carrying at least name and weight columns wins. Fails with
/// [`SchemaError::HeaderNotFound`] when neither does.
pub fn normalize(raw: &[u8]) -> Result<(Vec<Constituent>, NormalizationReport), SchemaError> {
    let text = String::from_utf8_lossy(raw);

    let mut last_err = SchemaError::HeaderNotFound {
        scanned: MAX_HEADER_SCAN,
    };
    for delimiter in [b',', b';'] {
        match normalize_with_delimiter(&text, delimiter) {
            Ok(result) => return Ok(result),
            Err(err) => last_err = err,
        }
    }
    Err(last_err)
}

fn normalize_with_delimiter(
    text: &str,
    delimiter: u8,
) -> Result<(Vec<Constituent>, NormalizationReport), SchemaError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SchemaError::Malformed(e.to_string()))?;
        records.push(record);
    }

    let (header_row, columns) = find_header(&records)?;
    let delim = delimiter as char;
    debug!(header_row, delimiter = %delim, "Header row located");

    let weight_col = columns.weight.ok_or(SchemaError::MissingColumn("weight"))?;
    let name_col = columns.name.ok_or(SchemaError::MissingColumn("name"))?;

    let mut rows_seen = 0;
    let mut rows_dropped = 0;
    let mut parsed: Vec<(Constituent, f64)> = Vec::new();

    for record in records.iter().skip(header_row + 1) {
        // Fully empty rows are layout padding, not data.
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows_seen += 1;

        let name = cell(record, Some(name_col));
        let weight = cell_opt(record, Some(weight_col)).and_then(|w| parse_weight(&w));

        // Disclaimer tails and cash-adjustment stubs fall out here: no
        // parseable positive weight, or no name to attach it to.
        let (Some(name), Some(weight)) = (non_empty(name), weight) else {
            rows_dropped += 1;
            continue;
        };
        if weight <= 0.0 {
            rows_dropped += 1;
            continue;
        }

        let constituent = Constituent {
            ticker: cell_opt(record, columns.ticker).and_then(non_empty),
            name,
            asset_class: columns
                .asset_class
                .map(|idx| AssetClass::from_label(&cell(record, Some(idx))))
                .unwrap_or(AssetClass::Other),
            weight_in_fund: 0.0, // rescaled below
            country: cell_opt(record, columns.country).and_then(non_empty),
            sector: cell_opt(record, columns.sector).and_then(non_empty),
        };
        parsed.push((constituent, weight));
    }

    // Percent-scale detection: a percent table sums near 100, a fraction
    // table near 1. Values that carried a literal '%' were already scaled
    // during parsing.
    let raw_sum: f64 = parsed.iter().map(|(_, w)| w).sum();
    let scale = if raw_sum > PERCENT_SCALE_THRESHOLD {
        0.01
    } else {
        1.0
    };

    // The pre-rescale fraction sum carries the completeness signal; the
    // emitted weights are rescaled to sum exactly 1 so downstream
    // composition keeps portfolio totals exact under cash drag.
    let weight_sum = raw_sum * scale;
    let rescale = if weight_sum > 0.0 { 1.0 / weight_sum } else { 0.0 };

    let constituents: Vec<Constituent> = parsed
        .into_iter()
        .map(|(mut c, w)| {
            c.weight_in_fund = w * scale * rescale;
            c
        })
        .collect();

    let report = NormalizationReport {
        rows_seen,
        rows_dropped,
        header_row,
        weight_sum,
        complete: (weight_sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
        suspicious: weight_sum < SUSPICIOUS_WEIGHT_SUM,
    };

    Ok((constituents, report))
}

fn find_header(records: &[StringRecord]) -> Result<(usize, ColumnMap), SchemaError> {
    let scanned = records.len().min(MAX_HEADER_SCAN);
    for (idx, record) in records.iter().take(MAX_HEADER_SCAN).enumerate() {
        let columns = ColumnMap::from_record(record);
        if columns.is_usable() {
            return Ok((idx, columns));
        }
    }
    Err(SchemaError::HeaderNotFound { scanned })
}

fn cell(record: &StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn cell_opt(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i)).map(|s| s.trim().to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Tolerant numeric parsing for weight cells.
///
/// Handles percent signs ("12,34%"), comma decimals ("12,34"), mixed
/// thousands/decimal separators ("1.234,56" and "1,234.56"), and the
/// various empty markers ("", "-", "N/A", "--") which parse to zero and
/// are then dropped by the positive-weight filter.
fn parse_weight(raw: &str) -> Option<f64> {
    let mut s = raw.trim().replace(' ', "");
    if s.is_empty() || s == "-" || s == "--" || s.eq_ignore_ascii_case("n/a") {
        return Some(0.0);
    }

    let percent = s.ends_with('%');
    if percent {
        s.truncate(s.len() - 1);
    }

    // Whichever of ',' / '.' occurs last is the decimal separator; the
    // other, if present, is a thousands separator.
    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s,
    };

    let value: f64 = normalized.parse().ok()?;
    Some(if percent { value / 100.0 } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISHARES_STYLE: &str = "\
iShares Core MSCI World UCITS ETF
Fondo al: 01/ago/2026
,,,
Ticker dell'emittente,Nome,Settore,Area Geografica,Asset Class,Ponderazione (%)
AAPL,APPLE INC,Informatica,Stati Uniti,Azionario,\"4,52\"
MSFT,MICROSOFT CORP,Informatica,Stati Uniti,Azionario,\"4,10\"
NVDA,NVIDIA CORP,Informatica,Stati Uniti,Azionario,\"3,98\"
,EUR CASH,Liquidità,Area Euro,Liquidità e/o Derivati,\"87,40\"
,,,,,
Questo documento contiene informazioni fornite a solo scopo informativo.
";

    #[test]
    fn test_header_detection_skips_metadata_rows() {
        let (constituents, report) = normalize(ISHARES_STYLE.as_bytes()).unwrap();
        assert_eq!(report.header_row, 3);
        assert_eq!(constituents.len(), 4);
        assert_eq!(constituents[0].ticker.as_deref(), Some("AAPL"));
        assert_eq!(constituents[0].asset_class, AssetClass::Equity);
        assert_eq!(constituents[3].asset_class, AssetClass::Cash);
        assert_eq!(constituents[3].ticker, None);
    }

    #[test]
    fn test_disclaimer_rows_are_dropped() {
        let (_, report) = normalize(ISHARES_STYLE.as_bytes()).unwrap();
        // The disclaimer line counts as a seen-and-dropped row.
        assert_eq!(report.rows_seen, 5);
        assert_eq!(report.rows_dropped, 1);
    }

    #[test]
    fn test_percent_string_and_fraction_agree() {
        let percent_table = "Name,Weight (%)\nAlpha,\"12,34%\"\nBeta,\"87,66%\"\n";
        let fraction_table = "Name,Weight (%)\nAlpha,0.1234\nBeta,0.8766\n";

        let (from_percent, _) = normalize(percent_table.as_bytes()).unwrap();
        let (from_fraction, _) = normalize(fraction_table.as_bytes()).unwrap();

        assert!((from_percent[0].weight_in_fund - 0.1234).abs() < 1e-9);
        assert!((from_fraction[0].weight_in_fund - 0.1234).abs() < 1e-9);
        assert!(
            (from_percent[0].weight_in_fund - from_fraction[0].weight_in_fund).abs() < 1e-9
        );
    }

    #[test]
    fn test_bare_percent_scale_detected_by_sum() {
        // Plain numbers summing near 100 are percent-scaled.
        let table = "Name,Weight\nAlpha,60\nBeta,40\n";
        let (constituents, report) = normalize(table.as_bytes()).unwrap();
        assert!((constituents[0].weight_in_fund - 0.60).abs() < 1e-9);
        assert!(report.complete);
    }

    #[test]
    fn test_weight_sum_tolerance_and_suspicious_flag() {
        let complete = "Name,Weight\nAlpha,\"99,2%\"\n";
        let (_, report) = normalize(complete.as_bytes()).unwrap();
        assert!(report.complete);
        assert!(!report.suspicious);

        let truncated = "Name,Weight\nAlpha,\"30,0%\"\n";
        let (_, report) = normalize(truncated.as_bytes()).unwrap();
        assert!(!report.complete);
        assert!(report.suspicious);
    }

    #[test]
    fn test_zero_and_unparseable_weights_dropped() {
        let table = "Name,Weight\nAlpha,50%\nGhost,-\nBlank,\nBad,abc\nBeta,50%\n";
        let (constituents, report) = normalize(table.as_bytes()).unwrap();
        assert_eq!(constituents.len(), 2);
        assert_eq!(report.rows_seen, 5);
        assert_eq!(report.rows_dropped, 3);
    }

    #[test]
    fn test_semicolon_delimited_table() {
        let table = "Nome;Ponderazione (%)\nAlpha;\"55,0\"\nBeta;\"45,0\"\n";
        let (constituents, _) = normalize(table.as_bytes()).unwrap();
        assert_eq!(constituents.len(), 2);
        assert!((constituents[0].weight_in_fund - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_missing_header_is_schema_error() {
        let garbage = "just,some,cells\nwithout,any,header\n";
        let err = normalize(garbage.as_bytes()).unwrap_err();
        assert!(matches!(err, SchemaError::HeaderNotFound { .. }));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_weight("1.234,56"), Some(1234.56));
        assert_eq!(parse_weight("1,234.56"), Some(1234.56));
        assert_eq!(parse_weight("12,34"), Some(12.34));
        assert_eq!(parse_weight("12,34%"), Some(0.1234));
        assert_eq!(parse_weight("0.1234"), Some(0.1234));
        assert_eq!(parse_weight("N/A"), Some(0.0));
        assert_eq!(parse_weight("garbage"), None);
    }
}
