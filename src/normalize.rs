// 🧹 Cell Normalization - value kinds, years, money
//
// Every raw cell is classified exactly once when a table is ingested.
// Downstream code only ever sees a CellValue, never the raw string.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Inclusive bounds of a YearValue.
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2099;

/// Cell contents that mean "no value" in scraped tables.
const NULL_MARKERS: [&str; 6] = ["NA", "N/A", "NULL", "NONE", "NAN", "-"];

// ============================================================================
// VALUE KIND CLASSIFIER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Absent,
}

impl CellValue {
    /// Classify a raw cell.
    ///
    /// ```
    /// use state_risk::normalize::CellValue;
    ///
    /// assert_eq!(CellValue::classify(" 2019 "), CellValue::Integer(2019));
    /// assert_eq!(CellValue::classify("12.5"), CellValue::Number(12.5));
    /// assert_eq!(CellValue::classify("$1,200"), CellValue::Text("$1,200".to_string()));
    /// assert_eq!(CellValue::classify("n/a"), CellValue::Absent);
    /// ```
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return CellValue::Absent;
        }

        let upper = trimmed.to_uppercase();
        if NULL_MARKERS.contains(&upper.as_str()) {
            return CellValue::Absent;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => CellValue::Number(f),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric value for Integer and Number cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Number(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Integer(_) | CellValue::Number(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Absent => Ok(()),
        }
    }
}

// ============================================================================
// YEAR
// ============================================================================

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Any 4-digit run starting with 19 or 20, even inside a longer number
        Regex::new(r"(?:19|20)\d{2}").expect("year pattern is valid")
    })
}

fn in_year_range(year: i64) -> bool {
    (MIN_YEAR as i64..=MAX_YEAR as i64).contains(&year)
}

/// First 19xx/20xx substring in free text.
pub fn extract_year(text: &str) -> Option<i32> {
    year_pattern()
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Extract a YearValue from an integer, float or text cell.
///
/// Integers pass through unchanged when they are inside [1900, 2099].
/// Everything else is rendered as text and searched for the first
/// 4-digit substring beginning with 19 or 20, so "2019-01-01T00:00:00Z" and
/// "20190101T000000Z" both give 2019.
pub fn normalize_year(raw: &CellValue) -> Option<i32> {
    match raw {
        CellValue::Integer(i) => in_year_range(*i).then_some(*i as i32),
        CellValue::Number(f) if f.fract() == 0.0 && in_year_range(*f as i64) => Some(*f as i32),
        CellValue::Number(f) => extract_year(&f.to_string()),
        CellValue::Text(s) => extract_year(s),
        CellValue::Absent => None,
    }
}

// ============================================================================
// MONEY
// ============================================================================

/// Parse a currency-like string by dropping everything except digits and
/// the decimal point.
///
/// This is a deliberate simplification: "1.2.3" does not parse and comes
/// back as None, a leading minus sign is dropped like any other symbol, and
/// "1e3" reads as 13.
pub fn parse_money_text(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if digits.is_empty() {
        return None;
    }

    digits.parse::<f64>().ok()
}

/// Normalize a cell to a non-negative monetary amount.
pub fn normalize_money(raw: &CellValue) -> Option<f64> {
    match raw {
        CellValue::Integer(i) if *i >= 0 => Some(*i as f64),
        CellValue::Number(f) if f.is_finite() && *f >= 0.0 => Some(*f),
        CellValue::Text(s) => parse_money_text(s),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_kinds() {
        assert_eq!(CellValue::classify("42"), CellValue::Integer(42));
        assert_eq!(CellValue::classify("-3.25"), CellValue::Number(-3.25));
        assert_eq!(CellValue::classify("Texas"), CellValue::Text("Texas".to_string()));
        assert_eq!(CellValue::classify("   "), CellValue::Absent);
        assert_eq!(CellValue::classify("NULL"), CellValue::Absent);
        assert_eq!(CellValue::classify("nan"), CellValue::Absent);
    }

    #[test]
    fn test_classify_infinity_stays_text() {
        assert_eq!(CellValue::classify("inf"), CellValue::Text("inf".to_string()));
    }

    #[test]
    fn test_year_from_mixed_representations() {
        assert_eq!(normalize_year(&CellValue::Integer(2019)), Some(2019));
        assert_eq!(normalize_year(&CellValue::Number(2019.0)), Some(2019));
        assert_eq!(normalize_year(&CellValue::classify("2019-01-01")), Some(2019));
        assert_eq!(normalize_year(&CellValue::classify("  2019 ")), Some(2019));
        assert_eq!(
            normalize_year(&CellValue::classify("2021-08-30T00:00:00.000Z")),
            Some(2021)
        );
        assert_eq!(normalize_year(&CellValue::classify("FY 1998 report")), Some(1998));
    }

    #[test]
    fn test_year_absent_cases() {
        assert_eq!(normalize_year(&CellValue::classify("N/A")), None);
        assert_eq!(normalize_year(&CellValue::classify("")), None);
        assert_eq!(normalize_year(&CellValue::Text("unknown".to_string())), None);
        assert_eq!(normalize_year(&CellValue::Integer(1850)), None);
        assert_eq!(normalize_year(&CellValue::classify("id 1776-1899")), None);
    }

    #[test]
    fn test_year_from_compact_timestamp() {
        assert_eq!(normalize_year(&CellValue::classify("20220115T000000Z")), Some(2022));
        // A bare digit run classifies as Integer and is range-checked, not searched
        assert_eq!(normalize_year(&CellValue::classify("20190101")), None);
        assert_eq!(normalize_year(&CellValue::Text("20190101".to_string())), Some(2019));
    }

    #[test]
    fn test_year_takes_first_match_inside_digit_runs() {
        assert_eq!(extract_year("id 120195, filed 2020"), Some(2019));
    }

    #[test]
    fn test_money_from_mixed_representations() {
        assert_eq!(normalize_money(&CellValue::classify("$1,234.56")), Some(1234.56));
        assert_eq!(normalize_money(&CellValue::classify("1234.56")), Some(1234.56));
        assert_eq!(normalize_money(&CellValue::Number(1234.56)), Some(1234.56));
        assert_eq!(normalize_money(&CellValue::Integer(900)), Some(900.0));
    }

    #[test]
    fn test_money_absent_cases() {
        assert_eq!(normalize_money(&CellValue::classify("")), None);
        assert_eq!(normalize_money(&CellValue::Text("no data".to_string())), None);
        assert_eq!(normalize_money(&CellValue::Number(-10.0)), None);
    }

    #[test]
    fn test_money_multi_decimal_is_unparseable() {
        assert_eq!(parse_money_text("1.2.3"), None);
        assert_eq!(parse_money_text("$."), None);
    }

    #[test]
    fn test_money_strips_sign() {
        assert_eq!(parse_money_text("-$45.99"), Some(45.99));
    }

    proptest! {
        #[test]
        fn normalize_year_is_idempotent(raw in ".{0,16}") {
            let once = normalize_year(&CellValue::classify(&raw));
            if let Some(year) = once {
                prop_assert_eq!(normalize_year(&CellValue::Integer(year as i64)), Some(year));
            }
        }

        #[test]
        fn normalize_money_is_idempotent(raw in "[$0-9,.]{0,12}") {
            let once = normalize_money(&CellValue::classify(&raw));
            if let Some(amount) = once {
                prop_assert_eq!(normalize_money(&CellValue::Number(amount)), Some(amount));
            }
        }
    }
}
