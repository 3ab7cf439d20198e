//! Shared utilities for loading and preprocessing.
//!
//! Column-name normalisation, string parsing for currency and boolean
//! values, and conversions from polars columns into plain vectors.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Column Name Utilities
// =============================================================================

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9a-zA-Z]+").expect("Invalid regex: non-alphanumeric run"));

/// UTF-8 byte order mark, sometimes left at the start of the first header.
pub const BOM: char = '\u{feff}';

/// Lowercase, replace every run of non-alphanumeric characters with a single
/// underscore and trim underscores from both ends.
///
/// # Example
///
/// ```rust
/// use credit_processing::utils::to_snake_case;
///
/// assert_eq!(to_snake_case("Bank Balance"), "bank_balance");
/// assert_eq!(to_snake_case("Defaulted?"), "defaulted");
/// assert_eq!(to_snake_case("Unnamed: 0"), "unnamed_0");
/// ```
pub fn to_snake_case(name: &str) -> String {
    let trimmed = name.trim_start_matches(BOM).trim().to_ascii_lowercase();
    NON_ALNUM
        .replace_all(&trimmed, "_")
        .trim_matches('_')
        .to_string()
}

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds text.
#[inline]
pub fn is_string_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Common missing value markers in data.
pub const MISSING_MARKERS: [&str; 7] = ["", "n/a", "na", "nan", "null", "none", "#n/a"];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// ```rust
/// use credit_processing::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is a missing value marker.
pub fn is_missing_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles currency symbols, percentages and thousands separators.
/// Missing markers and non-finite results parse to `None`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    if is_missing_marker(s) {
        return None;
    }
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Common boolean true representations.
pub const BOOLEAN_TRUE_VALUES: [&str; 6] = ["yes", "y", "true", "t", "1", "employed"];

/// Common boolean false representations.
pub const BOOLEAN_FALSE_VALUES: [&str; 6] = ["no", "n", "false", "f", "0", "unemployed"];

/// Parse a yes/no style string into a boolean.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
/// `"1.0"`/`"0.0"` are accepted as well since CSV writers emit floats.
pub fn parse_boolean_string(s: &str) -> Option<bool> {
    let lower = s.trim().to_ascii_lowercase();
    if BOOLEAN_TRUE_VALUES.iter().any(|&v| v == lower) {
        return Some(true);
    }
    if BOOLEAN_FALSE_VALUES.iter().any(|&v| v == lower) {
        return Some(false);
    }
    match lower.parse::<f64>() {
        Ok(v) if v == 1.0 => Some(true),
        Ok(v) if v == 0.0 => Some(false),
        _ => None,
    }
}

// =============================================================================
// Column Extraction Utilities
// =============================================================================

/// Read a column as `f64` values, keeping nulls.
///
/// Numeric columns are cast, booleans map to 0/1, and strings go through
/// [`parse_numeric_string`] (unparseable values become `None`). NaN and
/// infinities are treated as missing whatever the column type.
pub fn column_to_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let dtype = series.dtype();
    if is_numeric_dtype(dtype) || matches!(dtype, DataType::Boolean | DataType::Null) {
        let cast = series.cast(&DataType::Float64)?;
        return Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect());
    }

    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_numeric_string))
        .collect())
}

/// Read a column as booleans, keeping nulls.
///
/// Numbers must be exactly 0 or 1; strings go through
/// [`parse_boolean_string`]. Anything else becomes `None`.
pub fn column_to_bool(series: &Series) -> PolarsResult<Vec<Option<bool>>> {
    match series.dtype() {
        DataType::Boolean => Ok(series.bool()?.into_iter().collect()),
        dtype if is_numeric_dtype(dtype) => {
            let cast = series.cast(&DataType::Float64)?;
            Ok(cast
                .f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) if x == 1.0 => Some(true),
                    Some(x) if x == 0.0 => Some(false),
                    _ => None,
                })
                .collect())
        }
        _ => {
            let cast = series.cast(&DataType::String)?;
            Ok(cast
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_boolean_string))
                .collect())
        }
    }
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Median of the non-null values, averaging the middle pair for even counts.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Mean of the non-null values.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Most frequent non-null boolean. Ties resolve to `false`.
pub fn bool_mode(values: &[Option<bool>]) -> Option<bool> {
    let trues = values.iter().filter(|v| **v == Some(true)).count();
    let falses = values.iter().filter(|v| **v == Some(false)).count();
    if trues + falses == 0 {
        None
    } else {
        Some(trues > falses)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Employed"), "employed");
        assert_eq!(to_snake_case("Bank Balance"), "bank_balance");
        assert_eq!(to_snake_case("Annual Salary"), "annual_salary");
        assert_eq!(to_snake_case("Defaulted?"), "defaulted");
        assert_eq!(to_snake_case("  __Weird--Name__  "), "weird_name");
        assert_eq!(to_snake_case("\u{feff}Index"), "index");
        assert_eq!(to_snake_case("bank_balance"), "bank_balance");
    }

    #[test]
    fn test_clean_numeric_string() {
        assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
        assert_eq!(clean_numeric_string("  42%  "), "42");
        assert_eq!(clean_numeric_string("€100"), "100");
        assert_eq!(clean_numeric_string("1 000"), "1000");
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("$8,754.36"), Some(8754.36));
        assert_eq!(parse_numeric_string("-100"), Some(-100.0));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("N/A"), None);
        assert_eq!(parse_numeric_string("NaN"), None);
        assert_eq!(parse_numeric_string("hello"), None);
    }

    #[test]
    fn test_parse_boolean_string() {
        assert_eq!(parse_boolean_string("Yes"), Some(true));
        assert_eq!(parse_boolean_string(" no "), Some(false));
        assert_eq!(parse_boolean_string("TRUE"), Some(true));
        assert_eq!(parse_boolean_string("0"), Some(false));
        assert_eq!(parse_boolean_string("1.0"), Some(true));
        assert_eq!(parse_boolean_string("maybe"), None);
        assert_eq!(parse_boolean_string("2"), None);
    }

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_column_to_f64_from_strings() {
        let series = Series::new("bank_balance".into(), &[Some("$1,000.50"), None, Some("oops")]);
        let values = column_to_f64(&series).unwrap();
        assert_eq!(values, vec![Some(1000.5), None, None]);
    }

    #[test]
    fn test_column_to_f64_from_ints() {
        let series = Series::new("x".into(), &[1i64, 2, 3]);
        let values = column_to_f64(&series).unwrap();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_column_to_f64_non_finite_floats_are_missing() {
        let series = Series::new(
            "bank_balance".into(),
            &[Some(1.5), Some(f64::NAN), None, Some(f64::INFINITY)],
        );
        let values = column_to_f64(&series).unwrap();
        assert_eq!(values, vec![Some(1.5), None, None, None]);
    }

    #[test]
    fn test_column_to_bool() {
        let ints = Series::new("employed".into(), &[Some(1i64), Some(0), None, Some(5)]);
        assert_eq!(
            column_to_bool(&ints).unwrap(),
            vec![Some(true), Some(false), None, None]
        );

        let strings = Series::new("employed".into(), &["Yes", "no", "?"]);
        assert_eq!(
            column_to_bool(&strings).unwrap(),
            vec![Some(true), Some(false), None]
        );
    }

    #[test]
    fn test_median_and_mean() {
        assert_eq!(median(&[Some(1.0), None, Some(3.0), Some(5.0)]), Some(3.0));
        assert_eq!(median(&[Some(1.0), Some(3.0)]), Some(2.0));
        assert_eq!(median(&[None, None]), None);
        assert_eq!(mean(&[Some(1.0), None, Some(5.0)]), Some(3.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_bool_mode() {
        assert_eq!(bool_mode(&[Some(true), Some(true), Some(false), None]), Some(true));
        assert_eq!(bool_mode(&[Some(true), Some(false)]), Some(false));
        assert_eq!(bool_mode(&[None]), None);
    }
}
