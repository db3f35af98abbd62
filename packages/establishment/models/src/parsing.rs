//! Lenient field parsers for CSV files written by pandas.
//!
//! The parsed and prepared establishment tables come out of a dataframe
//! export, so integers may be written as `12.0`, booleans as `True`, and
//! missing values as an empty cell or `nan`.

use serde::{Deserialize, Deserializer};

/// Parses an integer that may have been written as a whole float.
///
/// Returns `None` for empty, `nan`, fractional, or unparseable input.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn parse_flexible_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(value) = s.parse::<i64>() {
        return Some(value);
    }
    let value = parse_flexible_float(s)?;
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Some(value as i64);
    }
    None
}

/// Parses a float, treating empty input and `nan` as missing.
#[must_use]
pub fn parse_flexible_float(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parses `true`/`false` in any case, plus `1`/`0`.
#[must_use]
pub fn parse_flexible_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" => Some(true),
        "false" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

/// Serde adapter for [`parse_flexible_int`].
///
/// # Errors
///
/// Propagates errors from the underlying deserializer.
pub fn optional_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_flexible_int))
}

/// Serde adapter for [`parse_flexible_float`].
///
/// # Errors
///
/// Propagates errors from the underlying deserializer.
pub fn optional_float<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_flexible_float))
}

/// Serde adapter for [`parse_flexible_bool`].
///
/// # Errors
///
/// Propagates errors from the underlying deserializer.
pub fn optional_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<bool>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_flexible_bool))
}

/// Serde adapter that maps empty strings to `None`.
///
/// # Errors
///
/// Propagates errors from the underlying deserializer.
pub fn optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_floats_as_ints() {
        assert_eq!(parse_flexible_int("12"), Some(12));
        assert_eq!(parse_flexible_int("12.0"), Some(12));
        assert_eq!(parse_flexible_int(" 7 "), Some(7));
    }

    #[test]
    fn rejects_fractional_and_missing_ints() {
        assert_eq!(parse_flexible_int("12.5"), None);
        assert_eq!(parse_flexible_int(""), None);
        assert_eq!(parse_flexible_int("nan"), None);
        assert_eq!(parse_flexible_int("abc"), None);
    }

    #[test]
    fn parses_floats() {
        let value = parse_flexible_float("46.4983").unwrap();
        assert!((value - 46.4983).abs() < f64::EPSILON);
        assert_eq!(parse_flexible_float("NaN"), None);
        assert_eq!(parse_flexible_float(""), None);
    }

    #[test]
    fn parses_python_booleans() {
        assert_eq!(parse_flexible_bool("True"), Some(true));
        assert_eq!(parse_flexible_bool("false"), Some(false));
        assert_eq!(parse_flexible_bool("1"), Some(true));
        assert_eq!(parse_flexible_bool(""), None);
        assert_eq!(parse_flexible_bool("maybe"), None);
    }
}
