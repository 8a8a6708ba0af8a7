//! Serde helpers for documents written by older clients.
//!
//! Numeric fields were captured straight from form inputs, so the same key
//! can hold `4`, `"4"`, `""` or `null` depending on which screen wrote it.
//! These helpers read all of those shapes and never fail on a bad number;
//! anything unparseable becomes `None`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn finite_number(value: Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// `Option<f64>` from a number, a numeric string, or nothing.
pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(finite_number))
}

/// Like [`opt_f64`] but missing values read as `0.0`.
pub fn f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_f64(deserializer)?.unwrap_or(0.0))
}

/// Non-negative whole number (mileage). Fractions are truncated.
pub fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_f64(deserializer)?
        .filter(|n| *n >= 0.0)
        .map(|n| n.trunc() as u64))
}

pub fn u64_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_u64(deserializer)?.unwrap_or(0))
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_f64(deserializer)?
        .filter(|n| *n >= i32::MIN as f64 && *n <= i32::MAX as f64)
        .map(|n| n.trunc() as i32))
}

pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_f64(deserializer)?
        .filter(|n| *n >= i64::MIN as f64 && *n <= i64::MAX as f64)
        .map(|n| n.trunc() as i64))
}

/// Text field; `null`, numbers and other non-strings read as `""`.
pub fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        _ => String::new(),
    })
}
