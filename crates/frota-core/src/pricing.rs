//! # Pricing Calculator
//!
//! Day counts and totals for a rental period.
//!
//! ```text
//! days     = ceil((end - start) / 24h), never below 0
//! subtotal = days × daily rate + extras
//! total    = max(0, subtotal - discount)
//! ```
//!
//! Every input is coerced rather than rejected: an unparseable date gives
//! zero days, a NaN or negative amount counts as zero. The same input always
//! yields the same quote.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::contract::RentalTerms;
use crate::money::Money;
use crate::MS_PER_DAY;

/// Naive date-time layouts accepted from form inputs, tried in order.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

// =============================================================================
// Dates
// =============================================================================

/// Parses a rental date as entered in the contract form.
///
/// Accepts `YYYY-MM-DD` (midnight UTC), `datetime-local` values such as
/// `2024-01-01T10:30` (read as UTC) and full RFC 3339 timestamps.
pub fn parse_rental_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Whole rental days between two instants, rounded up.
///
/// ```rust
/// use frota_core::pricing::{parse_rental_date, rental_days};
///
/// let start = parse_rental_date("2024-01-01T10:00").unwrap();
/// let end = parse_rental_date("2024-01-02T11:00").unwrap();
/// assert_eq!(rental_days(start, end), 2);
/// assert_eq!(rental_days(end, start), 0);
/// ```
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let ms = (end - start).num_milliseconds();
    if ms <= 0 {
        return 0;
    }
    // ceil for positive values
    (ms + MS_PER_DAY - 1) / MS_PER_DAY
}

/// [`rental_days`] on raw form strings; unparseable input gives 0.
pub fn days_between(start: &str, end: &str) -> i64 {
    match (parse_rental_date(start), parse_rental_date(end)) {
        (Some(s), Some(e)) => rental_days(s, e),
        _ => 0,
    }
}

// =============================================================================
// Quotes
// =============================================================================

/// Result of pricing a rental period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    pub days: i64,
    pub subtotal: Money,
    pub total: Money,
}

fn coerce_amount(amount: f64) -> Money {
    Money::from_euros(amount).non_negative()
}

/// Prices a period from raw inputs.
///
/// ## Example
/// ```rust
/// use frota_core::pricing::quote;
///
/// // 4 days × €50 + €20 extras - €30 discount
/// let q = quote("2024-01-01", "2024-01-05", 50.0, 20.0, 30.0);
/// assert_eq!(q.days, 4);
/// assert_eq!(q.subtotal.cents(), 22_000);
/// assert_eq!(q.total.cents(), 19_000);
/// ```
pub fn quote(start: &str, end: &str, daily_rate: f64, extras: f64, discount: f64) -> PriceQuote {
    let days = days_between(start, end);
    let subtotal = coerce_amount(daily_rate) * days + coerce_amount(extras);
    let total = (subtotal - coerce_amount(discount)).non_negative();
    PriceQuote {
        days,
        subtotal,
        total,
    }
}

/// Prices the rental terms of a contract. Absent amounts count as zero.
pub fn quote_terms(terms: &RentalTerms) -> PriceQuote {
    quote(
        &terms.inicio,
        &terms.fim,
        terms.preco_diario.unwrap_or(0.0),
        terms.extras.unwrap_or(0.0),
        terms.desconto.unwrap_or(0.0),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
