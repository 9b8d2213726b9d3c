//! # Pricing Rule
//!
//! Every amount the storefront charges comes from two formulas:
//!
//! ```text
//! line total = daily price × rental days × quantity
//! late fee   = days late × flat rate per day
//! ```
//!
//! Days late round UP: a copy returned one minute after its due date is one
//! day late.

use chrono::{DateTime, Utc};

use crate::money::Money;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Price of one cart or order line.
///
/// ## Example
/// ```rust
/// use reel_core::money::Money;
/// use reel_core::pricing::line_total;
///
/// // DVD $2.00/day, 3 days, quantity 2
/// assert_eq!(line_total(Money::from_cents(200), 3, 2).cents(), 1200);
/// ```
#[inline]
pub fn line_total(daily_price: Money, rental_days: i64, quantity: i64) -> Money {
    daily_price.times(rental_days).times(quantity)
}

/// Whole days between `due` and `returned`, rounded up; 0 when on time.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, Utc};
/// use reel_core::pricing::days_late;
///
/// let due = Utc::now();
/// assert_eq!(days_late(due, due), 0);
/// assert_eq!(days_late(due, due + Duration::days(3)), 3);
/// assert_eq!(days_late(due, due + Duration::hours(25)), 2);
/// ```
pub fn days_late(due: DateTime<Utc>, returned: DateTime<Utc>) -> i64 {
    let overdue_ms = (returned - due).num_milliseconds();
    if overdue_ms <= 0 {
        return 0;
    }
    (overdue_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Late fee for a number of days late.
#[inline]
pub fn late_fee(days_late: i64, rate_per_day: Money) -> Money {
    rate_per_day.times(days_late.max(0))
}
