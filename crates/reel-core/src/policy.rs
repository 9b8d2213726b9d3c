//! # Rental Policy
//!
//! The store-wide knobs the lifecycle consults: late fee rate and mode,
//! pickup lead time, longest rental period.
//!
//! Defaults come from the crate constants; `reel-db` overrides them from
//! the environment at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{DEFAULT_PICKUP_LEAD_DAYS, LATE_FEE_PER_DAY_CENTS, MAX_RENTAL_DAYS};

/// How late fees are spread across the lines of a returned order.
///
/// ## Modes
/// ```text
/// Order: pickup Mon, due Thu (order-level), returned Sat
/// Line A: 3 days (due Thu)     Line B: 1 day (due Tue)
///
/// Uniform:  A = 2 days late    B = 2 days late   (one figure for the order)
/// PerLine:  A = 2 days late    B = 4 days late   (pickup + line days)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LateFeeMode {
    /// Days late against the order's due date, same fee on every line.
    Uniform,
    /// Days late against each line's own due date.
    PerLine,
}

impl Default for LateFeeMode {
    fn default() -> Self {
        LateFeeMode::Uniform
    }
}

impl fmt::Display for LateFeeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LateFeeMode::Uniform => f.write_str("uniform"),
            LateFeeMode::PerLine => f.write_str("per_line"),
        }
    }
}

impl FromStr for LateFeeMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(LateFeeMode::Uniform),
            "per_line" | "per-line" | "perline" => Ok(LateFeeMode::PerLine),
            _ => Err(ValidationError::NotAllowed {
                field: "late fee mode".to_string(),
                allowed: vec!["uniform".to_string(), "per_line".to_string()],
            }),
        }
    }
}

/// Store rental policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RentalPolicy {
    /// Flat fee per day overdue.
    pub late_fee_per_day: Money,
    pub late_fee_mode: LateFeeMode,
    /// Days from add-to-cart to the desired pickup date.
    pub pickup_lead_days: i64,
    /// Longest rental period accepted anywhere.
    pub max_rental_days: i64,
}

impl Default for RentalPolicy {
    fn default() -> Self {
        RentalPolicy {
            late_fee_per_day: Money::from_cents(LATE_FEE_PER_DAY_CENTS),
            late_fee_mode: LateFeeMode::Uniform,
            pickup_lead_days: DEFAULT_PICKUP_LEAD_DAYS,
            max_rental_days: MAX_RENTAL_DAYS,
        }
    }
}

impl RentalPolicy {
    /// Sets the late fee per day.
    pub fn late_fee_per_day(mut self, fee: Money) -> Self {
        self.late_fee_per_day = fee;
        self
    }

    /// Sets how late fees are spread across lines.
    pub fn late_fee_mode(mut self, mode: LateFeeMode) -> Self {
        self.late_fee_mode = mode;
        self
    }

    /// Sets the pickup lead time.
    pub fn pickup_lead_days(mut self, days: i64) -> Self {
        self.pickup_lead_days = days;
        self
    }

    /// Sets the longest rental period.
    pub fn max_rental_days(mut self, days: i64) -> Self {
        self.max_rental_days = days;
        self
    }

    /// Rejects policies the lifecycle cannot work with.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.late_fee_per_day.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "late fee per day".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        if self.pickup_lead_days < 0 {
            return Err(ValidationError::OutOfRange {
                field: "pickup lead days".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        if self.max_rental_days <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "max rental days".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RentalPolicy::default();
        assert_eq!(policy.late_fee_per_day.cents(), 500);
        assert_eq!(policy.late_fee_mode, LateFeeMode::Uniform);
        assert_eq!(policy.pickup_lead_days, 1);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let policy = RentalPolicy::default()
            .late_fee_per_day(Money::from_cents(-1))
            .late_fee_mode(LateFeeMode::PerLine);
        assert!(policy.validate().is_err());

        let policy = RentalPolicy::default().max_rental_days(0);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_late_fee_mode_parsing() {
        assert_eq!("Uniform".parse::<LateFeeMode>().unwrap(), LateFeeMode::Uniform);
        assert_eq!("per-line".parse::<LateFeeMode>().unwrap(), LateFeeMode::PerLine);
        assert!("prorated".parse::<LateFeeMode>().is_err());
        assert_eq!(LateFeeMode::PerLine.to_string(), "per_line");
    }
}
