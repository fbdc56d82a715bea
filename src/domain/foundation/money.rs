//! Money value object.
//!
//! Amounts are stored as integer minor units (paise for INR). Callers and
//! admins speak in major units, so conversion happens once at the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Non-negative amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount, used for free events.
    pub const ZERO: Money = Money(0);

    /// Creates an amount from minor units.
    ///
    /// # Errors
    ///
    /// Returns `NotPositive` for negative values.
    pub fn from_minor(minor: i64) -> Result<Self, ValidationError> {
        if minor < 0 {
            return Err(ValidationError::not_positive("amount", minor));
        }
        Ok(Self(minor))
    }

    /// Converts a major-unit amount (e.g. rupees) into minor units.
    ///
    /// The amount must be a positive, finite number. Sub-paisa fractions
    /// are rounded to the nearest minor unit.
    pub fn from_major(major: f64) -> Result<Self, ValidationError> {
        if !major.is_finite() {
            return Err(ValidationError::invalid_format("amount", "must be a finite number"));
        }
        if major <= 0.0 {
            return Err(ValidationError::not_positive("amount", major));
        }
        let minor = (major * 100.0).round();
        if minor < 1.0 || minor > i64::MAX as f64 {
            return Err(ValidationError::invalid_format("amount", "out of range"));
        }
        Ok(Self(minor as i64))
    }

    /// Amount in minor units.
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Amount in major units, for display and gateway notes.
    pub fn major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_major_converts_to_minor_units() {
        assert_eq!(Money::from_major(500.0).unwrap().minor_units(), 50_000);
        assert_eq!(Money::from_major(12.345).unwrap().minor_units(), 1_235);
    }

    #[test]
    fn from_major_rejects_zero_and_negative() {
        assert!(Money::from_major(0.0).is_err());
        assert!(Money::from_major(-1.0).is_err());
    }

    #[test]
    fn from_major_rejects_non_finite() {
        assert!(Money::from_major(f64::NAN).is_err());
        assert!(Money::from_major(f64::INFINITY).is_err());
    }

    #[test]
    fn from_minor_rejects_negative() {
        assert!(Money::from_minor(-1).is_err());
        assert!(Money::from_minor(0).unwrap().is_zero());
    }

    #[test]
    fn displays_with_two_decimals() {
        assert_eq!(Money::from_minor(50_005).unwrap().to_string(), "500.05");
    }
}
