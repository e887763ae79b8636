//! # Send Amount
//!
//! Validated amount of source currency a customer wants to send.

use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parses a finite decimal, ignoring whitespace and `,`/`_` separators.
///
/// Returns `None` for empty, non-numeric or non-finite input.
#[must_use]
pub fn parse_decimal(input: &str) -> Option<f64> {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Positive, finite amount in source currency units.
///
/// # Examples
///
/// ```
/// use remit_quotes::domain::value_objects::amount::SendAmount;
///
/// let amount = SendAmount::parse("1,000").unwrap();
/// assert_eq!(amount.get(), 1000.0);
/// assert_eq!(amount.cache_repr(), "1000.0");
///
/// assert!(SendAmount::new(-5.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SendAmount(f64);

impl SendAmount {
    /// Creates a validated amount.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` if the value is not finite or not
    /// strictly positive.
    pub fn new(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::invalid_amount(format!(
                "{value} is not a finite number"
            )));
        }
        if value <= 0.0 {
            return Err(DomainError::invalid_amount(format!(
                "{value} must be greater than zero"
            )));
        }
        Ok(Self(value))
    }

    /// Parses an amount from user input, tolerating thousands separators.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` on non-numeric input or when
    /// [`SendAmount::new`] rejects the value.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let value = parse_decimal(input)
            .ok_or_else(|| DomainError::invalid_amount(format!("'{input}' is not numeric")))?;
        Self::new(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Float rendering used in cache keys: always carries a decimal point.
    #[must_use]
    pub fn cache_repr(self) -> String {
        format_float(self.0)
    }

    /// Storage key rendering: amount in hundredths, rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn minor_units(self) -> i64 {
        (self.0 * 100.0).round() as i64
    }
}

/// Renders a float so that integral values keep a trailing `.0`.
pub(crate) fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

impl fmt::Display for SendAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_repr())
    }
}

impl TryFrom<f64> for SendAmount {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SendAmount> for f64 {
    fn from(amount: SendAmount) -> Self {
        amount.0
    }
}
