//! # Quote Request
//!
//! What a caller asks providers to price.

use crate::domain::value_objects::amount::SendAmount;
use crate::domain::value_objects::corridor::Corridor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated request to price `amount` on `corridor`.
///
/// Construction requires an already validated [`Corridor`] and
/// [`SendAmount`], so an invalid request cannot reach the cache or providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    corridor: Corridor,
    amount: SendAmount,
    payment_method: Option<String>,
    delivery_method: Option<String>,
}

impl QuoteRequest {
    /// Creates a request with no method preferences.
    #[must_use]
    pub fn new(corridor: Corridor, amount: SendAmount) -> Self {
        Self {
            corridor,
            amount,
            payment_method: None,
            delivery_method: None,
        }
    }

    /// Sets the preferred payment method.
    #[must_use]
    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    /// Sets the preferred delivery method.
    #[must_use]
    pub fn with_delivery_method(mut self, method: impl Into<String>) -> Self {
        self.delivery_method = Some(method.into());
        self
    }

    /// Returns the corridor.
    #[inline]
    #[must_use]
    pub fn corridor(&self) -> &Corridor {
        &self.corridor
    }

    /// Returns the send amount.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> SendAmount {
        self.amount
    }

    /// Returns the preferred payment method.
    #[inline]
    #[must_use]
    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    /// Returns the preferred delivery method.
    #[inline]
    #[must_use]
    pub fn delivery_method(&self) -> Option<&str> {
        self.delivery_method.as_deref()
    }
}

impl fmt::Display for QuoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.corridor)
    }
}
