//! # Quote Entity
//!
//! One provider's priced offer, or failure, for moving an amount across a
//! corridor.
//!
//! Quotes are immutable once built. Provider adapters construct them through
//! [`QuoteBuilder`]; the normalizer derives new quotes with
//! [`Quote::to_builder`] instead of mutating.
//!
//! # Examples
//!
//! ```
//! use remit_quotes::domain::entities::quote::QuoteBuilder;
//! use remit_quotes::domain::value_objects::corridor::CurrencyCode;
//!
//! let usd = CurrencyCode::parse("USD").unwrap();
//! let mxn = CurrencyCode::parse("MXN").unwrap();
//!
//! let quote = QuoteBuilder::new("wise", 1000.0, usd, mxn)
//!     .exchange_rate(18.5)
//!     .fee(5.0)
//!     .build();
//!
//! assert!(quote.is_success());
//! assert_eq!(quote.exchange_rate(), Some(18.5));
//! ```

use crate::domain::value_objects::corridor::CurrencyCode;
use crate::domain::value_objects::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Computes the amount the recipient gets: `(send_amount - fee) * exchange_rate`.
///
/// A missing fee counts as zero. This is the single formula used both when a
/// provider omits its destination amount and when quotes are recomputed from a
/// cached corridor rate.
#[must_use]
pub fn compute_destination_amount(send_amount: f64, fee: Option<f64>, exchange_rate: f64) -> f64 {
    (send_amount - fee.unwrap_or(0.0)) * exchange_rate
}

/// A canonical provider quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    provider_id: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    send_amount: f64,
    source_currency: CurrencyCode,
    destination_amount: Option<f64>,
    destination_currency: CurrencyCode,
    exchange_rate: Option<f64>,
    fee: Option<f64>,
    payment_method: Option<String>,
    delivery_method: Option<String>,
    delivery_time_minutes: Option<u32>,
    timestamp: Timestamp,
}

impl Quote {
    /// Creates a failed quote carrying `message`.
    #[must_use]
    pub fn failure(
        provider_id: impl Into<String>,
        send_amount: f64,
        source_currency: CurrencyCode,
        destination_currency: CurrencyCode,
        message: impl Into<String>,
    ) -> Self {
        QuoteBuilder::new(provider_id, send_amount, source_currency, destination_currency)
            .failed(message)
            .build()
    }

    /// Returns a builder pre-populated with every field of this quote.
    #[must_use]
    pub fn to_builder(&self) -> QuoteBuilder {
        QuoteBuilder {
            inner: self.clone(),
        }
    }

    /// Returns the provider identifier.
    #[inline]
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Returns true if the provider produced a priced offer.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the failure message, if any.
    #[inline]
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the amount sent in source currency.
    #[inline]
    #[must_use]
    pub fn send_amount(&self) -> f64 {
        self.send_amount
    }

    /// Returns the source currency.
    #[inline]
    #[must_use]
    pub fn source_currency(&self) -> &CurrencyCode {
        &self.source_currency
    }

    /// Returns the amount received in destination currency.
    #[inline]
    #[must_use]
    pub fn destination_amount(&self) -> Option<f64> {
        self.destination_amount
    }

    /// Returns the destination currency.
    #[inline]
    #[must_use]
    pub fn destination_currency(&self) -> &CurrencyCode {
        &self.destination_currency
    }

    /// Returns the exchange rate (destination units per source unit).
    #[inline]
    #[must_use]
    pub fn exchange_rate(&self) -> Option<f64> {
        self.exchange_rate
    }

    /// Returns the fee in source currency.
    #[inline]
    #[must_use]
    pub fn fee(&self) -> Option<f64> {
        self.fee
    }

    /// Returns the payment method.
    #[inline]
    #[must_use]
    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    /// Returns the delivery method.
    #[inline]
    #[must_use]
    pub fn delivery_method(&self) -> Option<&str> {
        self.delivery_method.as_deref()
    }

    /// Returns the delivery time in minutes.
    #[inline]
    #[must_use]
    pub fn delivery_time_minutes(&self) -> Option<u32> {
        self.delivery_time_minutes
    }

    /// Returns when the quote was produced.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(
                f,
                "Quote({} {} {}->{}",
                self.provider_id, self.send_amount, self.source_currency, self.destination_currency
            )?;
            if let Some(rate) = self.exchange_rate {
                write!(f, " @ {rate}")?;
            }
            if let Some(fee) = self.fee {
                write!(f, " fee={fee}")?;
            }
            write!(f, ")")
        } else {
            write!(
                f,
                "Quote({} failed: {})",
                self.provider_id,
                self.error_message.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

/// Builder for [`Quote`].
#[derive(Debug, Clone)]
pub struct QuoteBuilder {
    inner: Quote,
}

impl QuoteBuilder {
    /// Starts a successful quote with only the required fields set.
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        send_amount: f64,
        source_currency: CurrencyCode,
        destination_currency: CurrencyCode,
    ) -> Self {
        Self {
            inner: Quote {
                provider_id: provider_id.into(),
                success: true,
                error_message: None,
                send_amount,
                source_currency,
                destination_amount: None,
                destination_currency,
                exchange_rate: None,
                fee: None,
                payment_method: None,
                delivery_method: None,
                delivery_time_minutes: None,
                timestamp: Timestamp::now(),
            },
        }
    }

    /// Marks the quote as failed with `message`.
    #[must_use]
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.inner.success = false;
        self.inner.error_message = Some(message.into());
        self
    }

    /// Overrides the provider identifier.
    #[must_use]
    pub fn provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.inner.provider_id = provider_id.into();
        self
    }

    /// Sets the exchange rate.
    #[must_use]
    pub fn exchange_rate(mut self, rate: f64) -> Self {
        self.inner.exchange_rate = Some(rate);
        self
    }

    /// Sets or clears the exchange rate.
    #[must_use]
    pub fn maybe_exchange_rate(mut self, rate: Option<f64>) -> Self {
        self.inner.exchange_rate = rate;
        self
    }

    /// Sets the fee.
    #[must_use]
    pub fn fee(mut self, fee: f64) -> Self {
        self.inner.fee = Some(fee);
        self
    }

    /// Sets or clears the fee.
    #[must_use]
    pub fn maybe_fee(mut self, fee: Option<f64>) -> Self {
        self.inner.fee = fee;
        self
    }

    /// Sets the destination amount.
    #[must_use]
    pub fn destination_amount(mut self, amount: f64) -> Self {
        self.inner.destination_amount = Some(amount);
        self
    }

    /// Sets or clears the destination amount.
    #[must_use]
    pub fn maybe_destination_amount(mut self, amount: Option<f64>) -> Self {
        self.inner.destination_amount = amount;
        self
    }

    /// Sets or clears the payment method.
    #[must_use]
    pub fn payment_method(mut self, method: Option<String>) -> Self {
        self.inner.payment_method = method;
        self
    }

    /// Sets or clears the delivery method.
    #[must_use]
    pub fn delivery_method(mut self, method: Option<String>) -> Self {
        self.inner.delivery_method = method;
        self
    }

    /// Sets or clears the delivery time in minutes.
    #[must_use]
    pub fn delivery_time_minutes(mut self, minutes: Option<u32>) -> Self {
        self.inner.delivery_time_minutes = minutes;
        self
    }

    /// Sets the production timestamp.
    #[must_use]
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.inner.timestamp = timestamp;
        self
    }

    /// Builds the quote.
    #[must_use]
    pub fn build(self) -> Quote {
        self.inner
    }
}
