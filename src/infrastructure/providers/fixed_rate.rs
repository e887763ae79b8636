//! # Fixed Rate Provider
//!
//! Provider adapter backed by a static rate table.
//!
//! Used for partner agreements with contractually fixed pricing and for
//! deployments without live adapters. Each entry prices one currency pair,
//! optionally restricted to a country pair.
//!
//! # Examples
//!
//! ```
//! use remit_quotes::infrastructure::providers::fixed_rate::{FixedRateEntry, FixedRateProvider};
//!
//! let provider = FixedRateProvider::new("partner-bank")
//!     .with_entry(FixedRateEntry::new("USD", "MXN", 18.4).with_flat_fee(3.0));
//! ```

use crate::domain::entities::quote::{Quote, QuoteBuilder, compute_destination_amount};
use crate::domain::value_objects::quote_request::QuoteRequest;
use crate::infrastructure::providers::error::ProviderResult;
use crate::infrastructure::providers::traits::{DEFAULT_PROVIDER_TIMEOUT, QuoteProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One priced currency pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedRateEntry {
    /// Source currency (ISO-4217).
    pub source_currency: String,
    /// Destination currency (ISO-4217).
    pub dest_currency: String,
    /// Restrict to this source country (alpha-2); any when absent.
    #[serde(default)]
    pub source_country: Option<String>,
    /// Restrict to this destination country (alpha-2); any when absent.
    #[serde(default)]
    pub dest_country: Option<String>,
    /// Exchange rate.
    pub exchange_rate: f64,
    /// Flat fee in source currency.
    #[serde(default)]
    pub flat_fee: f64,
    /// Percentage fee applied on the send amount (1.5 = 1.5%).
    #[serde(default)]
    pub percent_fee: f64,
    /// Delivery time in minutes.
    #[serde(default)]
    pub delivery_time_minutes: Option<u32>,
    /// Payment method offered.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Delivery method offered.
    #[serde(default)]
    pub delivery_method: Option<String>,
}

impl FixedRateEntry {
    /// Creates an entry with no fee and no country restriction.
    #[must_use]
    pub fn new(
        source_currency: impl Into<String>,
        dest_currency: impl Into<String>,
        exchange_rate: f64,
    ) -> Self {
        Self {
            source_currency: source_currency.into(),
            dest_currency: dest_currency.into(),
            source_country: None,
            dest_country: None,
            exchange_rate,
            flat_fee: 0.0,
            percent_fee: 0.0,
            delivery_time_minutes: None,
            payment_method: None,
            delivery_method: None,
        }
    }

    /// Sets the flat fee.
    #[must_use]
    pub fn with_flat_fee(mut self, fee: f64) -> Self {
        self.flat_fee = fee;
        self
    }

    /// Sets the percentage fee.
    #[must_use]
    pub fn with_percent_fee(mut self, percent: f64) -> Self {
        self.percent_fee = percent;
        self
    }

    /// Restricts the entry to a country pair.
    #[must_use]
    pub fn for_countries(
        mut self,
        source_country: impl Into<String>,
        dest_country: impl Into<String>,
    ) -> Self {
        self.source_country = Some(source_country.into());
        self.dest_country = Some(dest_country.into());
        self
    }

    /// Sets the delivery time.
    #[must_use]
    pub fn with_delivery_time(mut self, minutes: u32) -> Self {
        self.delivery_time_minutes = Some(minutes);
        self
    }

    /// Sets the payment and delivery methods.
    #[must_use]
    pub fn with_methods(
        mut self,
        payment_method: impl Into<String>,
        delivery_method: impl Into<String>,
    ) -> Self {
        self.payment_method = Some(payment_method.into());
        self.delivery_method = Some(delivery_method.into());
        self
    }

    fn matches(&self, request: &QuoteRequest) -> bool {
        let corridor = request.corridor();
        let country_ok = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .is_none_or(|w| w.eq_ignore_ascii_case(actual))
        };
        self.source_currency
            .eq_ignore_ascii_case(corridor.source_currency().as_str())
            && self
                .dest_currency
                .eq_ignore_ascii_case(corridor.dest_currency().as_str())
            && country_ok(&self.source_country, corridor.source_country().as_str())
            && country_ok(&self.dest_country, corridor.dest_country().as_str())
    }

    fn fee_for(&self, amount: f64) -> f64 {
        self.flat_fee + amount * self.percent_fee / 100.0
    }
}

/// Configuration of a fixed rate provider, as read from the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedRateProviderConfig {
    /// Provider identifier.
    pub id: String,
    /// Timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Rate table.
    #[serde(default)]
    pub rates: Vec<FixedRateEntry>,
}

/// Provider adapter pricing from a static table.
#[derive(Debug, Clone)]
pub struct FixedRateProvider {
    provider_id: String,
    timeout: Duration,
    entries: Vec<FixedRateEntry>,
}

impl FixedRateProvider {
    /// Creates a provider with an empty table.
    #[must_use]
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            entries: Vec::new(),
        }
    }

    /// Creates a provider from its configuration.
    #[must_use]
    pub fn from_config(config: &FixedRateProviderConfig) -> Self {
        let mut provider = Self::new(config.id.clone());
        if let Some(ms) = config.timeout_ms {
            provider.timeout = Duration::from_millis(ms);
        }
        provider.entries = config.rates.clone();
        provider
    }

    /// Adds a rate table entry.
    #[must_use]
    pub fn with_entry(mut self, entry: FixedRateEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the rate table.
    #[must_use]
    pub fn entries(&self) -> &[FixedRateEntry] {
        &self.entries
    }
}

#[async_trait]
impl QuoteProvider for FixedRateProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_quote(&self, request: &QuoteRequest) -> ProviderResult<Quote> {
        let corridor = request.corridor();
        let amount = request.amount().get();

        let Some(entry) = self.entries.iter().find(|e| e.matches(request)) else {
            return Ok(Quote::failure(
                self.provider_id.clone(),
                amount,
                corridor.source_currency().clone(),
                corridor.dest_currency().clone(),
                format!("corridor {corridor} not supported"),
            ));
        };

        let fee = entry.fee_for(amount);
        let builder = QuoteBuilder::new(
            self.provider_id.clone(),
            amount,
            corridor.source_currency().clone(),
            corridor.dest_currency().clone(),
        );
        if amount <= fee {
            return Ok(builder
                .failed(format!("amount {amount} does not cover fee {fee}"))
                .build());
        }

        Ok(builder
            .exchange_rate(entry.exchange_rate)
            .fee(fee)
            .destination_amount(compute_destination_amount(
                amount,
                Some(fee),
                entry.exchange_rate,
            ))
            .delivery_time_minutes(entry.delivery_time_minutes)
            .payment_method(entry.payment_method.clone())
            .delivery_method(entry.delivery_method.clone())
            .build())
    }
}
