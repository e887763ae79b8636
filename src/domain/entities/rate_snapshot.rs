//! # Corridor Rate Snapshot
//!
//! Amount-independent view of what each provider charges on a corridor.
//!
//! A snapshot keeps only the fields that do not depend on the send amount:
//! exchange rate, fee schedule, delivery time and methods. Quotes for any
//! amount can be recomputed from it without calling providers. Snapshots are
//! replaced wholesale; there are no partial updates.

use crate::domain::entities::quote::{Quote, QuoteBuilder, compute_destination_amount};
use crate::domain::value_objects::corridor::Corridor;
use crate::domain::value_objects::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// A fee that applies from `min_amount` upwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeTier {
    /// Lowest send amount this fee applies to.
    pub min_amount: f64,
    /// Fee in source currency.
    pub fee: f64,
}

impl FeeTier {
    /// Creates a fee tier.
    #[must_use]
    pub fn new(min_amount: f64, fee: f64) -> Self {
        Self { min_amount, fee }
    }
}

/// Invariant pricing fields of one provider on one corridor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRate {
    provider_id: String,
    exchange_rate: f64,
    fee_tiers: Vec<FeeTier>,
    delivery_time_minutes: Option<u32>,
    payment_method: Option<String>,
    delivery_method: Option<String>,
}

impl ProviderRate {
    /// Creates a provider rate. Tiers are sorted by threshold.
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        exchange_rate: f64,
        mut fee_tiers: Vec<FeeTier>,
        delivery_time_minutes: Option<u32>,
        payment_method: Option<String>,
        delivery_method: Option<String>,
    ) -> Self {
        fee_tiers.sort_by(|a, b| a.min_amount.total_cmp(&b.min_amount));
        fee_tiers.dedup_by(|a, b| a.min_amount == b.min_amount);
        Self {
            provider_id: provider_id.into(),
            exchange_rate,
            fee_tiers,
            delivery_time_minutes,
            payment_method,
            delivery_method,
        }
    }

    /// Extracts the invariant fields of a successful quote.
    ///
    /// Returns `None` for failed quotes and quotes without an exchange rate.
    #[must_use]
    pub fn from_quote(quote: &Quote) -> Option<Self> {
        if !quote.is_success() {
            return None;
        }
        let rate = quote.exchange_rate()?;
        Some(Self::new(
            quote.provider_id(),
            rate,
            vec![FeeTier::new(quote.send_amount(), quote.fee().unwrap_or(0.0))],
            quote.delivery_time_minutes(),
            quote.payment_method().map(str::to_string),
            quote.delivery_method().map(str::to_string),
        ))
    }

    /// Returns the provider identifier.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Returns the exchange rate.
    #[must_use]
    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate
    }

    /// Returns the fee tiers, ascending by threshold.
    #[must_use]
    pub fn fee_tiers(&self) -> &[FeeTier] {
        &self.fee_tiers
    }

    /// Returns the fee charged for `amount`.
    ///
    /// Picks the tier with the largest threshold not above `amount`; amounts
    /// below every threshold use the lowest tier. No tiers means no fee.
    #[must_use]
    pub fn fee_for(&self, amount: f64) -> f64 {
        self.fee_tiers
            .iter()
            .rev()
            .find(|tier| tier.min_amount <= amount)
            .or_else(|| self.fee_tiers.first())
            .map_or(0.0, |tier| tier.fee)
    }

    /// Recomputes this provider's quote for `amount` on `corridor`.
    #[must_use]
    pub fn quote_for(&self, corridor: &Corridor, amount: f64, at: Timestamp) -> Quote {
        let fee = self.fee_for(amount);
        let builder = QuoteBuilder::new(
            self.provider_id.clone(),
            amount,
            corridor.source_currency().clone(),
            corridor.dest_currency().clone(),
        )
        .timestamp(at);

        if amount <= fee {
            return builder
                .failed(format!(
                    "amount {amount} does not cover provider fee {fee}"
                ))
                .build();
        }

        builder
            .exchange_rate(self.exchange_rate)
            .fee(fee)
            .destination_amount(compute_destination_amount(
                amount,
                Some(fee),
                self.exchange_rate,
            ))
            .delivery_time_minutes(self.delivery_time_minutes)
            .payment_method(self.payment_method.clone())
            .delivery_method(self.delivery_method.clone())
            .build()
    }
}

/// Per-corridor collection of provider rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorRateSnapshot {
    corridor: Corridor,
    providers: Vec<ProviderRate>,
    timestamp: Timestamp,
}

impl CorridorRateSnapshot {
    /// Creates a snapshot from provider rates.
    #[must_use]
    pub fn new(corridor: Corridor, providers: Vec<ProviderRate>, timestamp: Timestamp) -> Self {
        Self {
            corridor,
            providers,
            timestamp,
        }
    }

    /// Builds a snapshot from the successful quotes of a fan-out.
    ///
    /// Returns `None` when no quote carries an exchange rate.
    #[must_use]
    pub fn from_quotes(corridor: Corridor, quotes: &[Quote]) -> Option<Self> {
        let providers: Vec<ProviderRate> = quotes.iter().filter_map(ProviderRate::from_quote).collect();
        if providers.is_empty() {
            return None;
        }
        Some(Self::new(corridor, providers, Timestamp::now()))
    }

    /// Returns the corridor.
    #[must_use]
    pub fn corridor(&self) -> &Corridor {
        &self.corridor
    }

    /// Returns the provider rates.
    #[must_use]
    pub fn providers(&self) -> &[ProviderRate] {
        &self.providers
    }

    /// Returns when the snapshot was taken.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Returns true if any provider in the snapshot has the given id (case-insensitive).
    #[must_use]
    pub fn mentions_provider(&self, provider_id: &str) -> bool {
        self.providers
            .iter()
            .any(|p| p.provider_id.eq_ignore_ascii_case(provider_id))
    }

    /// Recomputes one quote per provider for `amount`.
    #[must_use]
    pub fn quotes_for_amount(&self, amount: f64) -> Vec<Quote> {
        let at = Timestamp::now();
        self.providers
            .iter()
            .map(|p| p.quote_for(&self.corridor, amount, at))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn corridor() -> Corridor {
        Corridor::parse("US", "MX", "USD", "MXN").unwrap()
    }

    fn quote(provider: &str, amount: f64, rate: f64, fee: f64) -> Quote {
        QuoteBuilder::new(
            provider,
            amount,
            corridor().source_currency().clone(),
            corridor().dest_currency().clone(),
        )
        .exchange_rate(rate)
        .fee(fee)
        .delivery_time_minutes(Some(30))
        .build()
    }

    #[test]
    fn fee_for_picks_highest_applicable_tier() {
        let rate = ProviderRate::new(
            "p",
            18.0,
            vec![
                FeeTier::new(1000.0, 2.0),
                FeeTier::new(0.0, 5.0),
                FeeTier::new(500.0, 3.0),
            ],
            None,
            None,
            None,
        );
        assert_eq!(rate.fee_for(100.0), 5.0);
        assert_eq!(rate.fee_for(500.0), 3.0);
        assert_eq!(rate.fee_for(999.0), 3.0);
        assert_eq!(rate.fee_for(5000.0), 2.0);
    }

    #[test]
    fn fee_below_all_thresholds_uses_lowest_tier() {
        let rate = ProviderRate::new("p", 18.0, vec![FeeTier::new(1000.0, 5.0)], None, None, None);
        assert_eq!(rate.fee_for(500.0), 5.0);
    }

    #[test]
    fn fee_without_tiers_is_zero() {
        let rate = ProviderRate::new("p", 18.0, vec![], None, None, None);
        assert_eq!(rate.fee_for(500.0), 0.0);
    }

    #[test]
    fn from_quotes_skips_failures() {
        let quotes = vec![
            quote("a", 1000.0, 18.5, 5.0),
            Quote::failure(
                "b",
                1000.0,
                corridor().source_currency().clone(),
                corridor().dest_currency().clone(),
                "unsupported",
            ),
        ];
        let snapshot = CorridorRateSnapshot::from_quotes(corridor(), &quotes).unwrap();
        assert_eq!(snapshot.providers().len(), 1);
        assert!(snapshot.mentions_provider("A"));
        assert!(!snapshot.mentions_provider("b"));
    }

    #[test]
    fn from_quotes_all_failed_is_none() {
        let quotes = vec![Quote::failure(
            "b",
            1000.0,
            corridor().source_currency().clone(),
            corridor().dest_currency().clone(),
            "unsupported",
        )];
        assert!(CorridorRateSnapshot::from_quotes(corridor(), &quotes).is_none());
    }

    #[test]
    fn quotes_for_amount_recomputes_destination() {
        let snapshot =
            CorridorRateSnapshot::from_quotes(corridor(), &[quote("a", 1000.0, 18.5, 5.0)]).unwrap();
        let quotes = snapshot.quotes_for_amount(500.0);
        assert_eq!(quotes.len(), 1);
        let q = &quotes[0];
        assert!(q.is_success());
        assert_eq!(q.send_amount(), 500.0);
        assert_eq!(q.fee(), Some(5.0));
        assert_eq!(q.delivery_time_minutes(), Some(30));
        assert!((q.destination_amount().unwrap() - (500.0 - 5.0) * 18.5).abs() < 1e-9);
    }

    #[test]
    fn amount_not_covering_fee_fails() {
        let snapshot =
            CorridorRateSnapshot::from_quotes(corridor(), &[quote("a", 1000.0, 18.5, 5.0)]).unwrap();
        let quotes = snapshot.quotes_for_amount(4.0);
        assert!(!quotes[0].is_success());
        assert!(quotes[0].error_message().unwrap().contains("does not cover"));
    }
}
