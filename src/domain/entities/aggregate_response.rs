//! # Aggregate Response
//!
//! Result of one quote request: ranked quotes, raw per-provider results and
//! cache provenance.

use crate::domain::entities::quote::Quote;
use crate::domain::value_objects::amount::SendAmount;
use crate::domain::value_objects::corridor::Corridor;
use crate::domain::value_objects::enums::SortBy;
use crate::domain::value_objects::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// Optional constraints applied to successful quotes before ranking.
///
/// All set constraints must hold (logical AND). Method constraints are
/// case-insensitive substring matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteFilters {
    /// Maximum fee in source currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee: Option<f64>,
    /// Maximum delivery time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delivery_time_minutes: Option<u32>,
    /// Required payment method substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Required delivery method substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<String>,
}

impl QuoteFilters {
    /// Returns true if no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max_fee.is_none()
            && self.max_delivery_time_minutes.is_none()
            && self.payment_method.is_none()
            && self.delivery_method.is_none()
    }

    /// Returns true if `quote` satisfies every set constraint.
    ///
    /// Quotes missing a constrained field do not match.
    #[must_use]
    pub fn matches(&self, quote: &Quote) -> bool {
        if let Some(max_fee) = self.max_fee {
            match quote.fee() {
                Some(fee) if fee <= max_fee => {}
                _ => return false,
            }
        }
        if let Some(max_minutes) = self.max_delivery_time_minutes {
            match quote.delivery_time_minutes() {
                Some(minutes) if minutes <= max_minutes => {}
                _ => return false,
            }
        }
        if let Some(wanted) = &self.payment_method {
            if !contains_ignore_case(quote.payment_method(), wanted) {
                return false;
            }
        }
        if let Some(wanted) = &self.delivery_method {
            if !contains_ignore_case(quote.delivery_method(), wanted) {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

/// Aggregated answer for `(corridor, amount)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    /// The corridor quoted.
    pub corridor: Corridor,
    /// The amount quoted.
    pub amount: SendAmount,
    /// True if at least one ranked quote is available.
    pub success: bool,
    /// Normalized, filtered, ranked successful quotes.
    pub results: Vec<Quote>,
    /// Raw result of every provider, successful or not.
    pub all_results: Vec<Quote>,
    /// True if served without a provider fan-out.
    pub cache_hit: bool,
    /// True if quotes were recomputed from a cached corridor rate.
    pub rate_calculation: bool,
    /// Wall-clock time spent on the request.
    pub elapsed_seconds: f64,
    /// Filters applied to the ranked list.
    pub filters_applied: QuoteFilters,
    /// Ranking criterion used.
    pub sort_by: SortBy,
    /// Reason when no quote is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the response was produced.
    pub timestamp: Timestamp,
}

impl AggregateResponse {
    /// Creates a response with no quotes and an explanatory message.
    #[must_use]
    pub fn failed(
        corridor: Corridor,
        amount: SendAmount,
        sort_by: SortBy,
        filters: QuoteFilters,
        message: impl Into<String>,
    ) -> Self {
        Self {
            corridor,
            amount,
            success: false,
            results: Vec::new(),
            all_results: Vec::new(),
            cache_hit: false,
            rate_calculation: false,
            elapsed_seconds: 0.0,
            filters_applied: filters,
            sort_by,
            error_message: Some(message.into()),
            timestamp: Timestamp::now(),
        }
    }

    /// Number of providers that returned a successful quote.
    #[must_use]
    pub fn successful_count(&self) -> usize {
        self.all_results.iter().filter(|q| q.is_success()).count()
    }

    /// Returns true if any raw result comes from `provider_id` (case-insensitive).
    #[must_use]
    pub fn mentions_provider(&self, provider_id: &str) -> bool {
        self.all_results
            .iter()
            .any(|q| q.provider_id().eq_ignore_ascii_case(provider_id))
    }

    /// Returns the best ranked quote, if any.
    #[must_use]
    pub fn best_quote(&self) -> Option<&Quote> {
        self.results.first()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::quote::QuoteBuilder;
    use crate::domain::value_objects::corridor::CurrencyCode;

    fn quote(fee: Option<f64>, minutes: Option<u32>, payment: Option<&str>) -> Quote {
        QuoteBuilder::new(
            "p",
            100.0,
            CurrencyCode::parse("USD").unwrap(),
            CurrencyCode::parse("MXN").unwrap(),
        )
        .exchange_rate(18.0)
        .maybe_fee(fee)
        .delivery_time_minutes(minutes)
        .payment_method(payment.map(str::to_string))
        .build()
    }

    #[test]
    fn empty_filters_match_everything() {
        let filters = QuoteFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches(&quote(None, None, None)));
    }

    #[test]
    fn max_fee_filter() {
        let filters = QuoteFilters {
            max_fee: Some(5.0),
            ..Default::default()
        };
        assert!(filters.matches(&quote(Some(5.0), None, None)));
        assert!(!filters.matches(&quote(Some(5.01), None, None)));
        assert!(!filters.matches(&quote(None, None, None)));
    }

    #[test]
    fn filters_compose_as_and() {
        let filters = QuoteFilters {
            max_delivery_time_minutes: Some(60),
            payment_method: Some("CARD".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&quote(None, Some(30), Some("debit_card"))));
        assert!(!filters.matches(&quote(None, Some(90), Some("debit_card"))));
        assert!(!filters.matches(&quote(None, Some(30), Some("bank_transfer"))));
    }

    #[test]
    fn failed_response() {
        let corridor = Corridor::parse("US", "MX", "USD", "MXN").unwrap();
        let response = AggregateResponse::failed(
            corridor,
            SendAmount::new(10.0).unwrap(),
            SortBy::BestRate,
            QuoteFilters::default(),
            "corridor unavailable",
        );
        assert!(!response.success);
        assert_eq!(response.successful_count(), 0);
        assert!(response.best_quote().is_none());
        assert_eq!(response.error_message.as_deref(), Some("corridor unavailable"));
    }
}
