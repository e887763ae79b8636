//! # Ranking Strategy
//!
//! Strategies for ranking quotes.
//!
//! This module provides the [`RankingStrategy`] trait, one implementation per
//! [`SortBy`] criterion, and the filter/rank pipeline that turns raw provider
//! results into the ranked list a caller sees.

use crate::application::services::normalizer::{filter_duplicate_providers, normalize_quote};
use crate::domain::entities::aggregate_response::QuoteFilters;
use crate::domain::entities::quote::Quote;
use crate::domain::value_objects::enums::SortBy;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A quote with its ranking information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedQuote {
    /// The quote being ranked.
    pub quote: Quote,
    /// The rank (1 = best).
    pub rank: usize,
    /// The score used for ranking (higher = better), if the quote had one.
    pub score: Option<f64>,
}

impl RankedQuote {
    /// Creates a new ranked quote.
    #[must_use]
    pub fn new(quote: Quote, rank: usize, score: Option<f64>) -> Self {
        Self { quote, rank, score }
    }

    /// Returns true if this quote is the best (rank 1).
    #[must_use]
    pub fn is_best(&self) -> bool {
        self.rank == 1
    }
}

impl fmt::Display for RankedQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.score {
            Some(score) => write!(f, "RankedQuote(#{} score={score:.4} quote={})", self.rank, self.quote),
            None => write!(f, "RankedQuote(#{} unscored quote={})", self.rank, self.quote),
        }
    }
}

/// Trait for ranking strategies.
///
/// A strategy maps each quote to a score where higher is better. Quotes the
/// strategy cannot score (missing field) rank after every scored quote.
pub trait RankingStrategy: Send + Sync + fmt::Debug {
    /// Scores `quote`, or `None` if the quote lacks the ranked field.
    fn score(&self, quote: &Quote) -> Option<f64>;

    /// Returns the name of this ranking strategy.
    fn name(&self) -> &'static str;

    /// Ranks the given quotes, best first.
    ///
    /// The sort is stable: quotes with equal scores keep their input order.
    fn rank(&self, quotes: &[Quote]) -> Vec<RankedQuote> {
        let mut scored: Vec<(usize, Option<f64>)> = quotes
            .iter()
            .enumerate()
            .map(|(i, q)| (i, self.score(q).filter(|s| !s.is_nan())))
            .collect();

        scored.sort_by(|a, b| compare_scores(a.1, b.1));

        scored
            .into_iter()
            .enumerate()
            .filter_map(|(rank, (idx, score))| {
                quotes
                    .get(idx)
                    .map(|q| RankedQuote::new(q.clone(), rank + 1, score))
            })
            .collect()
    }
}

/// Higher scores first, unscored last.
fn compare_scores(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Descending exchange rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestRateStrategy;

impl RankingStrategy for BestRateStrategy {
    fn score(&self, quote: &Quote) -> Option<f64> {
        quote.exchange_rate()
    }

    fn name(&self) -> &'static str {
        "BestRate"
    }
}

/// Ascending fee.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestFeeStrategy;

impl RankingStrategy for LowestFeeStrategy {
    fn score(&self, quote: &Quote) -> Option<f64> {
        quote.fee().map(|fee| -fee)
    }

    fn name(&self) -> &'static str {
        "LowestFee"
    }
}

/// Ascending delivery time.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastestTimeStrategy;

impl RankingStrategy for FastestTimeStrategy {
    fn score(&self, quote: &Quote) -> Option<f64> {
        quote.delivery_time_minutes().map(|m| -f64::from(m))
    }

    fn name(&self) -> &'static str {
        "FastestTime"
    }
}

/// Descending `exchange_rate × (1 − fee / send_amount)`.
///
/// A missing fee or a zero send amount carries no fee penalty.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestValueStrategy;

impl RankingStrategy for BestValueStrategy {
    fn score(&self, quote: &Quote) -> Option<f64> {
        let rate = quote.exchange_rate()?;
        let send_amount = quote.send_amount();
        let penalty = match quote.fee() {
            Some(fee) if send_amount != 0.0 => fee / send_amount,
            _ => 0.0,
        };
        Some(rate * (1.0 - penalty))
    }

    fn name(&self) -> &'static str {
        "BestValue"
    }
}

/// Returns the strategy implementing `sort_by`.
#[must_use]
pub fn strategy_for(sort_by: SortBy) -> &'static dyn RankingStrategy {
    match sort_by {
        SortBy::BestRate => &BestRateStrategy,
        SortBy::LowestFee => &LowestFeeStrategy,
        SortBy::FastestTime => &FastestTimeStrategy,
        SortBy::BestValue => &BestValueStrategy,
    }
}

/// Sorts `quotes` by `sort_by`, best first. Stable.
#[must_use]
pub fn sort_quotes(quotes: &[Quote], sort_by: SortBy) -> Vec<Quote> {
    strategy_for(sort_by)
        .rank(quotes)
        .into_iter()
        .map(|ranked| ranked.quote)
        .collect()
}

/// Keeps the successful quotes satisfying every set filter.
#[must_use]
pub fn apply_filters(quotes: &[Quote], filters: &QuoteFilters) -> Vec<Quote> {
    quotes
        .iter()
        .filter(|q| q.is_success() && filters.matches(q))
        .cloned()
        .collect()
}

/// Turns raw provider results into the ranked list.
///
/// Normalizes every quote, drops duplicate providers, keeps successful
/// quotes passing `filters`, and sorts them by `sort_by`.
#[must_use]
pub fn rank_results(all_results: &[Quote], sort_by: SortBy, filters: &QuoteFilters) -> Vec<Quote> {
    let normalized: Vec<Quote> = all_results
        .iter()
        .filter(|q| q.is_success())
        .map(normalize_quote)
        .collect();
    let unique = filter_duplicate_providers(normalized);
    sort_quotes(&apply_filters(&unique, filters), sort_by)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::entities::quote::QuoteBuilder;
    use crate::domain::value_objects::corridor::CurrencyCode;
    use proptest::prelude::*;

    fn create_quote(
        provider: &str,
        rate: Option<f64>,
        fee: Option<f64>,
        minutes: Option<u32>,
    ) -> Quote {
        QuoteBuilder::new(
            provider,
            1000.0,
            CurrencyCode::parse("USD").unwrap(),
            CurrencyCode::parse("MXN").unwrap(),
        )
        .maybe_exchange_rate(rate)
        .maybe_fee(fee)
        .delivery_time_minutes(minutes)
        .build()
    }

    fn ids(quotes: &[Quote]) -> Vec<&str> {
        quotes.iter().map(Quote::provider_id).collect()
    }

    #[test]
    fn ranked_quote_is_best() {
        let quote = create_quote("a", Some(18.0), None, None);
        assert!(RankedQuote::new(quote.clone(), 1, Some(18.0)).is_best());
        assert!(!RankedQuote::new(quote, 2, Some(17.0)).is_best());
    }

    #[test]
    fn best_rate_descending_missing_last() {
        let quotes = vec![
            create_quote("a", Some(18.0), None, None),
            create_quote("b", None, None, None),
            create_quote("c", Some(18.5), None, None),
        ];
        assert_eq!(ids(&sort_quotes(&quotes, SortBy::BestRate)), ["c", "a", "b"]);
    }

    #[test]
    fn lowest_fee_ascending_missing_last() {
        let quotes = vec![
            create_quote("a", Some(18.0), None, None),
            create_quote("b", Some(18.0), Some(4.0), None),
            create_quote("c", Some(18.0), Some(0.0), None),
        ];
        assert_eq!(ids(&sort_quotes(&quotes, SortBy::LowestFee)), ["c", "b", "a"]);
    }

    #[test]
    fn fastest_time_ascending_missing_last() {
        let quotes = vec![
            create_quote("a", Some(18.0), None, None),
            create_quote("b", Some(18.0), None, Some(2880)),
            create_quote("c", Some(18.0), None, Some(10)),
        ];
        assert_eq!(ids(&sort_quotes(&quotes, SortBy::FastestTime)), ["c", "b", "a"]);
    }

    #[test]
    fn best_value_trades_rate_against_fee() {
        let quotes = vec![
            // 18.5 * (1 - 50/1000) = 17.575
            create_quote("pricey", Some(18.5), Some(50.0), None),
            // 18.0 * (1 - 1/1000) = 17.982
            create_quote("cheap", Some(18.0), Some(1.0), None),
        ];
        assert_eq!(ids(&sort_quotes(&quotes, SortBy::BestValue)), ["cheap", "pricey"]);
    }

    #[test]
    fn best_value_zero_amount_has_no_penalty() {
        let quote = QuoteBuilder::new(
            "z",
            0.0,
            CurrencyCode::parse("USD").unwrap(),
            CurrencyCode::parse("MXN").unwrap(),
        )
        .exchange_rate(18.0)
        .fee(5.0)
        .build();
        assert_eq!(BestValueStrategy.score(&quote), Some(18.0));
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let quotes = vec![
            create_quote("first", Some(18.0), Some(1.0), None),
            create_quote("second", Some(18.0), Some(1.0), None),
            create_quote("third", Some(18.0), Some(1.0), None),
        ];
        for sort_by in [SortBy::BestRate, SortBy::LowestFee, SortBy::BestValue] {
            assert_eq!(
                ids(&sort_quotes(&quotes, sort_by)),
                ["first", "second", "third"]
            );
        }
    }

    #[test]
    fn filters_drop_failed_quotes() {
        let ok = create_quote("ok", Some(18.0), Some(1.0), None);
        let failed = ok.to_builder().provider_id("bad").failed("down").build();
        let kept = apply_filters(&[ok, failed], &QuoteFilters::default());
        assert_eq!(ids(&kept), ["ok"]);
    }

    #[test]
    fn rank_results_normalizes_dedups_filters_and_sorts() {
        let all = vec![
            create_quote("Wise", Some(18.0), Some(3.0), Some(60)),
            create_quote("remitly", Some(18.4), Some(10.0), Some(30)),
            create_quote("wise", Some(18.2), Some(3.0), Some(60)),
            create_quote("xoom", Some(18.9), None, None)
                .to_builder()
                .failed("unsupported")
                .build(),
        ];
        let filters = QuoteFilters {
            max_fee: Some(5.0),
            ..QuoteFilters::default()
        };

        let ranked = rank_results(&all, SortBy::BestRate, &filters);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].exchange_rate(), Some(18.2));
        assert!(ranked[0].destination_amount().is_some());
    }

    #[test]
    fn strategy_names() {
        assert_eq!(strategy_for(SortBy::BestRate).name(), "BestRate");
        assert_eq!(strategy_for(SortBy::LowestFee).name(), "LowestFee");
        assert_eq!(strategy_for(SortBy::FastestTime).name(), "FastestTime");
        assert_eq!(strategy_for(SortBy::BestValue).name(), "BestValue");
    }

    fn quotes_strategy() -> impl Strategy<Value = Vec<Quote>> {
        prop::collection::vec(
            (
                proptest::option::of(0.1f64..100.0),
                proptest::option::of(0.0f64..100.0),
                proptest::option::of(0u32..10_000),
            ),
            0..25,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (rate, fee, minutes))| {
                    create_quote(&format!("p{i}"), rate, fee, minutes)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_lowest_fee_is_non_decreasing(quotes in quotes_strategy()) {
            let sorted = sort_quotes(&quotes, SortBy::LowestFee);
            let fees: Vec<f64> = sorted.iter().map(|q| q.fee().unwrap_or(f64::INFINITY)).collect();
            prop_assert!(fees.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn prop_best_rate_is_non_increasing(quotes in quotes_strategy()) {
            let sorted = sort_quotes(&quotes, SortBy::BestRate);
            let rates: Vec<f64> = sorted
                .iter()
                .map(|q| q.exchange_rate().unwrap_or(f64::NEG_INFINITY))
                .collect();
            prop_assert!(rates.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn prop_sort_is_a_permutation(quotes in quotes_strategy()) {
            let sorted = sort_quotes(&quotes, SortBy::FastestTime);
            prop_assert_eq!(sorted.len(), quotes.len());
            let mut before: Vec<&str> = ids(&quotes);
            let mut after: Vec<&str> = ids(&sorted);
            before.sort_unstable();
            after.sort_unstable();
            prop_assert_eq!(before, after);
        }
    }
}
