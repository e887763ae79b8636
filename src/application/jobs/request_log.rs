//! # Request Log
//!
//! In-process counters of inbound quote queries, used to pick the corridors
//! worth refreshing ahead of demand.

use crate::domain::value_objects::amount::SendAmount;
use crate::domain::value_objects::corridor::Corridor;
use crate::domain::value_objects::timestamp::Timestamp;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct QueryCounter {
    amount: SendAmount,
    count: u64,
    last_seen: Timestamp,
}

/// A query and how often it was asked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularQuery {
    /// Corridor queried.
    pub corridor: Corridor,
    /// Amount queried. For corridor rankings, the most requested amount.
    pub amount: SendAmount,
    /// Number of requests.
    pub count: u64,
    /// Most recent request.
    pub last_seen: Timestamp,
}

/// Concurrent per-`(corridor, amount)` request counters.
#[derive(Debug, Default)]
pub struct RequestLog {
    counters: DashMap<(Corridor, i64), QueryCounter>,
}

impl RequestLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one request.
    pub fn record(&self, corridor: &Corridor, amount: SendAmount) {
        let now = Timestamp::now();
        self.counters
            .entry((corridor.clone(), amount.minor_units()))
            .and_modify(|c| {
                c.count += 1;
                c.last_seen = now;
            })
            .or_insert(QueryCounter {
                amount,
                count: 1,
                last_seen: now,
            });
    }

    /// Number of distinct queries tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// The `n` most frequent queries, most frequent first.
    #[must_use]
    pub fn top_queries(&self, n: usize) -> Vec<PopularQuery> {
        let mut queries: Vec<PopularQuery> = self
            .counters
            .iter()
            .map(|entry| PopularQuery {
                corridor: entry.key().0.clone(),
                amount: entry.amount,
                count: entry.count,
                last_seen: entry.last_seen,
            })
            .collect();
        sort_by_popularity(&mut queries);
        queries.truncate(n);
        queries
    }

    /// The `n` most requested corridors, each with its most requested amount.
    #[must_use]
    pub fn top_corridors(&self, n: usize) -> Vec<PopularQuery> {
        let mut per_corridor: HashMap<Corridor, (PopularQuery, u64)> = HashMap::new();

        for entry in &self.counters {
            let corridor = &entry.key().0;
            let counter = *entry.value();
            per_corridor
                .entry(corridor.clone())
                .and_modify(|(agg, best_count)| {
                    agg.count += counter.count;
                    agg.last_seen = agg.last_seen.max(counter.last_seen);
                    if counter.count > *best_count {
                        *best_count = counter.count;
                        agg.amount = counter.amount;
                    }
                })
                .or_insert_with(|| {
                    (
                        PopularQuery {
                            corridor: corridor.clone(),
                            amount: counter.amount,
                            count: counter.count,
                            last_seen: counter.last_seen,
                        },
                        counter.count,
                    )
                });
        }

        let mut corridors: Vec<PopularQuery> = per_corridor.into_values().map(|(q, _)| q).collect();
        sort_by_popularity(&mut corridors);
        corridors.truncate(n);
        corridors
    }

    /// Drops queries not seen since `cutoff`. Returns the number dropped.
    pub fn prune_older_than(&self, cutoff: Timestamp) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, c| !c.last_seen.is_before(&cutoff));
        before.saturating_sub(self.counters.len())
    }
}

fn sort_by_popularity(queries: &mut [PopularQuery]) {
    queries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.last_seen.cmp(&a.last_seen))
    });
}
