//! # Refresh Jobs
//!
//! Proactive cache maintenance:
//!
//! - [`RefreshJobs::refresh_popular_corridors`] re-fetches the most requested
//!   corridors so their rate and availability tiers stay warm.
//! - [`RefreshJobs::seed_rate_cache_from_store`] rebuilds a corridor's rate
//!   tier from persisted quotes without calling providers.
//! - [`RefreshJobs::daily_sweep`] clears every tier, applies retention, seeds
//!   the most requested corridors from the store and preloads the most
//!   requested queries.
//!
//! [`RefreshScheduler`] drives the first and last on timers until shutdown.

use crate::application::error::ApplicationResult;
use crate::application::jobs::request_log::{PopularQuery, RequestLog};
use crate::application::services::quote_service::QuoteService;
use crate::domain::entities::rate_snapshot::{CorridorRateSnapshot, FeeTier, ProviderRate};
use crate::domain::value_objects::corridor::Corridor;
use crate::domain::value_objects::enums::CorridorAvailability;
use crate::domain::value_objects::quote_request::QuoteRequest;
use crate::domain::value_objects::timestamp::Timestamp;
use crate::infrastructure::persistence::{QuoteRecord, QuoteRecordFilter, UNSPECIFIED_METHOD};
use chrono::NaiveTime;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Corridors refreshed concurrently by one job run.
const REFRESH_PARALLELISM: usize = 4;

const DAY: Duration = Duration::from_secs(24 * 3600);

/// Refresh job settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Whether the scheduler runs at all.
    pub enabled: bool,
    /// Seconds between popular-corridor refreshes.
    pub interval_secs: u64,
    /// Corridors or queries handled per run.
    pub top_n: usize,
    /// UTC time of the daily sweep.
    pub daily_sweep_time: NaiveTime,
    /// Oldest persisted record used when seeding, in seconds.
    pub seed_max_age_secs: u64,
    /// Request log entries unseen for this long are pruned, in seconds.
    pub request_log_window_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            top_n: 20,
            daily_sweep_time: NaiveTime::from_hms_opt(3, 0, 0).unwrap_or(NaiveTime::MIN),
            seed_max_age_secs: 24 * 3600,
            request_log_window_secs: 7 * 24 * 3600,
        }
    }
}

impl RefreshConfig {
    /// Interval between popular-corridor refreshes.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Result of a popular-corridor refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Corridors fetched.
    pub attempted: usize,
    /// Corridors with at least one successful provider.
    pub available: usize,
    /// Corridors where every provider failed.
    pub unavailable: usize,
}

/// Result of a daily sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Cache keys removed.
    pub invalidated: u64,
    /// Persisted records removed by retention.
    pub purged: u64,
    /// Request log entries pruned.
    pub pruned: usize,
    /// Corridors whose rate tier was seeded from persisted quotes.
    pub seeded: usize,
    /// Queries preloaded afterwards.
    pub preloaded: usize,
}

/// Cache warm-up and purge jobs.
#[derive(Debug, Clone)]
pub struct RefreshJobs {
    service: QuoteService,
    request_log: Arc<RequestLog>,
    config: RefreshConfig,
    retention: Duration,
}

impl RefreshJobs {
    /// Creates the jobs. `retention` bounds the age of persisted records.
    #[must_use]
    pub fn new(
        service: QuoteService,
        request_log: Arc<RequestLog>,
        config: RefreshConfig,
        retention: Duration,
    ) -> Self {
        Self {
            service,
            request_log,
            config,
            retention,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Re-fetches the most requested corridors at their most requested amount.
    pub async fn refresh_popular_corridors(&self) -> RefreshSummary {
        let corridors = self.request_log.top_corridors(self.config.top_n);
        let outcomes = self.refresh_queries(corridors).await;

        let summary = RefreshSummary {
            attempted: outcomes.len(),
            available: outcomes.iter().filter(|ok| **ok).count(),
            unavailable: outcomes.iter().filter(|ok| !**ok).count(),
        };
        tracing::info!(
            attempted = summary.attempted,
            available = summary.available,
            unavailable = summary.unavailable,
            "popular corridors refreshed"
        );
        summary
    }

    /// Rebuilds `corridor`'s rate tier from persisted quotes.
    ///
    /// Returns `false` without touching the cache when persistence is not
    /// configured or no recent record exists.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Infrastructure` if the repository query fails.
    pub async fn seed_rate_cache_from_store(&self, corridor: &Corridor) -> ApplicationResult<bool> {
        let Some(sink) = self.service.sink() else {
            tracing::debug!(corridor = %corridor, "no persistence configured, nothing to seed");
            return Ok(false);
        };

        let since = Timestamp::now().sub_duration(Duration::from_secs(self.config.seed_max_age_secs));
        let filter = QuoteRecordFilter::for_corridor(corridor.clone()).updated_since(since);
        let records = sink.repository().query(&filter).await?;

        let Some(snapshot) = snapshot_from_records(corridor, &records) else {
            tracing::debug!(corridor = %corridor, "no recent records to seed from");
            return Ok(false);
        };

        let cache = self.service.cache();
        cache.put_rate_snapshot(&snapshot).await;
        cache
            .put_availability(corridor, CorridorAvailability::Available)
            .await;

        tracing::info!(
            corridor = %corridor,
            providers = snapshot.providers().len(),
            records = records.len(),
            "rate cache seeded from store"
        );
        Ok(true)
    }

    /// Clears every tier, purges old records, prunes the request log, seeds the
    /// most requested corridors from the store and preloads the most requested
    /// queries.
    ///
    /// Seeded rate tiers stay in place when a live preload finds no provider.
    pub async fn daily_sweep(&self) -> SweepSummary {
        let invalidated = self.service.cache().invalidate_all().await;

        let purged = match self.service.sink() {
            Some(sink) => sink.purge_older_than(self.retention).await.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "retention purge failed");
                0
            }),
            None => 0,
        };

        let window = Duration::from_secs(self.config.request_log_window_secs);
        let pruned = self
            .request_log
            .prune_older_than(Timestamp::now().sub_duration(window));

        let seeded = self.seed_popular_corridors().await;

        let queries = self.request_log.top_queries(self.config.top_n);
        let preloaded = self.refresh_queries(queries).await.len();

        let summary = SweepSummary {
            invalidated,
            purged,
            pruned,
            seeded,
            preloaded,
        };
        tracing::info!(
            invalidated,
            purged,
            pruned,
            seeded,
            preloaded,
            "daily cache sweep complete"
        );
        summary
    }

    async fn seed_popular_corridors(&self) -> usize {
        if self.service.sink().is_none() {
            return 0;
        }
        let mut seeded = 0;
        for popular in self.request_log.top_corridors(self.config.top_n) {
            match self.seed_rate_cache_from_store(&popular.corridor).await {
                Ok(true) => seeded += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(corridor = %popular.corridor, error = %err, "rate cache seeding failed");
                }
            }
        }
        seeded
    }

    /// Refreshes each query; returns whether each corridor had a provider.
    async fn refresh_queries(&self, queries: Vec<PopularQuery>) -> Vec<bool> {
        futures::stream::iter(queries)
            .map(|query| async move {
                let request = QuoteRequest::new(query.corridor, query.amount);
                self.service.refresh_corridor(&request).await.successful_count() > 0
            })
            .buffer_unordered(REFRESH_PARALLELISM)
            .collect()
            .await
    }
}

/// Builds a snapshot from persisted records, newest first.
///
/// Each provider's newest record supplies its rate, delivery time and methods;
/// every distinct send amount contributes a fee tier, newest wins.
#[must_use]
pub fn snapshot_from_records(corridor: &Corridor, records: &[QuoteRecord]) -> Option<CorridorRateSnapshot> {
    let mut grouped: Vec<(&QuoteRecord, Vec<FeeTier>)> = Vec::new();

    for record in records.iter().filter(|r| r.key.corridor == *corridor) {
        let tier = FeeTier::new(record.send_amount, record.fee);
        match grouped
            .iter_mut()
            .find(|(newest, _)| newest.key.provider_id == record.key.provider_id)
        {
            Some((_, tiers)) => tiers.push(tier),
            None => grouped.push((record, vec![tier])),
        }
    }

    if grouped.is_empty() {
        return None;
    }

    let providers = grouped
        .into_iter()
        .map(|(newest, tiers)| {
            ProviderRate::new(
                newest.key.provider_id.clone(),
                newest.exchange_rate,
                tiers,
                newest.delivery_time_minutes,
                specified(&newest.key.payment_method),
                specified(&newest.key.delivery_method),
            )
        })
        .collect();

    Some(CorridorRateSnapshot::new(corridor.clone(), providers, Timestamp::now()))
}

fn specified(method: &str) -> Option<String> {
    (method != UNSPECIFIED_METHOD).then(|| method.to_string())
}

/// Runs the refresh jobs on timers until shutdown.
#[derive(Debug)]
pub struct RefreshScheduler {
    jobs: Arc<RefreshJobs>,
}

impl RefreshScheduler {
    /// Creates a scheduler for `jobs`.
    #[must_use]
    pub fn new(jobs: Arc<RefreshJobs>) -> Self {
        Self { jobs }
    }

    /// Spawns [`RefreshScheduler::run`] onto the runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Refreshes popular corridors every interval and sweeps once a day until
    /// `shutdown` turns true or its sender is dropped.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let first = Timestamp::now().until_next_daily(self.jobs.config().daily_sweep_time);
        self.run_with(shutdown, DailySchedule::starting_in(first)).await;
    }

    async fn run_with(self, mut shutdown: watch::Receiver<bool>, mut sweep: DailySchedule) {
        let config = self.jobs.config().clone();
        let mut interval = tokio::time::interval(config.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        tracing::info!(
            interval_secs = config.interval_secs,
            daily_sweep_time = %config.daily_sweep_time,
            "refresh scheduler started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                () = tokio::time::sleep_until(sweep.next()) => {
                    self.sweep(&mut sweep).await;
                }

                _ = interval.tick() => {
                    self.jobs.refresh_popular_corridors().await;
                    // A long refresh may run past the sweep deadline.
                    if sweep.is_due(Instant::now()) {
                        self.sweep(&mut sweep).await;
                    }
                }
            }
        }

        tracing::info!("refresh scheduler stopped");
    }

    async fn sweep(&self, schedule: &mut DailySchedule) {
        self.jobs.daily_sweep().await;
        schedule.advance(Instant::now());
        tracing::debug!(
            next_in_secs = schedule.next().saturating_duration_since(Instant::now()).as_secs(),
            "next daily sweep scheduled"
        );
    }
}

/// Absolute deadline of the next daily sweep.
///
/// The deadline only moves when a sweep has run, in whole days, so a missed
/// deadline stays due until served.
#[derive(Debug, Clone, Copy)]
struct DailySchedule {
    next: Instant,
}

impl DailySchedule {
    fn starting_in(delay: Duration) -> Self {
        Self {
            next: Instant::now() + delay,
        }
    }

    fn next(&self) -> Instant {
        self.next
    }

    fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    fn advance(&mut self, now: Instant) {
        while self.next <= now {
            self.next += DAY;
        }
    }
}
