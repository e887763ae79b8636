//! # Repository Traits
//!
//! Port definitions for durable quote storage.
//!
//! Successful quotes are kept for analytics and to seed corridor rate caches
//! without calling providers. Records are keyed by a natural key and written
//! with last-write-wins upserts, so concurrent writers never conflict.
//!
//! # Examples
//!
//! ```ignore
//! use remit_quotes::infrastructure::persistence::traits::{QuoteRecordFilter, QuoteRepository};
//!
//! async fn recent(repo: &impl QuoteRepository, corridor: Corridor) {
//!     let records = repo.query(&QuoteRecordFilter::for_corridor(corridor)).await?;
//!     println!("{} stored quotes", records.len());
//! }
//! ```

use crate::domain::entities::quote::{Quote, QuoteBuilder};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::amount::SendAmount;
use crate::domain::value_objects::corridor::Corridor;
use crate::domain::value_objects::timestamp::Timestamp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Method value stored when a quote names no payment or delivery method.
pub const UNSPECIFIED_METHOD: &str = "unspecified";

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error.
    #[error("Query error: {0}")]
    Query(String),

    /// A stored row could not be mapped back to a record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl RepositoryError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a corrupt record error.
    #[must_use]
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Returns true if this is a connection error.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Natural key of a stored quote.
///
/// The send amount takes part in the key in minor units so equal amounts
/// compare equal regardless of float noise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRecordKey {
    /// Provider identifier, lower case.
    pub provider_id: String,
    /// Corridor quoted.
    pub corridor: Corridor,
    /// Payment method, or [`UNSPECIFIED_METHOD`].
    pub payment_method: String,
    /// Delivery method, or [`UNSPECIFIED_METHOD`].
    pub delivery_method: String,
    /// Send amount in minor units.
    pub send_amount_minor: i64,
}

impl QuoteRecordKey {
    /// Returns a flat string form, usable as a map key or log field.
    #[must_use]
    pub fn storage_key(&self) -> String {
        let c = &self.corridor;
        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}",
            self.provider_id,
            c.source_country(),
            c.dest_country(),
            c.source_currency(),
            c.dest_currency(),
            self.payment_method,
            self.delivery_method,
            self.send_amount_minor
        )
    }
}

impl fmt::Display for QuoteRecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// A persisted successful quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Natural key.
    pub key: QuoteRecordKey,
    /// Send amount in source currency.
    pub send_amount: f64,
    /// Fee in source currency.
    pub fee: f64,
    /// Exchange rate.
    pub exchange_rate: f64,
    /// Amount received in destination currency.
    pub destination_amount: f64,
    /// Delivery time in minutes.
    pub delivery_time_minutes: Option<u32>,
    /// Last write time.
    pub last_updated: Timestamp,
}

impl QuoteRecord {
    /// Builds a record from a successful quote on `corridor`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingField` naming the first required numeric
    /// field the quote lacks, or `DomainError::Validation` for failed quotes.
    pub fn from_quote(corridor: &Corridor, quote: &Quote, at: Timestamp) -> DomainResult<Self> {
        if !quote.is_success() {
            return Err(DomainError::validation("failed quotes are not persisted"));
        }
        let exchange_rate = quote
            .exchange_rate()
            .ok_or(DomainError::MissingField("exchange_rate"))?;
        let fee = quote.fee().ok_or(DomainError::MissingField("fee"))?;
        let destination_amount = quote
            .destination_amount()
            .ok_or(DomainError::MissingField("destination_amount"))?;
        let send_amount = SendAmount::new(quote.send_amount())?;

        Ok(Self {
            key: QuoteRecordKey {
                provider_id: quote.provider_id().to_lowercase(),
                corridor: corridor.clone(),
                payment_method: method_or_unspecified(quote.payment_method()),
                delivery_method: method_or_unspecified(quote.delivery_method()),
                send_amount_minor: send_amount.minor_units(),
            },
            send_amount: send_amount.get(),
            fee,
            exchange_rate,
            destination_amount,
            delivery_time_minutes: quote.delivery_time_minutes(),
            last_updated: at,
        })
    }

    /// Rebuilds the quote this record was taken from.
    #[must_use]
    pub fn to_quote(&self) -> Quote {
        let corridor = &self.key.corridor;
        QuoteBuilder::new(
            self.key.provider_id.clone(),
            self.send_amount,
            corridor.source_currency().clone(),
            corridor.dest_currency().clone(),
        )
        .exchange_rate(self.exchange_rate)
        .fee(self.fee)
        .destination_amount(self.destination_amount)
        .delivery_time_minutes(self.delivery_time_minutes)
        .payment_method(specified(&self.key.payment_method))
        .delivery_method(specified(&self.key.delivery_method))
        .timestamp(self.last_updated)
        .build()
    }
}

fn method_or_unspecified(method: Option<&str>) -> String {
    method
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(UNSPECIFIED_METHOD)
        .to_string()
}

fn specified(method: &str) -> Option<String> {
    (method != UNSPECIFIED_METHOD).then(|| method.to_string())
}

/// Selection criteria for [`QuoteRepository::query`]. Unset fields match all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteRecordFilter {
    /// Only records on this corridor.
    pub corridor: Option<Corridor>,
    /// Only records of this provider (case-insensitive).
    pub provider_id: Option<String>,
    /// Only records written at or after this time.
    pub updated_since: Option<Timestamp>,
    /// Maximum number of records returned.
    pub limit: Option<usize>,
}

impl QuoteRecordFilter {
    /// Matches every record on `corridor`.
    #[must_use]
    pub fn for_corridor(corridor: Corridor) -> Self {
        Self {
            corridor: Some(corridor),
            ..Self::default()
        }
    }

    /// Restricts to records written at or after `since`.
    #[must_use]
    pub fn updated_since(mut self, since: Timestamp) -> Self {
        self.updated_since = Some(since);
        self
    }

    /// Caps the number of records returned.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `record` satisfies the filter, ignoring `limit`.
    #[must_use]
    pub fn matches(&self, record: &QuoteRecord) -> bool {
        self.corridor
            .as_ref()
            .is_none_or(|c| *c == record.key.corridor)
            && self
                .provider_id
                .as_deref()
                .is_none_or(|p| p.eq_ignore_ascii_case(&record.key.provider_id))
            && self
                .updated_since
                .is_none_or(|since| !record.last_updated.is_before(&since))
    }
}

/// Repository for persisted quotes.
#[async_trait]
pub trait QuoteRepository: Send + Sync + fmt::Debug {
    /// Inserts `record` or overwrites the record with the same key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    async fn upsert(&self, record: &QuoteRecord) -> RepositoryResult<()>;

    /// Gets a record by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the read fails.
    async fn get(&self, key: &QuoteRecordKey) -> RepositoryResult<Option<QuoteRecord>>;

    /// Returns matching records, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the read fails.
    async fn query(&self, filter: &QuoteRecordFilter) -> RepositoryResult<Vec<QuoteRecord>>;

    /// Deletes records last updated before `cutoff`. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    async fn purge_older_than(&self, cutoff: Timestamp) -> RepositoryResult<u64>;

    /// Counts stored records.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the read fails.
    async fn count(&self) -> RepositoryResult<u64>;
}
