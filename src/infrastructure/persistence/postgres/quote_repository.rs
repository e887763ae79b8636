//! # PostgreSQL Quote Repository
//!
//! PostgreSQL implementation of [`QuoteRepository`] using sqlx.
//!
//! Upserts use `INSERT ... ON CONFLICT ... DO UPDATE` on the natural key, so
//! concurrent writers of the same key converge on the last write.

use crate::domain::value_objects::corridor::Corridor;
use crate::domain::value_objects::timestamp::Timestamp;
use crate::infrastructure::persistence::traits::{
    QuoteRecord, QuoteRecordFilter, QuoteRecordKey, QuoteRepository, RepositoryError,
    RepositoryResult,
};
use async_trait::async_trait;
use sqlx::PgPool;

/// Table definition created by [`PostgresQuoteRepository::ensure_schema`].
pub const QUOTE_RECORDS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS quote_records (
    provider_id            TEXT             NOT NULL,
    source_country         TEXT             NOT NULL,
    dest_country           TEXT             NOT NULL,
    source_currency        TEXT             NOT NULL,
    dest_currency          TEXT             NOT NULL,
    payment_method         TEXT             NOT NULL,
    delivery_method        TEXT             NOT NULL,
    send_amount_minor      BIGINT           NOT NULL,
    send_amount            DOUBLE PRECISION NOT NULL,
    fee                    DOUBLE PRECISION NOT NULL,
    exchange_rate          DOUBLE PRECISION NOT NULL,
    destination_amount     DOUBLE PRECISION NOT NULL,
    delivery_time_minutes  INTEGER,
    last_updated           BIGINT           NOT NULL,
    PRIMARY KEY (provider_id, source_country, dest_country, source_currency,
                 dest_currency, payment_method, delivery_method, send_amount_minor)
)
"#;

/// PostgreSQL implementation of [`QuoteRepository`].
///
/// # Examples
///
/// ```ignore
/// use sqlx::PgPool;
/// use remit_quotes::infrastructure::persistence::postgres::PostgresQuoteRepository;
///
/// let pool = PgPool::connect("postgres://...").await?;
/// let repo = PostgresQuoteRepository::new(pool);
/// repo.ensure_schema().await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresQuoteRepository {
    pool: PgPool,
}

impl PostgresQuoteRepository {
    /// Creates a new PostgreSQL quote repository.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Connection` if the database is unreachable.
    pub async fn connect(database_url: &str) -> RepositoryResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| RepositoryError::connection(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `quote_records` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Query` if the statement fails.
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        sqlx::query(QUOTE_RECORDS_DDL)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl QuoteRepository for PostgresQuoteRepository {
    async fn upsert(&self, record: &QuoteRecord) -> RepositoryResult<()> {
        let key = &record.key;
        let corridor = &key.corridor;
        let delivery_time = record
            .delivery_time_minutes
            .map(|m| i32::try_from(m).unwrap_or(i32::MAX));

        sqlx::query(
            r#"
            INSERT INTO quote_records (
                provider_id, source_country, dest_country, source_currency,
                dest_currency, payment_method, delivery_method, send_amount_minor,
                send_amount, fee, exchange_rate, destination_amount,
                delivery_time_minutes, last_updated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (provider_id, source_country, dest_country, source_currency,
                         dest_currency, payment_method, delivery_method, send_amount_minor)
            DO UPDATE SET
                send_amount = EXCLUDED.send_amount,
                fee = EXCLUDED.fee,
                exchange_rate = EXCLUDED.exchange_rate,
                destination_amount = EXCLUDED.destination_amount,
                delivery_time_minutes = EXCLUDED.delivery_time_minutes,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&key.provider_id)
        .bind(corridor.source_country().as_str())
        .bind(corridor.dest_country().as_str())
        .bind(corridor.source_currency().as_str())
        .bind(corridor.dest_currency().as_str())
        .bind(&key.payment_method)
        .bind(&key.delivery_method)
        .bind(key.send_amount_minor)
        .bind(record.send_amount)
        .bind(record.fee)
        .bind(record.exchange_rate)
        .bind(record.destination_amount)
        .bind(delivery_time)
        .bind(record.last_updated.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::query(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &QuoteRecordKey) -> RepositoryResult<Option<QuoteRecord>> {
        let corridor = &key.corridor;
        let row: Option<QuoteRow> = sqlx::query_as(
            r#"
            SELECT provider_id, source_country, dest_country, source_currency,
                   dest_currency, payment_method, delivery_method, send_amount_minor,
                   send_amount, fee, exchange_rate, destination_amount,
                   delivery_time_minutes, last_updated
            FROM quote_records
            WHERE provider_id = $1 AND source_country = $2 AND dest_country = $3
              AND source_currency = $4 AND dest_currency = $5
              AND payment_method = $6 AND delivery_method = $7
              AND send_amount_minor = $8
            "#,
        )
        .bind(&key.provider_id)
        .bind(corridor.source_country().as_str())
        .bind(corridor.dest_country().as_str())
        .bind(corridor.source_currency().as_str())
        .bind(corridor.dest_currency().as_str())
        .bind(&key.payment_method)
        .bind(&key.delivery_method)
        .bind(key.send_amount_minor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::query(e.to_string()))?;

        row.map(QuoteRow::try_into_record).transpose()
    }

    async fn query(&self, filter: &QuoteRecordFilter) -> RepositoryResult<Vec<QuoteRecord>> {
        let corridor = filter.corridor.as_ref();
        let limit = filter
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let rows: Vec<QuoteRow> = sqlx::query_as(
            r#"
            SELECT provider_id, source_country, dest_country, source_currency,
                   dest_currency, payment_method, delivery_method, send_amount_minor,
                   send_amount, fee, exchange_rate, destination_amount,
                   delivery_time_minutes, last_updated
            FROM quote_records
            WHERE ($1::TEXT IS NULL OR source_country = $1)
              AND ($2::TEXT IS NULL OR dest_country = $2)
              AND ($3::TEXT IS NULL OR source_currency = $3)
              AND ($4::TEXT IS NULL OR dest_currency = $4)
              AND ($5::TEXT IS NULL OR provider_id = LOWER($5))
              AND ($6::BIGINT IS NULL OR last_updated >= $6)
            ORDER BY last_updated DESC
            LIMIT $7
            "#,
        )
        .bind(corridor.map(|c| c.source_country().as_str().to_string()))
        .bind(corridor.map(|c| c.dest_country().as_str().to_string()))
        .bind(corridor.map(|c| c.source_currency().as_str().to_string()))
        .bind(corridor.map(|c| c.dest_currency().as_str().to_string()))
        .bind(filter.provider_id.clone())
        .bind(filter.updated_since.map(|t| t.timestamp_millis()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::query(e.to_string()))?;

        rows.into_iter().map(QuoteRow::try_into_record).collect()
    }

    async fn purge_older_than(&self, cutoff: Timestamp) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM quote_records WHERE last_updated < $1")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::query(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quote_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::query(e.to_string()))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Row type for quote record queries.
#[derive(Debug, sqlx::FromRow)]
struct QuoteRow {
    provider_id: String,
    source_country: String,
    dest_country: String,
    source_currency: String,
    dest_currency: String,
    payment_method: String,
    delivery_method: String,
    send_amount_minor: i64,
    send_amount: f64,
    fee: f64,
    exchange_rate: f64,
    destination_amount: f64,
    delivery_time_minutes: Option<i32>,
    last_updated: i64,
}

impl QuoteRow {
    fn try_into_record(self) -> RepositoryResult<QuoteRecord> {
        let corridor = Corridor::parse(
            &self.source_country,
            &self.dest_country,
            &self.source_currency,
            &self.dest_currency,
        )
        .map_err(|e| RepositoryError::corrupt(e.to_string()))?;

        let last_updated = Timestamp::from_millis(self.last_updated)
            .ok_or_else(|| RepositoryError::corrupt("invalid last_updated"))?;

        let delivery_time_minutes = self
            .delivery_time_minutes
            .map(u32::try_from)
            .transpose()
            .map_err(|e| RepositoryError::corrupt(e.to_string()))?;

        Ok(QuoteRecord {
            key: QuoteRecordKey {
                provider_id: self.provider_id,
                corridor,
                payment_method: self.payment_method,
                delivery_method: self.delivery_method,
                send_amount_minor: self.send_amount_minor,
            },
            send_amount: self.send_amount,
            fee: self.fee,
            exchange_rate: self.exchange_rate,
            destination_amount: self.destination_amount,
            delivery_time_minutes,
            last_updated,
        })
    }
}
