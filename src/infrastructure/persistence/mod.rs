//! # Persistence Layer
//!
//! Durable storage of successful quotes.
//!
//! ## Repository Traits (Ports)
//!
//! - [`QuoteRepository`]: Upsert, query and retention of quote records
//!
//! ## Implementations
//!
//! - `in_memory`: In-memory implementation for tests and database-less runs
//! - `postgres`: PostgreSQL implementation

pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use in_memory::InMemoryQuoteRepository;
pub use postgres::PostgresQuoteRepository;
pub use traits::{
    QuoteRecord, QuoteRecordFilter, QuoteRecordKey, QuoteRepository, RepositoryError,
    RepositoryResult, UNSPECIFIED_METHOD,
};
