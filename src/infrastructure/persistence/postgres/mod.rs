//! # PostgreSQL Repositories
//!
//! sqlx-backed implementations of the repository ports.

pub mod quote_repository;

pub use quote_repository::{PostgresQuoteRepository, QUOTE_RECORDS_DDL};
