//! # Application Layer
//!
//! Use cases on top of the domain: provider fan-out, the tiered cache,
//! persistence and background refresh.

pub mod error;
pub mod jobs;
pub mod services;

pub use error::{AggregationError, ApplicationError, ApplicationResult, InfrastructureError};
