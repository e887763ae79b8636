//! # Domain Layer
//!
//! Remittance quotes, corridors and the rules that relate them. Nothing in
//! here performs I/O.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use errors::{DomainError, DomainResult};
