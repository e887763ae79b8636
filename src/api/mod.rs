//! # API Layer
//!
//! External interfaces of the service.
//!
//! - [`rest`] - HTTP endpoints (axum)

pub mod rest;
