//! # Infrastructure Layer
//!
//! Adapters for everything outside the process: providers, the shared cache
//! store and durable storage.

pub mod cache;
pub mod persistence;
pub mod providers;
