//! # remit-quotes
//!
//! Remittance quote aggregation: fans a transfer request out to every
//! registered provider, ranks the answers and serves repeats from a tiered
//! corridor cache.
//!
//! # Layers
//!
//! - [`domain`]: Quotes, corridors and rate snapshots
//! - [`application`]: Aggregation, caching, persistence and background jobs
//! - [`infrastructure`]: Provider adapters, cache stores and repositories
//! - [`api`]: HTTP endpoints
//!
//! # Cache tiers
//!
//! | Tier | Key | Holds |
//! |------|-----|-------|
//! | Exact | `v1:fee:{src}:{dst}:{scur}:{dcur}:{amount}` | Full response for one amount |
//! | Availability | `corridor:{src}:{dst}` | Whether any provider serves the pair |
//! | Rate | `corridor_rate:{src}:{dst}:{scur}:{dcur}` | Rates and fee tiers, any amount |
//!
//! # Example
//!
//! ```ignore
//! use remit_quotes::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! let app = remit_quotes::server::build(&config).await?;
//! axum::serve(listener, app.router()).await?;
//! ```

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod server;
pub mod telemetry;
