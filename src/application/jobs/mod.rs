//! # Background Jobs
//!
//! Request tracking and proactive cache maintenance.

pub mod refresh;
pub mod request_log;

pub use refresh::{RefreshConfig, RefreshJobs, RefreshScheduler, RefreshSummary, SweepSummary};
pub use request_log::{PopularQuery, RequestLog};
