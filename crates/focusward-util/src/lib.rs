//! Shared utilities for focusward
//!
//! This crate provides:
//! - ID types (SiteKey, TabId, RequestId)
//! - Clock utilities (epoch milliseconds, seconds since local midnight, mock time)
//! - Error types
//! - Per-tab rate limiting
//! - Default paths for config and data directories

mod error;
mod ids;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
