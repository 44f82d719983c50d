//! Browser host trait interfaces for focuswardd
//!
//! This crate defines the interface between the daemon core and the
//! browser that owns the tabs: tab queries, navigation, and the overlay
//! round-trip. It contains no transport code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
