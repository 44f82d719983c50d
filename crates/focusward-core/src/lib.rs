//! Enforcement core for focuswardd
//!
//! This crate is the heart of focuswardd, containing:
//! - Rule matching (which URLs belong to enforced sites)
//! - Sleep window evaluation (midnight-wrapping, half-open)
//! - Timed unlock state
//! - The enforcement engine (one action per tab per decision)
//! - The reconciliation sweep (sleep edges, unlock expiry)
//! - The tamper verifier (overlays that should be present)

mod engine;
mod events;
mod matcher;
mod passes;
mod policy;
mod reconcile;
mod tamper;
mod unlock;
mod window;

pub use engine::*;
pub use events::*;
pub use matcher::*;
pub use passes::*;
pub use policy::*;
pub use reconcile::*;
pub use tamper::*;
pub use unlock::*;
pub use window::*;
