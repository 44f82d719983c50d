//! Protocol types for focusward
//!
//! This crate defines the stable contract between focuswardd and the
//! browser-side collaborators:
//! - Enforcement actions and decision contexts
//! - Policy store keys
//! - Overlay messages (engine <-> per-tab content script)
//! - Browser events (navigation, tamper reports, challenge completion)
//! - Commands sent to the browser and their replies
//! - Guard page URL contract
//! - Versioning

mod commands;
mod events;
mod guard;
mod overlay;
mod types;

pub use commands::*;
pub use events::*;
pub use guard::*;
pub use overlay::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
