//! Native-messaging browser host for focuswardd
//!
//! Provides:
//! - Length-prefixed JSON framing (4-byte little-endian length) on `tokio_util` codecs
//! - Request/reply correlation with per-request timeouts
//! - Demultiplexing of unsolicited browser events
//! - A [`focusward_host_api::BrowserHost`] implementation over stdin/stdout

mod codec;
mod host;

pub use codec::*;
pub use host::*;

use thiserror::Error;

/// Native messaging errors
#[derive(Debug, Error)]
pub enum NativeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Incoming frame exceeds limit of {max} bytes")]
    IncomingTooLarge { max: usize },

    #[error("Outgoing frame of {len} bytes exceeds limit of {max}")]
    OutgoingTooLarge { len: usize, max: usize },

    #[error("Connection closed mid-frame")]
    Truncated,
}

pub type NativeResult<T> = Result<T, NativeError>;
