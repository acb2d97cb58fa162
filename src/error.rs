//! Error types for the board
//!
//! [`ProtocolError`] is raised while turning a socket frame into a typed event.
//! [`MutationError`] is raised by the store. Neither ever reaches a client;
//! both end up as a log line.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::storage::document::{KEY_SLOTS, MARKERS_PER_KEY};

/// Store rejected or failed to persist a mutation
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("key index {0} out of range (0..{})", KEY_SLOTS)]
    KeyIndexOutOfRange(usize),

    #[error("marker index {0} out of range (0..{})", MARKERS_PER_KEY)]
    MarkerIndexOutOfRange(usize),

    #[error("wifi index {index} out of range ({len} entries)")]
    WifiIndexOutOfRange { index: usize, len: usize },

    /// Applied in memory but not written to disk
    #[error("failed to persist {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MutationError {
    /// Validation rejections leave the document untouched; persist failures do not.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Persist { .. })
    }
}

/// Inbound frame could not be turned into a [`ClientEvent`](crate::sync::ClientEvent)
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("invalid payload for `{event}`: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown site color `{0}`")]
    UnknownColor(String),

    #[error("`{event}` requires a non-empty `{field}`")]
    EmptyField {
        event: &'static str,
        field: &'static str,
    },
}
