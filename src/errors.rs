//! Typed error hierarchy for context compaction.
//!
//! Two failure classes exist:
//! - `InvariantViolation`: the upstream dialogue state machine handed us an
//!   inconsistent log. Fatal; never corrected silently.
//! - `DigestError`: the digestion backend failed. The cache is untouched and
//!   the whole call can be retried.
//!
//! `CompactionError` wraps both for the engine's public API.

use thiserror::Error;

use crate::phase::Phase;

/// Message shown to end users when digestion fails.
pub const RETRY_MESSAGE: &str = "The tutor is temporarily unavailable, please retry.";

/// The transition log or a computed index broke a structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error(
        "Transition {from} -> {to} at boundary {attempted} precedes previous boundary {previous}"
    )]
    NonMonotonicBoundary {
        from: Phase,
        to: Phase,
        previous: usize,
        attempted: usize,
    },

    #[error("Transition boundary {boundary} exceeds message count {message_count}")]
    BoundaryBeyondLog {
        boundary: usize,
        message_count: usize,
    },

    #[error("Last summarized index {index} outside [-1, {message_count})")]
    IndexOutOfRange { index: usize, message_count: usize },
}

/// Failures of the external digestion capability.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Digest request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Digest request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Digest endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Digest endpoint returned no usable text")]
    EmptyDigest,

    #[error("Malformed digest response: {0}")]
    Malformed(String),

    #[error("Digest backend not configured: {0}")]
    NotConfigured(String),
}

/// Errors from a compaction pass.
#[derive(Debug, Error)]
pub enum CompactionError {
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Digestion failed: {0}")]
    Digestion(#[from] DigestError),
}

impl CompactionError {
    /// Whether retrying the same call with unchanged inputs can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompactionError::Digestion(_))
    }

    /// Text safe to show at the application boundary.
    pub fn user_message(&self) -> &'static str {
        match self {
            CompactionError::Digestion(_) => RETRY_MESSAGE,
            CompactionError::Invariant(_) => {
                "The session log is inconsistent and cannot be continued."
            }
        }
    }
}
