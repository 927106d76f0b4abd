//! Context Compaction System
//!
//! Keeps the context handed to each generation request bounded while the
//! conversation log grows without limit.
//!
//! ## How it works
//!
//! - **Transition log**: every phase change is recorded with the message count
//!   at which it happened.
//! - **Segmentation**: the log is split into phase-aligned segments on every
//!   pass. Segments are derived, never stored.
//! - **Cumulative digest**: everything before the two most recent segments is
//!   represented by one cached digest. When messages age out of the verbatim
//!   window, only those messages are sent for digestion, together with the
//!   previous digest.
//! - **Bounded context**: cached digest as a labeled background section,
//!   followed by the two most recent segments verbatim.
//!
//! ## Configuration
//!
//! ```toml
//! [compaction]
//! full_history_max_messages = 6
//! summary_label = "Previous conversation summary:"
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use tutor::compaction::{CompactionEngine, SummaryState, TransitionLog};
//!
//! let engine = CompactionEngine::with_defaults(digester);
//! let compacted = engine.compact(&messages, &transitions, &cache).await?;
//! cache = compacted.summary;
//! ```

mod config;
mod engine;
mod segment;
mod summary;
mod transitions;

pub use config::CompactionConfig;
pub use engine::{CompactedContext, CompactionEngine, CompactionOutcome, pending_digest};
pub use segment::{Segment, segment};
pub use summary::{SummaryState, reset};
pub use transitions::{TransitionEvent, TransitionLog};

/// Number of most recent segments always kept verbatim.
pub const RECENT_SEGMENTS: usize = 2;

/// Logs at or below this many messages are passed through uncompacted.
pub const DEFAULT_FULL_HISTORY_MAX_MESSAGES: usize = 6;

/// Heading for the cached digest in the bounded context.
pub const DEFAULT_SUMMARY_LABEL: &str = "Previous conversation summary:";
