//! Cached cumulative digest of the older part of the conversation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The last cumulative digest and the message index it covers.
///
/// When `summary_text` is non-empty it digests exactly
/// `messages[0..=last_index]`. `last_index` is `None` before anything has been
/// digested; the persisted form uses `-1` for that case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryState {
    #[serde(default)]
    pub summary_text: String,
    #[serde(
        default,
        rename = "summary_last_index",
        serialize_with = "serialize_index",
        deserialize_with = "deserialize_index"
    )]
    pub last_index: Option<usize>,
}

impl SummaryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A digest covering `messages[0..=last_index]`.
    pub fn covering(summary_text: impl Into<String>, last_index: usize) -> Self {
        Self {
            summary_text: summary_text.into(),
            last_index: Some(last_index),
        }
    }

    /// The covered index with `-1` meaning "nothing yet".
    pub fn summary_last_index(&self) -> i64 {
        self.last_index.map_or(-1, |i| i as i64)
    }

    pub fn is_empty(&self) -> bool {
        self.summary_text.is_empty()
    }

    /// Whether the digest already covers every message up to `index`.
    pub fn covers(&self, index: Option<usize>) -> bool {
        index <= self.last_index
    }

    /// Number of messages folded into the digest.
    pub fn messages_covered(&self) -> usize {
        self.last_index.map_or(0, |i| i + 1)
    }

    /// Get a brief status for logging and CLI output.
    pub fn status(&self) -> String {
        if self.is_empty() {
            format!(
                "No cached digest (summary_last_index = {})",
                self.summary_last_index()
            )
        } else {
            format!(
                "Digest covers {} message(s) up to index {} ({} chars)",
                self.messages_covered(),
                self.summary_last_index(),
                self.summary_text.len()
            )
        }
    }
}

/// Clear the cache so the next compaction digests from scratch.
pub fn reset(cache: &mut SummaryState) {
    cache.summary_text.clear();
    cache.last_index = None;
}

fn serialize_index<S: Serializer>(index: &Option<usize>, s: S) -> Result<S::Ok, S::Error> {
    match index {
        Some(i) => s.serialize_i64(*i as i64),
        None => s.serialize_i64(-1),
    }
}

fn deserialize_index<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    let raw = i64::deserialize(d)?;
    if raw < 0 {
        Ok(None)
    } else {
        usize::try_from(raw)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
