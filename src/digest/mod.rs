//! Digestion capability: the external summarizer the compaction engine calls.
//!
//! The engine only knows the [`Digester`] trait. [`HttpDigester`] talks to an
//! OpenAI-compatible chat completions endpoint; tests plug in counting or
//! failing stand-ins.

mod http;

pub use http::HttpDigester;

use async_trait::async_trait;

use crate::errors::DigestError;

/// Instruction sent with every digestion request.
pub const DIGEST_INSTRUCTION: &str = "Summarize the following educational conversation in 2-3 sentences, focusing on:\n\
- What concept was being taught\n\
- The student's demonstrated understanding\n\
- Notable interaction patterns";

/// Separator between a previous digest and the newly added turns.
pub const EXTEND_DELIMITER: &str = "\n\nNew messages:\n";

/// A block of text to digest plus the instruction that frames it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRequest {
    pub instruction: String,
    pub text: String,
}

impl DigestRequest {
    /// Digest a transcript delta with no prior summary.
    pub fn fresh(delta: &str) -> Self {
        Self {
            instruction: DIGEST_INSTRUCTION.to_string(),
            text: delta.to_string(),
        }
    }

    /// Fold a transcript delta into an existing digest.
    pub fn extend(previous: &str, delta: &str) -> Self {
        Self {
            instruction: DIGEST_INSTRUCTION.to_string(),
            text: format!("Previous summary: {previous}{EXTEND_DELIMITER}{delta}"),
        }
    }

    /// Single prompt string for backends that take one user message.
    pub fn prompt(&self) -> String {
        format!(
            "{}\n\nConversation:\n{}\n\nSummary:",
            self.instruction, self.text
        )
    }
}

/// Something that turns a block of conversation into a short digest.
///
/// Implementations must return the digest as plain text. Empty or unusable
/// output is reported as [`DigestError::EmptyDigest`] rather than passed on.
#[async_trait]
pub trait Digester: Send + Sync {
    async fn digest(&self, request: &DigestRequest) -> Result<String, DigestError>;
}

#[async_trait]
impl<D: Digester + ?Sized> Digester for std::sync::Arc<D> {
    async fn digest(&self, request: &DigestRequest) -> Result<String, DigestError> {
        (**self).digest(request).await
    }
}

/// Trim backend output and reject whitespace-only text.
pub(crate) fn usable_digest(raw: &str) -> Result<String, DigestError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(DigestError::EmptyDigest)
    } else {
        Ok(trimmed.to_string())
    }
}
