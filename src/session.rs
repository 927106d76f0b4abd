//! Persistent conversation sessions.
//!
//! A session owns the three pieces of state compaction works on: the message
//! log, the transition log and the cached digest. Sessions are stored as JSON
//! under `.tutor/sessions/<name>.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::compaction::{
    CompactedContext, CompactionEngine, Segment, SummaryState, TransitionLog, reset, segment,
};
use crate::digest::Digester;
use crate::errors::{CompactionError, InvariantViolation};
use crate::message::{Message, Role};
use crate::phase::Phase;

/// One tutoring conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Phase the dialogue is currently in.
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub transitions: TransitionLog,
    #[serde(default)]
    pub summary: SummaryState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            phase: Phase::default(),
            messages: Vec::new(),
            transitions: TransitionLog::new(),
            summary: SummaryState::new(),
        }
    }

    /// Append a message to the log.
    pub fn push(&mut self, role: Role, text: impl Into<String>) -> &Message {
        self.messages.push(Message::new(role, text));
        self.touch();
        &self.messages[self.messages.len() - 1]
    }

    /// Move to `to_phase`, recording the transition at the current message
    /// count. Returns `false` when the session is already in that phase.
    pub fn advance(&mut self, to_phase: Phase) -> Result<bool, InvariantViolation> {
        if to_phase == self.phase {
            return Ok(false);
        }
        self.transitions
            .record_transition(self.phase, to_phase, self.messages.len())?;
        debug!(from = %self.phase, to = %to_phase, at = self.messages.len(), "Phase advanced");
        self.phase = to_phase;
        self.touch();
        Ok(true)
    }

    /// Current phase-aligned segments.
    pub fn segments(&self) -> Result<Vec<Segment>, InvariantViolation> {
        segment(self.messages.len(), &self.transitions)
    }

    /// Compact the log and keep the new digest.
    ///
    /// On error the stored digest is exactly what it was before the call.
    pub async fn build_context<D: Digester>(
        &mut self,
        engine: &CompactionEngine<D>,
    ) -> Result<CompactedContext, CompactionError> {
        let compacted = engine
            .compact(&self.messages, &self.transitions, &self.summary)
            .await?;
        if compacted.summary != self.summary {
            self.summary = compacted.summary.clone();
            self.touch();
        }
        Ok(compacted)
    }

    /// Forget the cached digest.
    pub fn reset_summary(&mut self) {
        reset(&mut self.summary);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Loads and saves sessions as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing session `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.exists())
    }

    /// Load session `name`.
    pub fn load(&self, name: &str) -> Result<Session> {
        let path = self.path_for(name)?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let session: Session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
        Ok(session)
    }

    /// Load session `name`, or start a new one if it does not exist yet.
    pub fn load_or_new(&self, name: &str) -> Result<Session> {
        if self.exists(name)? {
            self.load(name)
        } else {
            info!(session = name, "Starting new session");
            Ok(Session::new())
        }
    }

    /// Save session `name`, replacing the file in a single rename.
    pub fn save(&self, name: &str, session: &Session) -> Result<()> {
        let path = self.path_for(name)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let content =
            serde_json::to_string_pretty(session).context("Failed to serialize session to JSON")?;

        let tmp = self.dir.join(format!(".{}.json.tmp", name));
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write session file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace session file: {}", path.display()))?;

        debug!(session = name, messages = session.messages.len(), "Session saved");
        Ok(())
    }

    /// Names of all stored sessions, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && !stem.starts_with('.')
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        anyhow::bail!(
            "Invalid session name '{}'. Use letters, digits, '-' and '_' only",
            name
        );
    }
    Ok(())
}
