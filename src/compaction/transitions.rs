//! Append-only record of phase changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::InvariantViolation;
use crate::phase::Phase;

/// A single phase change, anchored to the message count at which it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub from_phase: Phase,
    pub to_phase: Phase,
    /// Exclusive upper bound of the messages that belong to `from_phase`.
    pub boundary_index: usize,
    /// When the transition was recorded.
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

/// Ordered, append-only log of [`TransitionEvent`]s.
///
/// Boundaries never decrease. There is no removal operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionLog {
    events: Vec<TransitionEvent>,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transition.
    ///
    /// A boundary lower than the previous one means the caller's state machine
    /// is inconsistent; the log is left unchanged and the violation returned.
    pub fn record_transition(
        &mut self,
        from_phase: Phase,
        to_phase: Phase,
        boundary_index: usize,
    ) -> Result<&TransitionEvent, InvariantViolation> {
        if let Some(last) = self.events.last() {
            if boundary_index < last.boundary_index {
                return Err(InvariantViolation::NonMonotonicBoundary {
                    from: from_phase,
                    to: to_phase,
                    previous: last.boundary_index,
                    attempted: boundary_index,
                });
            }
            if last.to_phase != from_phase {
                warn!(
                    expected = %last.to_phase,
                    got = %from_phase,
                    boundary_index,
                    "Transition source does not match previous destination"
                );
            }
        }

        debug!(%from_phase, %to_phase, boundary_index, "Recording phase transition");
        self.events.push(TransitionEvent {
            from_phase,
            to_phase,
            boundary_index,
            recorded_at: Utc::now(),
        });
        Ok(&self.events[self.events.len() - 1])
    }

    pub fn events(&self) -> &[TransitionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Boundary of the most recent transition, if any.
    pub fn last_boundary(&self) -> Option<usize> {
        self.events.last().map(|e| e.boundary_index)
    }

    /// Phase the log says the dialogue is currently in.
    pub fn current_phase(&self) -> Option<Phase> {
        self.events.last().map(|e| e.to_phase)
    }
}

impl<'a> IntoIterator for &'a TransitionLog {
    type Item = &'a TransitionEvent;
    type IntoIter = std::slice::Iter<'a, TransitionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
