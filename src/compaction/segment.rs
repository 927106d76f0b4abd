//! Phase-aligned partitioning of the message log.

use std::ops::Range;

use super::transitions::TransitionLog;
use crate::errors::InvariantViolation;
use crate::phase::Phase;

/// A contiguous run of messages belonging to one phase.
///
/// Derived on every compaction pass; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub phase: Phase,
    pub start_index: usize,
    /// Exclusive.
    pub end_index: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }

    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    /// Index of the last message in the segment, if it has any.
    pub fn last_index(&self) -> Option<usize> {
        self.end_index.checked_sub(1).filter(|_| !self.is_empty())
    }
}

/// Partition `[0, message_count)` into segments using the transition log.
///
/// Each event closes the open segment at its boundary and opens one for its
/// destination phase. The trailing segment is always emitted, even when empty,
/// so the last element names the current phase. An empty log yields a single
/// `Unknown` segment covering everything.
pub fn segment(
    message_count: usize,
    transitions: &TransitionLog,
) -> Result<Vec<Segment>, InvariantViolation> {
    if transitions.is_empty() {
        return Ok(vec![Segment {
            phase: Phase::Unknown,
            start_index: 0,
            end_index: message_count,
        }]);
    }

    let mut segments = Vec::with_capacity(transitions.len() + 1);
    let mut start = 0usize;

    for event in transitions {
        let end = event.boundary_index;
        if end > message_count {
            return Err(InvariantViolation::BoundaryBeyondLog {
                boundary: end,
                message_count,
            });
        }
        if end < start {
            return Err(InvariantViolation::NonMonotonicBoundary {
                from: event.from_phase,
                to: event.to_phase,
                previous: start,
                attempted: end,
            });
        }
        segments.push(Segment {
            phase: event.from_phase,
            start_index: start,
            end_index: end,
        });
        start = end;
    }

    let current = transitions.current_phase().unwrap_or_default();
    segments.push(Segment {
        phase: current,
        start_index: start,
        end_index: message_count,
    });

    Ok(segments)
}
