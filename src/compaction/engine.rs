//! Compaction engine: turns the growing log into a bounded context.

use tracing::{debug, info, instrument, warn};

use super::config::CompactionConfig;
use super::segment::{Segment, segment};
use super::summary::SummaryState;
use super::transitions::TransitionLog;
use super::RECENT_SEGMENTS;
use crate::digest::{DigestRequest, Digester, usable_digest};
use crate::errors::{CompactionError, InvariantViolation};
use crate::message::{Message, render_transcript, rendered_len};

/// What a compaction pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// Log too short or not yet split into two phases; full transcript returned.
    FullHistory,
    /// The cached digest already covered every older segment.
    ReusedDigest,
    /// The digest was extended with `messages[from..=through]`.
    Digested { from: usize, through: usize },
}

/// Result of [`CompactionEngine::compact`].
#[derive(Debug, Clone)]
pub struct CompactedContext {
    /// Bounded context for the next generation request.
    pub text: String,
    /// Cache value the caller should store in place of the one passed in.
    pub summary: SummaryState,
    pub outcome: CompactionOutcome,
    /// Number of segments the log was split into.
    pub segment_count: usize,
    /// Size of the full verbatim transcript, for reporting.
    pub original_chars: usize,
}

impl CompactedContext {
    /// Whether the digestion capability was called.
    pub fn digested(&self) -> bool {
        matches!(self.outcome, CompactionOutcome::Digested { .. })
    }

    /// Get the compression ratio achieved.
    pub fn compression_ratio(&self) -> f32 {
        if self.original_chars == 0 {
            return 0.0;
        }
        1.0 - (self.text.len() as f32 / self.original_chars as f32)
    }

    /// Get a brief status for logging.
    pub fn status(&self) -> String {
        let what = match &self.outcome {
            CompactionOutcome::FullHistory => "Full history".to_string(),
            CompactionOutcome::ReusedDigest => "Reused cached digest".to_string(),
            CompactionOutcome::Digested { from, through } => {
                format!("Digested messages {}..={}", from, through)
            }
        };
        format!(
            "{} across {} segment(s): {} -> {} chars ({:.1}% reduction)",
            what,
            self.segment_count,
            self.original_chars,
            self.text.len(),
            self.compression_ratio() * 100.0
        )
    }
}

/// Maintains the cumulative digest and assembles bounded contexts.
///
/// The engine never mutates the cache it is given. A successful pass returns
/// the new cache value; a failed or abandoned pass leaves the caller's copy
/// exactly as it was.
pub struct CompactionEngine<D: Digester> {
    digester: D,
    config: CompactionConfig,
}

impl<D: Digester> CompactionEngine<D> {
    pub fn new(digester: D, config: CompactionConfig) -> Self {
        Self { digester, config }
    }

    /// Create an engine with default settings.
    pub fn with_defaults(digester: D) -> Self {
        Self::new(digester, CompactionConfig::default())
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub fn digester(&self) -> &D {
        &self.digester
    }

    /// Build the bounded context for the current turn.
    ///
    /// Older segments (all but the last two) are represented by the cached
    /// digest, extended in one digestion call when new messages have aged out
    /// of the verbatim window. The last two segments are rendered verbatim.
    #[instrument(skip_all, fields(messages = messages.len(), transitions = transitions.len()))]
    pub async fn compact(
        &self,
        messages: &[Message],
        transitions: &TransitionLog,
        cache: &SummaryState,
    ) -> Result<CompactedContext, CompactionError> {
        let message_count = messages.len();
        let segments = segment(message_count, transitions)?;
        let original_chars = rendered_len(messages);

        if message_count <= self.config.full_history_max_messages
            || segments.len() < RECENT_SEGMENTS
        {
            debug!(
                segments = segments.len(),
                "Below compaction threshold, using full history"
            );
            return Ok(CompactedContext {
                text: render_transcript(messages),
                summary: cache.clone(),
                outcome: CompactionOutcome::FullHistory,
                segment_count: segments.len(),
                original_chars,
            });
        }

        let (older, recent) = segments.split_at(segments.len() - RECENT_SEGMENTS);
        let last_older_index = last_older_index(older, message_count)?;

        let (summary, outcome) = match last_older_index {
            Some(through) if !cache.covers(Some(through)) => {
                let from = cache.messages_covered();
                let summary = self.extend_digest(messages, cache, from, through).await?;
                (summary, CompactionOutcome::Digested { from, through })
            }
            _ => {
                debug!(
                    summary_last_index = cache.summary_last_index(),
                    "Cached digest covers all older segments"
                );
                (cache.clone(), CompactionOutcome::ReusedDigest)
            }
        };

        let text = self.render_bounded(messages, recent, &summary);

        Ok(CompactedContext {
            text,
            summary,
            outcome,
            segment_count: segments.len(),
            original_chars,
        })
    }

    /// Run [`compact`](Self::compact) and store the new cache only on success.
    pub async fn compact_into(
        &self,
        messages: &[Message],
        transitions: &TransitionLog,
        cache: &mut SummaryState,
    ) -> Result<String, CompactionError> {
        let compacted = self.compact(messages, transitions, cache).await?;
        *cache = compacted.summary;
        Ok(compacted.text)
    }

    async fn extend_digest(
        &self,
        messages: &[Message],
        cache: &SummaryState,
        from: usize,
        through: usize,
    ) -> Result<SummaryState, CompactionError> {
        let delta = render_transcript(&messages[from..=through]);
        let request = if cache.is_empty() {
            DigestRequest::fresh(&delta)
        } else {
            DigestRequest::extend(&cache.summary_text, &delta)
        };

        info!(
            from,
            through,
            delta_messages = through + 1 - from,
            extending = !cache.is_empty(),
            "Digesting aged-out messages"
        );

        let digest = self
            .digester
            .digest(&request)
            .await
            .and_then(|raw| usable_digest(&raw))
            .map_err(|e| {
                warn!(error = %e, from, through, "Digestion failed, cache left unchanged");
                e
            })?;

        Ok(SummaryState::covering(digest, through))
    }

    fn render_bounded(
        &self,
        messages: &[Message],
        recent: &[Segment],
        summary: &SummaryState,
    ) -> String {
        let start = recent.first().map_or(messages.len(), |s| s.start_index);
        let end = recent.last().map_or(messages.len(), |s| s.end_index);
        let verbatim = render_transcript(&messages[start..end]);

        if summary.is_empty() {
            return verbatim;
        }

        let mut out = String::with_capacity(
            self.config.summary_label.len() + summary.summary_text.len() + verbatim.len() + 3,
        );
        out.push_str(&self.config.summary_label);
        out.push(' ');
        out.push_str(&summary.summary_text);
        if !verbatim.is_empty() {
            out.push_str("\n\n");
            out.push_str(&verbatim);
        }
        out
    }
}

/// Messages the next [`CompactionEngine::compact`] call would send for
/// digestion, as an inclusive `(from, through)` pair. `None` when the cached
/// digest already suffices or the log is still below the threshold.
pub fn pending_digest(
    config: &CompactionConfig,
    message_count: usize,
    transitions: &TransitionLog,
    cache: &SummaryState,
) -> Result<Option<(usize, usize)>, InvariantViolation> {
    let segments = segment(message_count, transitions)?;
    if message_count <= config.full_history_max_messages || segments.len() < RECENT_SEGMENTS {
        return Ok(None);
    }
    let older = &segments[..segments.len() - RECENT_SEGMENTS];
    Ok(match last_older_index(older, message_count)? {
        Some(through) if !cache.covers(Some(through)) => {
            Some((cache.messages_covered(), through))
        }
        _ => None,
    })
}

/// Index of the last message in the older segments, from boundaries alone.
fn last_older_index(
    older: &[Segment],
    message_count: usize,
) -> Result<Option<usize>, InvariantViolation> {
    let index = older.last().and_then(|s| s.end_index.checked_sub(1));
    match index {
        Some(i) if i >= message_count => Err(InvariantViolation::IndexOutOfRange {
            index: i,
            message_count,
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compaction::reset;
    use crate::digest::stub::{CountingDigester, FailingDigester};
    use crate::errors::DigestError;
    use crate::phase::Phase;

    fn alternating(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::agent(format!("Agent turn {i}"))
                } else {
                    Message::participant(format!("Student turn {i}"))
                }
            })
            .collect()
    }

    fn five_phase_log() -> TransitionLog {
        let mut log = TransitionLog::new();
        log.record_transition(Phase::Apk, Phase::Ci, 4).unwrap();
        log.record_transition(Phase::Ci, Phase::Ge, 8).unwrap();
        log.record_transition(Phase::Ge, Phase::Ar, 12).unwrap();
        log.record_transition(Phase::Ar, Phase::Tc, 16).unwrap();
        log
    }

    #[tokio::test]
    async fn test_concrete_five_phase_scenario() {
        let messages = alternating(20);
        let log = five_phase_log();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let result = engine
            .compact(&messages, &log, &SummaryState::new())
            .await
            .unwrap();

        assert_eq!(result.segment_count, 5);
        assert_eq!(engine.digester().calls(), 1);
        assert_eq!(result.summary.summary_last_index(), 11);
        assert_eq!(result.summary.summary_text, "digest #1");
        assert_eq!(
            result.outcome,
            CompactionOutcome::Digested {
                from: 0,
                through: 11
            }
        );

        let requests = engine.digester().requests();
        assert_eq!(requests[0], DigestRequest::fresh(&render_transcript(&messages[0..12])));

        let expected = format!(
            "Previous conversation summary: digest #1\n\n{}",
            render_transcript(&messages[12..20])
        );
        assert_eq!(result.text, expected);
    }

    #[tokio::test]
    async fn test_short_log_returns_full_history_untouched() {
        let messages = alternating(6);
        let mut log = TransitionLog::new();
        log.record_transition(Phase::Apk, Phase::Ci, 2).unwrap();
        log.record_transition(Phase::Ci, Phase::Ge, 4).unwrap();
        let cache = SummaryState::covering("stale", 0);
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let result = engine.compact(&messages, &log, &cache).await.unwrap();

        assert_eq!(result.outcome, CompactionOutcome::FullHistory);
        assert_eq!(result.text, render_transcript(&messages));
        assert_eq!(result.summary, cache);
        assert_eq!(engine.digester().calls(), 0);
    }

    #[tokio::test]
    async fn test_single_segment_returns_full_history() {
        let messages = alternating(30);
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let result = engine
            .compact(&messages, &TransitionLog::new(), &SummaryState::new())
            .await
            .unwrap();

        assert_eq!(result.segment_count, 1);
        assert_eq!(result.outcome, CompactionOutcome::FullHistory);
        assert_eq!(result.text, render_transcript(&messages));
        assert_eq!(engine.digester().calls(), 0);
    }

    #[tokio::test]
    async fn test_two_segments_have_nothing_to_digest() {
        let messages = alternating(10);
        let mut log = TransitionLog::new();
        log.record_transition(Phase::Apk, Phase::Ci, 5).unwrap();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let result = engine
            .compact(&messages, &log, &SummaryState::new())
            .await
            .unwrap();

        assert_eq!(result.outcome, CompactionOutcome::ReusedDigest);
        assert_eq!(result.text, render_transcript(&messages));
        assert!(result.summary.is_empty());
        assert_eq!(engine.digester().calls(), 0);
    }

    #[tokio::test]
    async fn test_idempotent_with_threaded_cache() {
        let messages = alternating(20);
        let log = five_phase_log();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let first = engine
            .compact(&messages, &log, &SummaryState::new())
            .await
            .unwrap();
        let second = engine
            .compact(&messages, &log, &first.summary)
            .await
            .unwrap();

        assert_eq!(first.text, second.text);
        assert_eq!(first.summary, second.summary);
        assert_eq!(second.outcome, CompactionOutcome::ReusedDigest);
        assert_eq!(engine.digester().calls(), 1);
    }

    #[tokio::test]
    async fn test_no_redundant_digestion_within_phase() {
        let mut messages = alternating(20);
        let log = five_phase_log();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());
        let mut cache = SummaryState::new();

        engine.compact_into(&messages, &log, &mut cache).await.unwrap();
        assert_eq!(engine.digester().calls(), 1);

        // More turns in the current phase never age anything out.
        for i in 20..30 {
            messages.push(Message::participant(format!("More TC talk {i}")));
            engine.compact_into(&messages, &log, &mut cache).await.unwrap();
        }

        assert_eq!(engine.digester().calls(), 1);
        assert_eq!(cache.summary_last_index(), 11);
    }

    #[tokio::test]
    async fn test_extension_digests_only_the_delta() {
        let mut messages = alternating(20);
        let mut log = five_phase_log();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());
        let mut cache = SummaryState::new();

        engine.compact_into(&messages, &log, &mut cache).await.unwrap();

        messages.extend(alternating(4));
        log.record_transition(Phase::Tc, Phase::Rlc, 20).unwrap();
        let text = engine.compact_into(&messages, &log, &mut cache).await.unwrap();

        assert_eq!(engine.digester().calls(), 2);
        assert_eq!(cache.summary_last_index(), 15);
        assert_eq!(cache.summary_text, "digest #2");

        let requests = engine.digester().requests();
        assert_eq!(
            requests[1],
            DigestRequest::extend("digest #1", &render_transcript(&messages[12..16]))
        );
        assert!(text.starts_with("Previous conversation summary: digest #2\n\n"));
        assert!(text.ends_with(&render_transcript(&messages[16..24])));
    }

    #[tokio::test]
    async fn test_duplicate_content_uses_boundaries_not_equality() {
        // Every message is identical; a content search would find index 0.
        let messages: Vec<Message> = (0..12).map(|_| Message::participant("ok")).collect();
        let mut log = TransitionLog::new();
        log.record_transition(Phase::Apk, Phase::Ci, 4).unwrap();
        log.record_transition(Phase::Ci, Phase::Ge, 8).unwrap();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let result = engine
            .compact(&messages, &log, &SummaryState::new())
            .await
            .unwrap();

        assert_eq!(result.summary.summary_last_index(), 3);
        assert_eq!(
            engine.digester().requests()[0].text,
            render_transcript(&messages[0..4])
        );
    }

    #[tokio::test]
    async fn test_digestion_failure_leaves_cache_unchanged() {
        let messages = alternating(24);
        let mut log = five_phase_log();
        log.record_transition(Phase::Tc, Phase::Rlc, 20).unwrap();
        let engine = CompactionEngine::with_defaults(FailingDigester::default());

        let mut cache = SummaryState::covering("digest of APK..GE", 11);
        let before = cache.clone();

        let err = engine
            .compact_into(&messages, &log, &mut cache)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(matches!(err, CompactionError::Digestion(_)));
        assert_eq!(cache, before);
        assert_eq!(engine.digester().calls(), 1);
    }

    struct BlankDigester;

    #[async_trait::async_trait]
    impl Digester for BlankDigester {
        async fn digest(&self, _request: &DigestRequest) -> Result<String, DigestError> {
            Ok("  \n".to_string())
        }
    }

    #[tokio::test]
    async fn test_blank_digest_is_rejected_and_cache_kept() {
        let messages = alternating(20);
        let log = five_phase_log();
        let engine = CompactionEngine::with_defaults(BlankDigester);

        let mut cache = SummaryState::new();
        let err = engine
            .compact_into(&messages, &log, &mut cache)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CompactionError::Digestion(DigestError::EmptyDigest)
        ));
        assert_eq!(cache, SummaryState::new());
        assert_eq!(cache.summary_last_index(), -1);
    }

    #[tokio::test]
    async fn test_monotonic_cache_growth_over_session() {
        let engine = CompactionEngine::with_defaults(CountingDigester::new());
        let phases = [
            Phase::Start,
            Phase::Apk,
            Phase::Ci,
            Phase::Ge,
            Phase::Mh,
            Phase::Ar,
            Phase::Tc,
            Phase::Rlc,
            Phase::End,
        ];
        let mut messages = Vec::new();
        let mut log = TransitionLog::new();
        let mut cache = SummaryState::new();
        let mut last_seen = cache.summary_last_index();

        for (i, phase) in phases.iter().enumerate() {
            if i > 0 {
                log.record_transition(phases[i - 1], *phase, messages.len())
                    .unwrap();
            }
            for turn in 0..5 {
                messages.push(Message::agent(format!("{phase} prompt {turn}")));
                messages.push(Message::participant(format!("{phase} reply {turn}")));
                engine.compact_into(&messages, &log, &mut cache).await.unwrap();
                assert!(cache.summary_last_index() >= last_seen);
                last_seen = cache.summary_last_index();
            }
        }

        // At most one digestion per transition.
        assert!(engine.digester().calls() <= log.len());
        assert_eq!(cache.summary_last_index(), 69);
    }

    #[tokio::test]
    async fn test_bounded_window_with_1000_messages() {
        let phases = [
            Phase::Start,
            Phase::Apk,
            Phase::Ci,
            Phase::SimConcept,
            Phase::SimVars,
            Phase::Ge,
            Phase::Mh,
            Phase::Ar,
            Phase::Tc,
            Phase::Rlc,
        ];
        let messages = alternating(1000);
        let mut log = TransitionLog::new();
        for i in 1..phases.len() {
            log.record_transition(phases[i - 1], phases[i], i * 100)
                .unwrap();
        }
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let result = engine
            .compact(&messages, &log, &SummaryState::new())
            .await
            .unwrap();

        let verbatim = render_transcript(&messages[800..1000]);
        assert!(result.text.contains(&verbatim));
        assert!(!result.text.contains("Agent turn 798"));
        assert_eq!(result.summary.summary_last_index(), 799);
        assert_eq!(engine.digester().calls(), 1);
        assert!(result.text.len() < result.original_chars);
    }

    #[tokio::test]
    async fn test_reset_forces_digest_from_scratch() {
        let messages = alternating(20);
        let log = five_phase_log();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());
        let mut cache = SummaryState::new();

        engine.compact_into(&messages, &log, &mut cache).await.unwrap();
        reset(&mut cache);
        assert_eq!(cache.summary_text, "");
        assert_eq!(cache.summary_last_index(), -1);

        engine.compact_into(&messages, &log, &mut cache).await.unwrap();

        assert_eq!(engine.digester().calls(), 2);
        let requests = engine.digester().requests();
        assert_eq!(requests[1], DigestRequest::fresh(&render_transcript(&messages[0..12])));
        assert_eq!(cache.summary_last_index(), 11);
    }

    #[tokio::test]
    async fn test_invariant_violation_surfaces() {
        let messages = alternating(10);
        let mut log = TransitionLog::new();
        log.record_transition(Phase::Apk, Phase::Ci, 12).unwrap();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let err = engine
            .compact(&messages, &log, &SummaryState::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CompactionError::Invariant(InvariantViolation::BoundaryBeyondLog { .. })
        ));
        assert!(!err.is_retryable());
        assert_eq!(engine.digester().calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_current_segment_keeps_previous_verbatim() {
        let messages = alternating(12);
        let mut log = TransitionLog::new();
        log.record_transition(Phase::Apk, Phase::Ci, 6).unwrap();
        log.record_transition(Phase::Ci, Phase::Ge, 12).unwrap();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let result = engine
            .compact(&messages, &log, &SummaryState::new())
            .await
            .unwrap();

        assert_eq!(result.summary.summary_last_index(), 5);
        assert_eq!(
            result.text,
            format!(
                "Previous conversation summary: digest #1\n\n{}",
                render_transcript(&messages[6..12])
            )
        );
    }

    #[tokio::test]
    async fn test_custom_label_and_threshold() {
        let config = CompactionConfig {
            full_history_max_messages: 20,
            summary_label: "Background:".to_string(),
        };
        let engine = CompactionEngine::new(CountingDigester::new(), config);
        let log = five_phase_log();

        let short = engine
            .compact(&alternating(20), &log, &SummaryState::new())
            .await
            .unwrap();
        assert_eq!(short.outcome, CompactionOutcome::FullHistory);

        let long = engine
            .compact(&alternating(21), &log, &SummaryState::new())
            .await
            .unwrap();
        assert!(long.text.starts_with("Background: digest #1\n\n"));
    }

    #[test]
    fn test_last_older_index_from_boundaries() {
        let older = [
            Segment {
                phase: Phase::Apk,
                start_index: 0,
                end_index: 4,
            },
            Segment {
                phase: Phase::Ci,
                start_index: 4,
                end_index: 9,
            },
        ];
        assert_eq!(last_older_index(&older, 20).unwrap(), Some(8));
        assert_eq!(last_older_index(&[], 20).unwrap(), None);
        assert!(last_older_index(&older, 5).is_err());
    }

    #[test]
    fn test_status_mentions_outcome() {
        let ctx = CompactedContext {
            text: "x".repeat(10),
            summary: SummaryState::covering("d", 11),
            outcome: CompactionOutcome::Digested {
                from: 0,
                through: 11,
            },
            segment_count: 5,
            original_chars: 100,
        };
        let status = ctx.status();
        assert!(status.contains("0..=11"));
        assert!(status.contains("100 -> 10"));
        assert!(status.contains("90.0%"));
        assert!(ctx.digested());
    }

    #[tokio::test]
    async fn test_pending_digest_predicts_compact() {
        let messages = alternating(20);
        let log = five_phase_log();
        let config = CompactionConfig::default();
        let engine = CompactionEngine::with_defaults(CountingDigester::new());

        let fresh = SummaryState::new();
        assert_eq!(
            pending_digest(&config, messages.len(), &log, &fresh).unwrap(),
            Some((0, 11))
        );

        let result = engine.compact(&messages, &log, &fresh).await.unwrap();
        assert_eq!(result.outcome, CompactionOutcome::Digested { from: 0, through: 11 });
        assert_eq!(
            pending_digest(&config, messages.len(), &log, &result.summary).unwrap(),
            None
        );
        assert_eq!(pending_digest(&config, 4, &TransitionLog::new(), &fresh).unwrap(), None);
    }
}
