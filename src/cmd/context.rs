//! Bounded context assembly — `tutor context`.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tutor::compaction::{CompactionEngine, pending_digest};
use tutor::digest::HttpDigester;
use tutor::errors::CompactionError;
use tutor::session::SessionStore;
use tutor::tutor_config::TutorConfig;

pub async fn cmd_context(config: &TutorConfig, session_name: &str, status_only: bool) -> Result<()> {
    let store = SessionStore::new(config.sessions_dir());
    let mut session = store.load_or_new(session_name)?;

    if status_only {
        return print_status(config, session_name, &session);
    }

    let digester = HttpDigester::new(&config.digest_settings())
        .context("Cannot create digestion backend; check [digest] in tutor.toml")?;
    let engine = CompactionEngine::new(digester, config.compaction().clone());

    let before = session.summary.clone();
    let compacted = match session.build_context(&engine).await {
        Ok(c) => c,
        Err(e) => return Err(boundary_error(e)),
    };

    if session.summary != before {
        store.save(session_name, &session)?;
    }
    info!(session = session_name, "{}", compacted.status());

    println!("{}", compacted.text);
    Ok(())
}

/// Map a compaction failure to what the user gets to see. Details go to the log.
fn boundary_error(err: CompactionError) -> anyhow::Error {
    if err.is_retryable() {
        warn!(error = %err, "Context compaction failed; session left unchanged");
        anyhow::anyhow!(err.user_message())
    } else {
        anyhow::anyhow!("{} ({})", err.user_message(), err)
    }
}

fn print_status(
    config: &TutorConfig,
    session_name: &str,
    session: &tutor::session::Session,
) -> Result<()> {
    let segments = session
        .segments()
        .context("Session transition log is inconsistent")?;
    let pending = pending_digest(
        config.compaction(),
        session.messages.len(),
        &session.transitions,
        &session.summary,
    )
    .context("Session transition log is inconsistent")?;

    println!();
    println!("Context Compaction - session '{}'", session_name);
    println!("================================");
    println!();
    println!("  Messages: {}", session.messages.len());
    println!("  Segments: {}", segments.len());
    println!("  Current phase: {}", session.phase);
    println!(
        "  Full history threshold: {} message(s)",
        config.compaction().full_history_max_messages
    );
    println!("  {}", session.summary.status());
    println!();

    match pending {
        Some((from, through)) => {
            println!(
                "Status: next `tutor context` digests messages {}..={} ({} message(s))",
                from,
                through,
                through + 1 - from
            );
        }
        None => println!("Status: cached digest is current, no digestion needed"),
    }
    println!();
    Ok(())
}
