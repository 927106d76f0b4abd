//! Session log commands — `tutor say`, `advance`, `segments`, `reset`, `sessions`.

use anyhow::{Context, Result};
use tutor::message::Role;
use tutor::phase::Phase;
use tutor::session::SessionStore;
use tutor::tutor_config::TutorConfig;

fn store(config: &TutorConfig) -> SessionStore {
    SessionStore::new(config.sessions_dir())
}

pub fn cmd_say(config: &TutorConfig, session_name: &str, role: &str, text: &str) -> Result<()> {
    let role: Role = role.parse()?;
    let store = store(config);
    let mut session = store.load_or_new(session_name)?;

    session.push(role, text);
    store.save(session_name, &session)?;

    println!(
        "[{}] #{} {}",
        session.phase,
        session.messages.len() - 1,
        role.label()
    );
    Ok(())
}

pub fn cmd_advance(config: &TutorConfig, session_name: &str, phase: &str) -> Result<()> {
    let to_phase: Phase = phase.parse()?;
    let store = store(config);
    let mut session = store.load_or_new(session_name)?;
    let from_phase = session.phase;

    let changed = session
        .advance(to_phase)
        .context("Cannot record phase transition")?;

    if changed {
        store.save(session_name, &session)?;
        println!(
            "{} -> {} at message {}",
            from_phase,
            to_phase,
            session.messages.len()
        );
    } else {
        println!("Already in phase {}", to_phase);
    }
    Ok(())
}

pub fn cmd_segments(config: &TutorConfig, session_name: &str) -> Result<()> {
    let session = store(config).load_or_new(session_name)?;
    let segments = session
        .segments()
        .context("Session transition log is inconsistent")?;

    println!();
    println!(
        "Session '{}': {} message(s), {} segment(s)",
        session_name,
        session.messages.len(),
        segments.len()
    );
    println!();
    for (i, seg) in segments.iter().enumerate() {
        let title = console::style(format!("{:<12}", seg.phase.code())).bold();
        if seg.is_empty() {
            println!("  {:>2}. {} (empty)", i + 1, title);
        } else {
            println!(
                "  {:>2}. {} messages {}..{} ({})",
                i + 1,
                title,
                seg.start_index,
                seg.end_index,
                seg.len()
            );
        }
    }
    println!();
    Ok(())
}

pub fn cmd_reset(config: &TutorConfig, session_name: &str) -> Result<()> {
    let store = store(config);
    if !store.exists(session_name)? {
        println!("No session '{}' to reset.", session_name);
        return Ok(());
    }

    let mut session = store.load(session_name)?;
    let had_summary = !session.summary.is_empty();
    session.reset_summary();
    store.save(session_name, &session)?;

    if had_summary {
        println!("Cleared cached digest for session '{}'.", session_name);
    } else {
        println!("Session '{}' had no cached digest.", session_name);
    }
    Ok(())
}

pub fn cmd_sessions(config: &TutorConfig) -> Result<()> {
    let store = store(config);
    let names = store.list()?;
    if names.is_empty() {
        println!("No sessions found in {}", store.dir().display());
        return Ok(());
    }

    for name in names {
        match store.load(&name) {
            Ok(session) => println!(
                "  {:<20} {:>5} message(s)  phase {:<12} {}",
                name,
                session.messages.len(),
                session.phase.code(),
                session.summary.status()
            ),
            Err(e) => println!(
                "  {:<20} {}",
                name,
                console::style(format!("unreadable: {e}")).red()
            ),
        }
    }
    Ok(())
}
