//! Conversation messages and transcript rendering.

use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The learner on the other side of the dialogue.
    Participant,
    /// The tutoring agent.
    Agent,
}

impl Role {
    /// Speaker label used in rendered transcripts.
    pub fn label(self) -> &'static str {
        match self {
            Role::Participant => "Student",
            Role::Agent => "Agent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Participant => write!(f, "participant"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "participant" | "student" => Ok(Role::Participant),
            "agent" => Ok(Role::Agent),
            _ => anyhow::bail!("Invalid role '{}'. Valid values: participant, agent", s),
        }
    }
}

/// A single turn in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn participant(text: impl Into<String>) -> Self {
        Self::new(Role::Participant, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }
}

/// Render messages as `Speaker: text` lines.
///
/// The same renderer backs the full-history path and the verbatim window, so a
/// window is always a byte-for-byte slice of the full transcript.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for msg in messages {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(msg.role.label());
        out.push_str(": ");
        out.push_str(msg.text.trim_end_matches('\n'));
    }
    out
}

/// Length of [`render_transcript`] output without building the string.
pub fn rendered_len(messages: &[Message]) -> usize {
    let lines: usize = messages
        .iter()
        .map(|m| m.role.label().len() + 2 + m.text.trim_end_matches('\n').len())
        .sum();
    lines + messages.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_len_matches_render() {
        let messages = vec![
            Message::agent("Welcome!"),
            Message::participant("Hi\n"),
            Message::agent("Let's begin."),
        ];
        assert_eq!(rendered_len(&messages), render_transcript(&messages).len());
        assert_eq!(rendered_len(&[]), 0);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("participant".parse::<Role>().unwrap(), Role::Participant);
        assert_eq!("Student".parse::<Role>().unwrap(), Role::Participant);
        assert_eq!("AGENT".parse::<Role>().unwrap(), Role::Agent);
        assert!("system".parse::<Role>().is_err());
    }

    #[test]
    fn test_render_transcript_labels_and_order() {
        let messages = vec![
            Message::agent("What do you already know about friction?"),
            Message::participant("It slows things down\n"),
        ];
        assert_eq!(
            render_transcript(&messages),
            "Agent: What do you already know about friction?\nStudent: It slows things down"
        );
    }

    #[test]
    fn test_render_transcript_empty() {
        assert_eq!(render_transcript(&[]), "");
    }

    #[test]
    fn test_message_serde_shape() {
        let json = serde_json::to_value(Message::participant("hi")).unwrap();
        assert_eq!(json["role"], "participant");
        assert_eq!(json["text"], "hi");
    }
}
