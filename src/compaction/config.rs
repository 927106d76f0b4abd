//! Compaction engine settings.

use serde::{Deserialize, Serialize};

use super::{DEFAULT_FULL_HISTORY_MAX_MESSAGES, DEFAULT_SUMMARY_LABEL};

/// Tunables for the compaction engine, read from the `[compaction]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Logs with at most this many messages are passed through verbatim.
    #[serde(default = "default_full_history_max_messages")]
    pub full_history_max_messages: usize,
    /// Heading placed before the cached digest in the bounded context.
    #[serde(default = "default_summary_label")]
    pub summary_label: String,
}

fn default_full_history_max_messages() -> usize {
    DEFAULT_FULL_HISTORY_MAX_MESSAGES
}

fn default_summary_label() -> String {
    DEFAULT_SUMMARY_LABEL.to_string()
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            full_history_max_messages: default_full_history_max_messages(),
            summary_label: default_summary_label(),
        }
    }
}

impl CompactionConfig {
    /// Validate the settings and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.summary_label.trim().is_empty() {
            warnings.push(
                "compaction.summary_label is empty; the digest will not be labeled".to_string(),
            );
        }
        if self.full_history_max_messages > 200 {
            warnings.push(format!(
                "compaction.full_history_max_messages = {} delays compaction for a long time",
                self.full_history_max_messages
            ));
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = CompactionConfig::default();
        assert_eq!(config.full_history_max_messages, 6);
        assert_eq!(config.summary_label, "Previous conversation summary:");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_table() {
        let config: CompactionConfig = toml::from_str("full_history_max_messages = 10").unwrap();
        assert_eq!(config.full_history_max_messages, 10);
        assert_eq!(config.summary_label, DEFAULT_SUMMARY_LABEL);
    }

    #[test]
    fn test_validate_warnings() {
        let config = CompactionConfig {
            full_history_max_messages: 500,
            summary_label: "  ".to_string(),
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("summary_label"));
        assert!(warnings[1].contains("500"));
    }
}
