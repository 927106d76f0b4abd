//! Unified configuration for the tutor.
//!
//! Settings are read from `.tutor/tutor.toml` (falling back to the user-level
//! `~/.config/tutor/tutor.toml`), then overridden by environment variables and
//! finally by CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [compaction]
//! full_history_max_messages = 6
//! summary_label = "Previous conversation summary:"
//!
//! [digest]
//! endpoint = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 60
//! temperature = 0.2
//!
//! [logging]
//! json = false
//! file = false
//! ```
//!
//! # Environment overrides
//!
//! | Variable                | Overrides            |
//! |-------------------------|----------------------|
//! | `TUTOR_DIGEST_ENDPOINT` | `digest.endpoint`    |
//! | `TUTOR_DIGEST_MODEL`    | `digest.model`       |
//! | `TUTOR_DIGEST_API_KEY`  | key from `api_key_env` |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::compaction::CompactionConfig;

/// File name of the configuration inside the tutor directory.
pub const CONFIG_FILE: &str = "tutor.toml";

pub const ENV_DIGEST_ENDPOINT: &str = "TUTOR_DIGEST_ENDPOINT";
pub const ENV_DIGEST_MODEL: &str = "TUTOR_DIGEST_MODEL";
pub const ENV_DIGEST_API_KEY: &str = "TUTOR_DIGEST_API_KEY";

/// Digestion backend settings as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestSection {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model used for digestion
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for DigestSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl DigestSection {
    /// Resolve the section against an environment lookup.
    pub fn resolve_with<F>(&self, env: F) -> DigestSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        DigestSettings {
            endpoint: non_empty(ENV_DIGEST_ENDPOINT).unwrap_or_else(|| self.endpoint.clone()),
            model: non_empty(ENV_DIGEST_MODEL).unwrap_or_else(|| self.model.clone()),
            api_key: non_empty(ENV_DIGEST_API_KEY).or_else(|| non_empty(&self.api_key_env)),
            timeout_secs: self.timeout_secs,
            temperature: self.temperature,
        }
    }
}

/// Fully resolved digestion backend settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

/// Logging output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
    /// Also write a daily log file under `.tutor/logs/`
    #[serde(default)]
    pub file: bool,
}

/// The complete tutor.toml configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorToml {
    #[serde(default)]
    pub compaction: CompactionConfig,
    #[serde(default)]
    pub digest: DigestSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TutorToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse tutor.toml")
    }

    /// Load from the tutor directory, then the user config directory.
    /// Returns default configuration if neither exists.
    pub fn load_or_default(tutor_dir: &Path) -> Result<Self> {
        let config_path = tutor_dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Self::load(&config_path);
        }
        match user_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize tutor.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.compaction.validate();

        if self.digest.endpoint.trim().is_empty() {
            warnings.push("digest.endpoint is empty".to_string());
        } else if !self.digest.endpoint.starts_with("http://")
            && !self.digest.endpoint.starts_with("https://")
        {
            warnings.push(format!(
                "digest.endpoint '{}' should start with http:// or https://",
                self.digest.endpoint
            ));
        }
        if self.digest.model.trim().is_empty() {
            warnings.push("digest.model is empty".to_string());
        }
        if self.digest.timeout_secs == 0 {
            warnings.push("digest.timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.digest.temperature) {
            warnings.push(format!(
                "digest.temperature {} is outside [0, 2]",
                self.digest.temperature
            ));
        }

        warnings
    }
}

/// User-level configuration file, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tutor").join(CONFIG_FILE))
}

/// Configuration that combines TutorToml with runtime settings.
///
/// Merges, in order of precedence:
/// 1. CLI arguments
/// 2. Environment variables (including `.env`)
/// 3. tutor.toml
#[derive(Debug, Clone)]
pub struct TutorConfig {
    /// Path to the project directory
    pub project_dir: PathBuf,
    /// Path to the .tutor directory
    pub tutor_dir: PathBuf,
    /// Parsed tutor.toml configuration
    pub toml: TutorToml,
    /// CLI override: verbose logging
    pub verbose: bool,
}

impl TutorConfig {
    /// Create a new TutorConfig from a project directory.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let tutor_dir = crate::init::get_tutor_dir(&project_dir);
        let toml = TutorToml::load_or_default(&tutor_dir)?;

        Ok(Self {
            project_dir,
            tutor_dir,
            toml,
            verbose: false,
        })
    }

    /// Create TutorConfig with CLI overrides.
    pub fn with_cli_args(project_dir: PathBuf, verbose: bool) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        Ok(config)
    }

    /// Digest settings with environment overrides applied.
    pub fn digest_settings(&self) -> DigestSettings {
        self.toml.digest.resolve_with(|key| std::env::var(key).ok())
    }

    pub fn compaction(&self) -> &CompactionConfig {
        &self.toml.compaction
    }

    /// Get path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.tutor_dir.join(CONFIG_FILE)
    }

    /// Get path to the sessions directory.
    pub fn sessions_dir(&self) -> PathBuf {
        self.tutor_dir.join("sessions")
    }

    /// Get path to the log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.tutor_dir.join("logs")
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
