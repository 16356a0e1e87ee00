//! Configuration types for Lorekeeper

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LorekeeperError, Result};
use crate::llm::RetryConfig;
use crate::prompt::Persona;

/// Main configuration for the dialogue engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LorekeeperConfig {
    /// Generation backend configuration
    pub backend: BackendConfig,

    /// Context retrieval configuration
    pub retrieval: RetrievalConfig,

    /// Conversation history configuration
    pub history: HistoryConfig,

    /// NPC persona configuration
    pub persona: PersonaConfig,

    /// Push-to-talk configuration
    pub voice: VoiceConfig,

    /// Event channel configuration
    pub events: EventConfig,
}

/// Generation backend (Ollama-compatible `/api/generate`) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the generation server
    pub base_url: String,

    /// Model name sent with every request
    pub model: String,

    /// Upper bound for a single generation request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Retry policy for network failures
    pub retry: RetryConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3:8b".to_string(),
            timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
        }
    }
}

/// Context retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Minimum similarity (exclusive) for a lore line to become context
    pub threshold: f32,

    /// Lore file, one snippet per line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus_path: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            corpus_path: None,
        }
    }
}

/// Conversation history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of entries kept for the prompt (None = unbounded)
    pub max_entries: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: Some(10),
        }
    }
}

/// Persona configuration: inline text or files to read it from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// System instruction
    pub system_message: String,

    /// Role / character sheet for the NPC
    pub assistant_role: String,

    /// File overriding `system_message`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message_path: Option<PathBuf>,

    /// File overriding `assistant_role`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_role_path: Option<PathBuf>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            system_message: Persona::DEFAULT_SYSTEM_MESSAGE.to_string(),
            assistant_role: String::new(),
            system_message_path: None,
            assistant_role_path: None,
        }
    }
}

impl PersonaConfig {
    /// Resolve into a [`Persona`], reading any configured files.
    pub fn resolve(&self) -> Result<Persona> {
        let system_message = match &self.system_message_path {
            Some(path) => read_text(path)?,
            None => self.system_message.clone(),
        };
        let assistant_role = match &self.assistant_role_path {
            Some(path) => read_text(path)?,
            None => self.assistant_role.clone(),
        };
        Ok(Persona::new(system_message, assistant_role))
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        LorekeeperError::Configuration(format!("Failed to read {}: {}", path.display(), e))
    })
}

/// Push-to-talk configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Sample rate the transcriber expects
    pub sample_rate: u32,

    /// Longest clip accepted for transcription
    #[serde(with = "humantime_serde")]
    pub max_recording: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            max_recording: Duration::from_secs(30),
        }
    }
}

/// Event system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Event buffer size
    pub buffer_size: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}

impl LorekeeperConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `lorekeeper.toml` in the working directory
    /// 3. File named by `LORE_CONFIG_PATH`
    /// 4. `LORE_`-prefixed environment variables (`__` separates nesting,
    ///    e.g. `LORE_BACKEND__MODEL`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(LorekeeperConfig::default()))
            .merge(Toml::file("lorekeeper.toml"));

        if let Ok(path) = std::env::var("LORE_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: LorekeeperConfig = figment
            .merge(Env::prefixed("LORE_").ignore(&["CONFIG_PATH"]).split("__"))
            .extract()
            .map_err(|e| {
                LorekeeperError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// `LORE_`-prefixed environment variables still override the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let path = path.as_ref();
        if !path.exists() {
            return Err(LorekeeperError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config: LorekeeperConfig =
            Figment::from(Serialized::defaults(LorekeeperConfig::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed("LORE_").ignore(&["CONFIG_PATH"]).split("__"))
                .extract()
                .map_err(|e| {
                    LorekeeperError::Configuration(format!(
                        "Failed to load configuration file: {}",
                        e
                    ))
                })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.retrieval.threshold) {
            return Err(LorekeeperError::Configuration(format!(
                "retrieval.threshold must be within [0, 1], got {}",
                self.retrieval.threshold
            )));
        }
        if self.backend.model.trim().is_empty() {
            return Err(LorekeeperError::Configuration(
                "backend.model must not be empty".to_string(),
            ));
        }
        if self.backend.timeout.is_zero() {
            return Err(LorekeeperError::Configuration(
                "backend.timeout must be greater than zero".to_string(),
            ));
        }
        if self.history.max_entries == Some(0) {
            return Err(LorekeeperError::Configuration(
                "history.max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
