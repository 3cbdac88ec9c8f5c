use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AtelierError, Result};
use crate::types::Category;

/// Top-level configuration for the Atelier assistant.
///
/// Loaded from `~/.atelier/config.toml` by default. Every section falls back
/// to its defaults when missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtelierConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl AtelierConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AtelierConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AtelierError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Conversational assistant settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Category the assistant opens with.
    pub default_category: Category,
    /// Optional TOML file overriding the built-in category catalog.
    pub catalog_path: Option<String>,
    /// Number of prior messages serialized into each prompt. Unset keeps the
    /// whole conversation.
    pub history_window: Option<usize>,
}

/// Which completion backend the process constructs at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendProvider {
    /// Google Generative Language API.
    #[default]
    Gemini,
    /// Offline keyword responder.
    Scripted,
}

/// Generative-language backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: BackendProvider,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Base URL of the Generative Language API.
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Per-call timeout in seconds. `0` disables the timeout.
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Artificial reply delay of the scripted backend, in milliseconds.
    pub scripted_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: BackendProvider::Gemini,
            model: "gemini-1.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 30,
            max_output_tokens: 256,
            temperature: 0.7,
            scripted_delay_ms: 1500,
        }
    }
}
