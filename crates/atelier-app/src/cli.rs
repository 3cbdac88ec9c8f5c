//! CLI argument definitions for the Atelier assistant.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use atelier_core::{AtelierConfig, Category, Result};

/// Atelier - an attire consultation assistant for your terminal.
#[derive(Parser, Debug)]
#[command(name = "atelier", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Event category to open with (wedding, party, corporate, casual).
    #[arg(short = 'k', long = "category")]
    pub category: Option<String>,

    /// Use the offline scripted responder instead of the configured backend.
    #[arg(long = "offline")]
    pub offline: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Print every conversation update as a JSON line.
    #[arg(long = "json")]
    pub json: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ATELIER_CONFIG env var > ~/.atelier/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ATELIER_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the opening category.
    ///
    /// Priority: --category flag > config file value.
    pub fn resolve_category(&self, config: &AtelierConfig) -> Result<Category> {
        match self.category {
            Some(ref name) => name.parse(),
            None => Ok(config.assistant.default_category),
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config: &AtelierConfig) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config.general.log_level.clone())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".atelier").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".atelier").join("config.toml");
    }
    PathBuf::from("config.toml")
}
