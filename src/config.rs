//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSNATCH_CONFIG` (environment variable)
//! 2. `~/.config/mailsnatch/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailsnatch\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::export::attachment::{ExtractOptions, PartAddressing};
use crate::mime::classify::TraversalDepth;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mailbox connection settings.
    pub mailbox: MailboxConfig,
    /// Extraction defaults.
    pub extract: ExtractConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Mailbox connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// IMAP server host name.
    pub host: String,
    /// IMAP over TLS port.
    pub port: u16,
    pub username: String,
    /// Mailbox to select.
    pub mailbox: String,
    /// Environment variable holding the password. Passwords are never read
    /// from the config file.
    pub password_env: String,
}

/// Extraction defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Where attachments are written.
    pub destination_dir: Option<PathBuf>,
    /// Also save parts with an `inline` disposition (e.g. photos).
    pub include_inline: bool,
    /// Delete messages after their attachments are saved.
    pub delete_after: bool,
    /// "direct-children" or "recursive".
    pub traversal: TraversalDepth,
    /// "running-counter" or "structural".
    pub addressing: AddressingMode,
    /// First section number used by the running counter.
    pub first_part_number: u32,
}

/// How body fetches are addressed; see [`PartAddressing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressingMode {
    #[default]
    RunningCounter,
    Structural,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 993,
            username: String::new(),
            mailbox: "INBOX".to_string(),
            password_env: "MAILSNATCH_PASSWORD".to_string(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            destination_dir: None,
            include_inline: true,
            delete_after: true,
            traversal: TraversalDepth::DirectChildren,
            addressing: AddressingMode::RunningCounter,
            first_part_number: 2,
        }
    }
}

impl ExtractConfig {
    /// Turn the configured defaults into extractor options.
    ///
    /// Fails if no destination directory is configured.
    pub fn to_options(&self) -> Result<ExtractOptions> {
        let destination_dir = self
            .destination_dir
            .clone()
            .ok_or_else(|| ExtractError::Config("no destination directory set".into()))?;
        let addressing = match self.addressing {
            AddressingMode::RunningCounter => PartAddressing::RunningCounter {
                first: self.first_part_number,
            },
            AddressingMode::Structural => PartAddressing::Structural,
        };
        let options = ExtractOptions {
            destination_dir,
            include_inline: self.include_inline,
            delete_after: self.delete_after,
            traversal: self.traversal,
            addressing,
        };
        options.validate()?;
        Ok(options)
    }
}

impl MailboxConfig {
    /// Read the password from the configured environment variable.
    pub fn password(&self) -> Result<String> {
        std::env::var(&self.password_env).map_err(|_| {
            ExtractError::Config(format!(
                "password not found in environment variable {}",
                self.password_env
            ))
        })
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSNATCH_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailsnatch").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsnatch")
}
