//! Configuration types for the translation session.

use crate::error::Result;
use crate::language::{Language, LanguagePair};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Session settings (language pair, voice, capture thresholds).
    pub session: SessionConfig,
    /// Audio capture/playback settings.
    pub audio: AudioConfig,
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Language the local side speaks.
    pub source_language: Language,
    /// Language the remote side speaks.
    pub target_language: Language,
    /// Synthesis voice identity for all outbound audio.
    pub voice_id: String,
    /// Captures shorter than this are treated as empty (button fumbles).
    pub min_utterance_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source_language: Language::English,
            target_language: Language::Spanish,
            voice_id: "default".into(),
            min_utterance_ms: 300,
        }
    }
}

/// Audio I/O configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate in Hz (native device audio is downsampled to this).
    pub input_sample_rate: u32,
    /// Playback sample rate in Hz.
    pub output_sample_rate: u32,
    /// Input device name (None = system default).
    pub input_device: Option<String>,
    /// Output device name (None = system default).
    pub output_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 16_000,
            output_sample_rate: 24_000,
            input_device: None,
            output_device: None,
        }
    }
}

impl TranslateConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::TranslateError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TranslateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/duolog/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("duolog").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("duolog")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/duolog-config/config.toml")
        }
    }

    /// The configured language pair.
    ///
    /// # Errors
    ///
    /// Returns an error if source and target are the same language.
    pub fn language_pair(&self) -> Result<LanguagePair> {
        LanguagePair::new(self.session.source_language, self.session.target_language)
    }
}
