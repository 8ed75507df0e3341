use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::defaults;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub vad: VadConfig,
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Unix socket path; falls back to the XDG runtime default.
    pub socket: Option<PathBuf>,
}

/// Audio handling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Duration above which un-segmented audio gets chunked.
    pub chunk_threshold_secs: f64,
    pub chunk_secs: f64,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model_path: PathBuf,
    pub language: String,
    pub threads: Option<usize>,
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    pub enabled: bool,
    pub threshold: f32,
    pub min_speech_ms: u32,
    pub silence_gap_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_secs: defaults::CHUNK_THRESHOLD_SECS,
            chunk_secs: defaults::CHUNK_SECS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: defaults::VAD_THRESHOLD,
            min_speech_ms: defaults::VAD_MIN_SPEECH_MS,
            silence_gap_ms: defaults::VAD_SILENCE_GAP_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e.context(format!("Failed to load config from {}", path.display())))
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SCRIBED_MODEL → stt.model_path
    /// - SCRIBED_LANGUAGE → stt.language
    /// - SCRIBED_SOCKET → service.socket
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model_path) = std::env::var("SCRIBED_MODEL") {
            if !model_path.is_empty() {
                self.stt.model_path = PathBuf::from(model_path);
            }
        }

        if let Ok(language) = std::env::var("SCRIBED_LANGUAGE") {
            if !language.is_empty() {
                self.stt.language = language;
            }
        }

        if let Ok(socket) = std::env::var("SCRIBED_SOCKET") {
            if !socket.is_empty() {
                self.service.socket = Some(PathBuf::from(socket));
            }
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/scribed/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(dir.join("scribed").join("config.toml"))
    }
}
