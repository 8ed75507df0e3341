//! Whisper-based implementation of the `Recognizer` trait.
//!
//! # Feature Gate
//!
//! Requires the `whisper` feature (and cmake to build whisper.cpp):
//!
//! ```bash
//! cargo build --features whisper
//! ```
//!
//! Without the feature, a stub type with the same constructor is exported
//! so daemon wiring code compiles either way.

use crate::defaults;
use crate::engine::{RecognizeOptions, Recognizer};
use crate::error::{Result, ScribedError};
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    install_logging_hooks, FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the whisper recognizer.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the ggml model file.
    pub model_path: PathBuf,
    /// Language code (e.g. "en", "de") or "auto" for detection.
    pub language: String,
    /// Number of threads for inference (None = auto-detect).
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper recognizer. The context is wrapped in a Mutex: concurrent runs
/// sharing one engine instance serialize at the inference call, per the
/// model-adapter contract.
#[cfg(feature = "whisper")]
pub struct WhisperRecognizer {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Stub recognizer used when the `whisper` feature is disabled.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperRecognizer {
    config: WhisperConfig,
    model_name: String,
}

fn model_name_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
impl WhisperRecognizer {
    /// Loads the model at `config.model_path`.
    ///
    /// # Errors
    /// `ScribedError::ModelNotFound` if the file does not exist,
    /// `ScribedError::Recognition` if whisper fails to load it.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(ScribedError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);

        let mut context_params = WhisperContextParameters::default();
        context_params.flash_attn(true);
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| ScribedError::Recognition {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| ScribedError::Recognition {
            message: format!("Failed to load whisper model: {e}"),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperRecognizer {
    /// Stub constructor; real inference requires the `whisper` feature.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(ScribedError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }
        let model_name = model_name_from_path(&config.model_path);
        Ok(Self { config, model_name })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

/// Convert i16 samples to the f32 range [-1.0, 1.0] whisper expects.
pub fn convert_audio(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

#[cfg(feature = "whisper")]
impl Recognizer for WhisperRecognizer {
    fn recognize(
        &self,
        samples: &[i16],
        _sample_rate: u32,
        _opts: &RecognizeOptions,
    ) -> Result<String> {
        // Whisper has no internal batching; `opts.batched` is accepted for
        // the retry contract and ignored.
        let audio_f32 = convert_audio(samples);

        let context = self.context.lock().map_err(|e| ScribedError::Recognition {
            message: format!("Failed to acquire context lock: {e}"),
        })?;

        let mut state = context.create_state().map_err(|e| ScribedError::Recognition {
            message: format!("Failed to create whisper state: {e}"),
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if self.config.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| ScribedError::Recognition {
                message: format!("Whisper inference failed: {e}"),
            })?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }

        Ok(transcription.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(not(feature = "whisper"))]
impl Recognizer for WhisperRecognizer {
    fn recognize(
        &self,
        _samples: &[i16],
        _sample_rate: u32,
        _opts: &RecognizeOptions,
    ) -> Result<String> {
        Err(ScribedError::Recognition {
            message: "whisper feature not enabled".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        false
    }
}
