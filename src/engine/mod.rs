//! Model-adapter boundary: one trait per pipeline stage.
//!
//! Each engine wraps an inference implementation behind a uniform call.
//! All traits are synchronous (inference is blocking work; the service
//! layer runs pipeline executions on blocking workers) and `Send + Sync`
//! so a loaded engine can be shared across concurrent runs. Engines are
//! expected to handle any internal serialization concurrent calls need.

pub mod energy_vad;
pub mod whisper;

use crate::error::{Result, ScribedError};
use crate::task::SpeechSpan;
use std::sync::Arc;

/// Options for one recognition call.
#[derive(Debug, Clone, Copy)]
pub struct RecognizeOptions {
    /// Allow the engine's internal batching. The single documented retry
    /// after a recognition failure disables this before giving up.
    pub batched: bool,
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self { batched: true }
    }
}

/// Speech recognition over a slice of working audio.
///
/// This trait allows swapping implementations (real model vs mock).
pub trait Recognizer: Send + Sync {
    /// Transcribe mono audio samples to text.
    fn recognize(&self, samples: &[i16], sample_rate: u32, opts: &RecognizeOptions)
        -> Result<String>;

    /// Name of the loaded model.
    fn model_name(&self) -> &str;

    /// Whether the recognizer is ready to serve calls.
    fn is_ready(&self) -> bool;
}

/// Implement Recognizer for Arc<T> to allow sharing across runs.
impl<T: Recognizer> Recognizer for Arc<T> {
    fn recognize(
        &self,
        samples: &[i16],
        sample_rate: u32,
        opts: &RecognizeOptions,
    ) -> Result<String> {
        (**self).recognize(samples, sample_rate, opts)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Punctuation restoration over recognized text.
pub trait Punctuator: Send + Sync {
    fn punctuate(&self, text: &str) -> Result<String>;
}

/// Speaker diarization: spans attributed to distinct speakers.
pub trait Diarizer: Send + Sync {
    fn diarize(&self, samples: &[i16], sample_rate: u32) -> Result<Vec<SpeechSpan>>;
}

/// Voice-activity segmentation: speech spans with no speaker attribution.
pub trait Segmenter: Send + Sync {
    fn segment(&self, samples: &[i16], sample_rate: u32) -> Result<Vec<SpeechSpan>>;
}

/// Noise/quality enhancement of the working audio.
///
/// Returning `Ok(None)` means the engine produced no replacement audio;
/// the caller keeps the original.
pub trait Enhancer: Send + Sync {
    fn enhance(&self, samples: &[i16], sample_rate: u32) -> Result<Option<Vec<i16>>>;
}

/// Mock recognizer for testing.
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    model_name: String,
    response: String,
    should_fail: bool,
    fail_only_batched: bool,
}

impl MockRecognizer {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            fail_only_batched: false,
        }
    }

    /// Configure the mock to return a specific response.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on every call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the mock to fail batched calls but succeed once the
    /// caller retries with batching disabled.
    pub fn with_batched_failure(mut self) -> Self {
        self.fail_only_batched = true;
        self
    }
}

impl Recognizer for MockRecognizer {
    fn recognize(
        &self,
        _samples: &[i16],
        _sample_rate: u32,
        opts: &RecognizeOptions,
    ) -> Result<String> {
        if self.should_fail || (self.fail_only_batched && opts.batched) {
            Err(ScribedError::Recognition {
                message: "mock recognition failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}

/// Mock punctuator for testing. Appends a configured suffix.
#[derive(Debug, Clone)]
pub struct MockPunctuator {
    suffix: String,
    should_fail: bool,
}

impl MockPunctuator {
    pub fn new() -> Self {
        Self {
            suffix: ".".to_string(),
            should_fail: false,
        }
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Default for MockPunctuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Punctuator for MockPunctuator {
    fn punctuate(&self, text: &str) -> Result<String> {
        if self.should_fail {
            Err(ScribedError::Punctuation {
                message: "mock punctuation failure".to_string(),
            })
        } else {
            Ok(format!("{text}{}", self.suffix))
        }
    }
}

/// Mock diarizer for testing. Returns a configured span list.
#[derive(Debug, Clone, Default)]
pub struct MockDiarizer {
    spans: Vec<SpeechSpan>,
    should_fail: bool,
}

impl MockDiarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spans(mut self, spans: Vec<SpeechSpan>) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Diarizer for MockDiarizer {
    fn diarize(&self, _samples: &[i16], _sample_rate: u32) -> Result<Vec<SpeechSpan>> {
        if self.should_fail {
            Err(ScribedError::Diarization {
                message: "mock diarization failure".to_string(),
            })
        } else {
            Ok(self.spans.clone())
        }
    }
}

/// Mock segmenter for testing. Returns a configured span list.
#[derive(Debug, Clone, Default)]
pub struct MockSegmenter {
    spans: Vec<SpeechSpan>,
    should_fail: bool,
}

impl MockSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spans(mut self, spans: Vec<SpeechSpan>) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Segmenter for MockSegmenter {
    fn segment(&self, _samples: &[i16], _sample_rate: u32) -> Result<Vec<SpeechSpan>> {
        if self.should_fail {
            Err(ScribedError::Segmentation {
                message: "mock segmentation failure".to_string(),
            })
        } else {
            Ok(self.spans.clone())
        }
    }
}

/// Mock enhancer for testing. Replaces audio with a constant buffer.
#[derive(Debug, Clone, Default)]
pub struct MockEnhancer {
    output: Option<Vec<i16>>,
    should_fail: bool,
}

impl MockEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, output: Vec<i16>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Enhancer for MockEnhancer {
    fn enhance(&self, _samples: &[i16], _sample_rate: u32) -> Result<Option<Vec<i16>>> {
        if self.should_fail {
            Err(ScribedError::Enhancement {
                message: "mock enhancement failure".to_string(),
            })
        } else {
            Ok(self.output.clone())
        }
    }
}
