//! Default configuration constants for scribed.
//!
//! Shared constants used across configuration types and the pipeline
//! to ensure consistency and eliminate duplication.

/// Working audio sample rate in Hz.
///
/// All submitted audio is decoded and resampled to 16kHz mono before any
/// stage runs. 16kHz is the standard input rate for speech recognition.
pub const SAMPLE_RATE: u32 = 16000;

/// Audio duration above which an unsegmented recording is split into
/// fixed-length chunks, in seconds.
///
/// Only applies when neither VAD nor diarization produced segment
/// boundaries. Bounds peak memory per inference call on long inputs.
pub const CHUNK_THRESHOLD_SECS: f64 = 60.0;

/// Fixed chunk length for long unsegmented audio, in seconds.
///
/// Chunks cover the recording back to back with no overlap; the last
/// chunk may be shorter.
pub const CHUNK_SECS: f64 = 60.0;

/// Progress reported once the submitted bytes have been decoded.
pub const PROGRESS_DECODED: f64 = 0.10;

/// Progress at the start of per-segment recognition.
pub const PROGRESS_RECOGNIZE_START: f64 = 0.20;

/// Progress when the last segment has been recognized.
///
/// The remaining headroom up to 1.0 covers punctuation and combining.
pub const PROGRESS_RECOGNIZE_END: f64 = 0.90;

/// Default RMS threshold for the built-in energy segmenter (0.0 to 1.0).
pub const VAD_THRESHOLD: f32 = 0.02;

/// Window length the energy segmenter evaluates at a time, in milliseconds.
pub const VAD_WINDOW_MS: u32 = 30;

/// Minimum duration of speech before a span is emitted, in milliseconds.
pub const VAD_MIN_SPEECH_MS: u32 = 300;

/// Silence gap that closes an open speech span, in milliseconds.
pub const VAD_SILENCE_GAP_MS: u32 = 500;

/// Default language code for recognition.
///
/// "auto" lets the recognizer detect the spoken language. Set a specific
/// code (e.g. "en", "de") to force a language.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";
