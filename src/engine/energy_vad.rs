//! Built-in RMS-based voice-activity segmenter.
//!
//! Walks the whole recording in fixed windows, thresholds each window's
//! RMS energy, and folds the per-window decisions into speech spans with
//! minimum-length and silence-gap handling.

use crate::defaults;
use crate::engine::Segmenter;
use crate::error::{Result, ScribedError};
use crate::task::SpeechSpan;

/// Configuration for the energy segmenter.
#[derive(Debug, Clone, Copy)]
pub struct EnergyVadConfig {
    /// RMS threshold for counting a window as speech (0.0 to 1.0).
    pub speech_threshold: f32,
    /// Window length evaluated at a time, in milliseconds.
    pub window_ms: u32,
    /// Minimum speech duration before a span is emitted, in milliseconds.
    pub min_speech_ms: u32,
    /// Silence gap that closes an open span, in milliseconds.
    pub silence_gap_ms: u32,
}

impl Default for EnergyVadConfig {
    fn default() -> Self {
        Self {
            speech_threshold: defaults::VAD_THRESHOLD,
            window_ms: defaults::VAD_WINDOW_MS,
            min_speech_ms: defaults::VAD_MIN_SPEECH_MS,
            silence_gap_ms: defaults::VAD_SILENCE_GAP_MS,
        }
    }
}

/// RMS-threshold segmenter over a complete recording.
#[derive(Debug, Clone, Default)]
pub struct EnergySegmenter {
    config: EnergyVadConfig,
}

impl EnergySegmenter {
    pub fn new(config: EnergyVadConfig) -> Self {
        Self { config }
    }
}

impl Segmenter for EnergySegmenter {
    fn segment(&self, samples: &[i16], sample_rate: u32) -> Result<Vec<SpeechSpan>> {
        if sample_rate == 0 {
            return Err(ScribedError::Segmentation {
                message: "sample rate must be non-zero".to_string(),
            });
        }

        let window = (sample_rate as u64 * u64::from(self.config.window_ms) / 1000) as usize;
        let window = window.max(1);
        let window_secs = window as f64 / sample_rate as f64;
        let min_speech = f64::from(self.config.min_speech_ms) / 1000.0;
        let max_gap = f64::from(self.config.silence_gap_ms) / 1000.0;

        let mut spans = Vec::new();
        // Open span: (start, end of last speech window).
        let mut open: Option<(f64, f64)> = None;

        for (index, chunk) in samples.chunks(window).enumerate() {
            let t = index as f64 * window_secs;
            let is_speech = calculate_rms(chunk) > self.config.speech_threshold;

            match (&mut open, is_speech) {
                (None, true) => {
                    open = Some((t, t + window_secs));
                }
                (Some((_, last_speech_end)), true) => {
                    *last_speech_end = t + window_secs;
                }
                (Some((start, last_speech_end)), false) => {
                    if t + window_secs - *last_speech_end >= max_gap {
                        if *last_speech_end - *start >= min_speech {
                            spans.push(SpeechSpan::new(*start, *last_speech_end));
                        }
                        open = None;
                    }
                }
                (None, false) => {}
            }
        }

        if let Some((start, last_speech_end)) = open {
            if last_speech_end - start >= min_speech {
                spans.push(SpeechSpan::new(start, last_speech_end));
            }
        }

        Ok(spans)
    }
}

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// Returns a normalized value in `[0.0, 1.0]`: 0.0 is silence, ~0.707 a
/// full-scale sine wave.
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}
