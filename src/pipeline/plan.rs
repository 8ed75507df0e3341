//! Recognition planning helpers: span generation for un-segmented audio
//! and sample-index slicing for segment spans.

use crate::task::SpeechSpan;

/// A single span covering the whole recording.
pub fn full_span(duration: f64) -> SpeechSpan {
    SpeechSpan::new(0.0, duration)
}

/// Split a recording into fixed-length chunks. The final chunk is
/// shorter when the duration is not an exact multiple. A non-positive
/// chunk length degenerates to one full span.
pub fn chunk_spans(duration: f64, chunk_secs: f64) -> Vec<SpeechSpan> {
    if chunk_secs <= 0.0 || duration <= chunk_secs {
        return vec![full_span(duration)];
    }
    let mut spans = Vec::new();
    let mut start = 0.0;
    while start < duration {
        let end = (start + chunk_secs).min(duration);
        spans.push(SpeechSpan::new(start, end));
        start = end;
    }
    spans
}

/// Convert a span to sample indices: floor of time times rate, clamped
/// to the buffer so a span running past the decoded audio never panics.
pub fn slice_bounds(span: &SpeechSpan, sample_rate: u32, total_samples: usize) -> (usize, usize) {
    let rate = f64::from(sample_rate);
    let start = ((span.start.max(0.0) * rate) as usize).min(total_samples);
    let end = ((span.end.max(0.0) * rate) as usize).min(total_samples);
    (start, end.max(start))
}

/// Progress after finishing segment `index` out of `total`, interpolated
/// over the recognition window of the overall run.
pub fn segment_progress(index: usize, total: usize) -> f64 {
    use crate::defaults::{PROGRESS_RECOGNIZE_END, PROGRESS_RECOGNIZE_START};

    if total == 0 {
        return PROGRESS_RECOGNIZE_END;
    }
    let fraction = (index + 1) as f64 / total as f64;
    PROGRESS_RECOGNIZE_START + (PROGRESS_RECOGNIZE_END - PROGRESS_RECOGNIZE_START) * fraction
}
