//! Segment combination.
//!
//! Per-segment transcripts already carry their own spacing and
//! punctuation, so the flat transcript is a plain concatenation in
//! segment order with leading and trailing whitespace removed. Speaker
//! labels stay on the structured segments and never leak into the flat
//! text.

use crate::task::TranscriptSegment;

/// Combine segment transcripts into a single flat transcript.
pub fn combine_segments(segments: &[TranscriptSegment]) -> String {
    let mut combined = String::new();
    for segment in segments {
        combined.push_str(&segment.text);
    }
    combined.trim().to_string()
}
