//! Task data model: identifiers, statuses, stage records, and the typed
//! working payload carried between pipeline stages.

pub mod registry;

use crate::error::{Result, ScribedError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque task identifier.
///
/// Backed by a v4 UUID, collision-resistant for the registry's lifetime.
/// Once created an ID is never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a task ID from its string form.
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ScribedError::TaskNotFound {
                task_id: s.to_string(),
            })
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Declared media type of a submitted audio blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Wav,
    Mpeg,
}

impl MediaType {
    /// Validates a declared content type against the allow-list.
    ///
    /// Anything outside the list is a client error; no task is created
    /// for a rejected submission.
    pub fn parse(content_type: &str) -> Result<Self> {
        match content_type {
            "audio/wav" | "audio/x-wav" => Ok(Self::Wav),
            "audio/mpeg" | "audio/mp3" => Ok(Self::Mpeg),
            other => Err(ScribedError::UnsupportedMediaType {
                media_type: other.to_string(),
            }),
        }
    }
}

/// Top-level lifecycle state of a task.
///
/// Transitions are one-directional within a run: `Pending` → `Running` →
/// `Done`/`Error`. A later single-stage run against the same ID re-enters
/// `Running`; this is accepted behavior supporting the incremental
/// workflow, not a lifecycle violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Error,
}

/// Named pipeline stage with its own independent outcome.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Enhanced,
    Diarization,
    Transformer,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enhanced => "enhanced",
            Self::Diarization => "diarization",
            Self::Transformer => "transformer",
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = ScribedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enhanced" => Ok(Self::Enhanced),
            "diarization" => Ok(Self::Diarization),
            "transformer" => Ok(Self::Transformer),
            other => Err(ScribedError::Other(format!("Unknown stage: {other}"))),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome state of a single stage entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Running,
    Done,
    Error,
}

/// Typed result of a completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutcome {
    /// Enhancement replaced the working audio.
    Enhanced { samples: usize, duration: f64 },
    /// Segmentation or diarization produced time-bounded spans.
    Segments { spans: Vec<SpeechSpan> },
    /// Standalone recognition produced a transcript.
    Transcript { text: String },
}

/// One stage's record in a task's stage map.
///
/// Entries are additive: writing one stage never clears another stage's
/// previously recorded entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StageOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageEntry {
    pub fn running() -> Self {
        Self {
            status: StageStatus::Running,
            result: None,
            error: None,
        }
    }

    pub fn done(result: StageOutcome) -> Self {
        Self {
            status: StageStatus::Done,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Error,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// A time-bounded span of speech, `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechSpan {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<u32>,
}

impl SpeechSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            speaker: None,
        }
    }

    pub fn with_speaker(mut self, speaker: u32) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One recognized segment of the final transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<u32>,
}

/// Final combined result of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub duration: f64,
}

/// Decoded working audio: mono samples at a known rate.
///
/// Sample buffers are immutable once stored; enhancement swaps in a new
/// buffer rather than mutating in place.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Arc<[i16]>,
    pub sample_rate: u32,
    pub duration: f64,
}

impl DecodedAudio {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        let duration = samples.len() as f64 / sample_rate as f64;
        Self {
            samples: samples.into(),
            sample_rate,
            duration,
        }
    }
}

/// Working data carried between stages of the same task.
///
/// The submitted bytes are always present; `decoded` is filled in the
/// first time a run needs samples. Each stage's precondition is visible
/// in the type rather than probed at runtime.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub raw: Arc<[u8]>,
    pub media_type: MediaType,
    pub decoded: Option<DecodedAudio>,
}

impl AudioPayload {
    pub fn new(raw: Vec<u8>, media_type: MediaType) -> Self {
        Self {
            raw: raw.into(),
            media_type,
            decoded: None,
        }
    }
}

/// Consistent point-in-time copy of a task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    pub stages: BTreeMap<Stage, StageEntry>,
}

/// Sparse field update applied atomically by the registry.
///
/// Unset fields leave the stored record untouched, making the
/// "unspecified = unchanged" contract explicit in the type. Stage writes
/// merge into the stage map instead of replacing it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub(crate) status: Option<TaskStatus>,
    pub(crate) progress: Option<f64>,
    pub(crate) message: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) result: Option<TaskResult>,
    pub(crate) stage: Option<(Stage, StageEntry)>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn result(mut self, result: TaskResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn stage(mut self, stage: Stage, entry: StageEntry) -> Self {
        self.stage = Some((stage, entry));
        self
    }
}
