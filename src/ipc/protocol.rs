//! JSON message protocol between clients and the transcription daemon.
//!
//! Every request is one JSON object on one line; every response is the
//! same. The shapes here are the complete boundary contract, so any
//! transport that can carry line-delimited JSON can front the service.

use serde::{Deserialize, Serialize};

use crate::task::{Stage, TaskId, TaskSnapshot, TaskStatus};

/// Commands sent by clients to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Submit audio for a full pipeline run
    Submit { media_type: String, audio: Vec<u8> },
    /// Run a single stage against an existing task's audio
    RunStage { task_id: TaskId, stage: Stage },
    /// Get the current snapshot of a task
    Status { task_id: TaskId },
    /// Check daemon liveness and engine readiness
    Health,
    /// Shutdown the daemon
    Shutdown,
}

impl Command {
    /// Serialize command to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize command from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Responses sent by the daemon to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Command succeeded with nothing to report
    Ok,
    /// Task accepted, pipeline scheduled
    Submitted { task_id: TaskId, status: TaskStatus },
    /// Single stage scheduled on an existing task
    StageScheduled {
        task_id: TaskId,
        stage: Stage,
        status: TaskStatus,
    },
    /// Point-in-time task snapshot
    Task {
        task_id: TaskId,
        #[serde(flatten)]
        snapshot: TaskSnapshot,
    },
    /// Daemon liveness report
    Health {
        model_loaded: bool,
        model_name: Option<String>,
        tasks: usize,
    },
    /// The referenced task does not exist
    NotFound { task_id: TaskId },
    /// Error occurred
    Error { message: String },
}

impl Response {
    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
