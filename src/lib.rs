//! scribed - Asynchronous speech transcription daemon
//!
//! Job orchestration in front of a multi-stage speech pipeline:
//! submit audio, poll the task, collect the transcript.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod pipeline;
pub mod service;
pub mod task;

// Engine seams (recognize / punctuate / diarize / segment / enhance)
pub use engine::{Diarizer, Enhancer, Punctuator, Recognizer, Segmenter};

// Pipeline
pub use pipeline::orchestrator::{Engines, Orchestrator, OrchestratorConfig};

// Error handling
pub use error::{Result, ScribedError};

// Config
pub use config::Config;

// Task model
pub use task::registry::TaskRegistry;
pub use task::{Stage, TaskId, TaskSnapshot, TaskStatus};
