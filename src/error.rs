//! Error types for scribed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribedError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Submission errors
    #[error("Unsupported media type: {media_type}")]
    UnsupportedMediaType { media_type: String },

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    // Audio decode errors
    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    // Engine errors, one variant per pipeline stage
    #[error("Recognition model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Recognition failed: {message}")]
    Recognition { message: String },

    #[error("Punctuation failed: {message}")]
    Punctuation { message: String },

    #[error("Diarization failed: {message}")]
    Diarization { message: String },

    #[error("Segmentation failed: {message}")]
    Segmentation { message: String },

    #[error("Enhancement failed: {message}")]
    Enhancement { message: String },

    #[error("No {engine} engine configured")]
    EngineMissing { engine: &'static str },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScribedError>;
