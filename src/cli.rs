//! Command-line interface for scribed
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::task::Stage;

/// Speech transcription daemon
#[derive(Parser, Debug)]
#[command(name = "scribed", version, about = "Asynchronous speech transcription daemon")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-task timings, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the daemon (foreground process for systemd)
    Serve {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/scribed.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Submit an audio file for a full pipeline run
    Submit {
        /// Audio file (WAV or MP3)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Declared media type (default: guessed from the extension)
        #[arg(long, value_name = "TYPE")]
        media_type: Option<String>,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/scribed.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Run a single pipeline stage against a submitted task
    RunStage {
        /// Task identifier
        #[arg(value_name = "TASK_ID")]
        task_id: String,

        /// Stage to run (enhanced, diarization, transformer)
        #[arg(value_name = "STAGE")]
        stage: Stage,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/scribed.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Get a task snapshot via IPC
    Status {
        /// Task identifier
        #[arg(value_name = "TASK_ID")]
        task_id: String,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/scribed.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Check daemon liveness via IPC
    Health {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/scribed.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Shut down the daemon via IPC
    Shutdown {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/scribed.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },
}

/// Guess a media type from a file extension for `submit` without an
/// explicit `--media-type`.
pub fn guess_media_type(path: &std::path::Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        _ => None,
    }
}
