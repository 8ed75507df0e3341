//! Service mode: long-lived transcription daemon behind the IPC server.

pub mod handler;

use crate::config::Config;
use crate::error::{Result, ScribedError};
use crate::ipc::server::IpcServer;
use crate::pipeline::orchestrator::{Engines, Orchestrator, OrchestratorConfig};
use crate::task::registry::TaskRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared service state: the task registry and the orchestrator that
/// drives pipeline runs against it.
pub struct ServiceState {
    pub registry: Arc<TaskRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

impl ServiceState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let registry = Arc::clone(orchestrator.registry());
        Self {
            registry,
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// Run the service: load engines, start the IPC server, wait for
/// shutdown.
pub async fn run_service(
    config: Config,
    socket_path: Option<PathBuf>,
    quiet: bool,
    verbosity: u8,
) -> Result<()> {
    if !quiet {
        eprintln!("Loading model '{}'...", config.stt.model_path.display());
    }

    let engines = build_engines(&config)?;

    if !quiet {
        eprintln!("Model loaded successfully.");
    }

    let orchestrator_config = OrchestratorConfig {
        chunk_threshold_secs: config.audio.chunk_threshold_secs,
        chunk_secs: config.audio.chunk_secs,
        quiet,
        verbosity,
    };
    let registry = Arc::new(TaskRegistry::new());
    let orchestrator = Orchestrator::new(engines, registry, orchestrator_config);
    let state = ServiceState::new(orchestrator);

    let socket_path = socket_path
        .or(config.service.socket.clone())
        .unwrap_or_else(IpcServer::default_socket_path);

    let server = Arc::new(IpcServer::new(socket_path)?);

    if !quiet {
        eprintln!(
            "IPC server listening at: {}",
            server.socket_path().display()
        );
        eprintln!("Service ready.");
    }

    let handler = handler::ServiceCommandHandler::new(state, quiet, verbosity);

    let server_clone = Arc::clone(&server);
    let server_handle = tokio::spawn(async move { server_clone.start(handler).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if !quiet {
                eprintln!("\nReceived SIGINT, shutting down...");
            }
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                eprintln!("Error setting up signal handler: {}", e);
            }
            if !quiet {
                eprintln!("\nReceived SIGTERM, shutting down...");
            }
        }
    }

    server.stop().await?;

    if let Err(e) = server_handle.await {
        eprintln!("scribed: server task failed: {e}");
    }

    if !quiet {
        eprintln!("Service stopped.");
    }

    Ok(())
}

/// Wait for SIGTERM signal (used by systemd).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| ScribedError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await
}

/// Build the engine set from config. Recognition is mandatory; voice
/// activity segmentation is attached when enabled.
fn build_engines(config: &Config) -> Result<Engines> {
    use crate::engine::energy_vad::{EnergySegmenter, EnergyVadConfig};
    use crate::engine::whisper::{WhisperConfig, WhisperRecognizer};

    let recognizer = WhisperRecognizer::new(WhisperConfig {
        model_path: config.stt.model_path.clone(),
        language: config.stt.language.clone(),
        threads: config.stt.threads,
    })?;

    let mut engines = Engines::new(Arc::new(recognizer));
    if config.vad.enabled {
        let segmenter = EnergySegmenter::new(EnergyVadConfig {
            speech_threshold: config.vad.threshold,
            min_speech_ms: config.vad.min_speech_ms,
            silence_gap_ms: config.vad.silence_gap_ms,
            ..EnergyVadConfig::default()
        });
        engines = engines.with_segmenter(Arc::new(segmenter));
    }
    Ok(engines)
}
