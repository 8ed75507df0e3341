//! Command handler implementation for the transcription service.
//!
//! Handlers validate, record, and schedule; they never run inference
//! inline. Pipeline work goes to blocking worker threads so the accept
//! loop keeps answering status queries while recognition runs.

use crate::ipc::protocol::{Command, Response};
use crate::ipc::server::CommandHandler;
use crate::service::ServiceState;
use crate::task::{AudioPayload, MediaType, Stage, TaskId, TaskStatus};
use std::sync::Arc;

/// Command handler for service IPC commands.
pub struct ServiceCommandHandler {
    state: Arc<ServiceState>,
    quiet: bool,
    verbosity: u8,
}

impl ServiceCommandHandler {
    /// Creates a new command handler.
    pub fn new(state: ServiceState, quiet: bool, verbosity: u8) -> Self {
        Self {
            state: Arc::new(state),
            quiet,
            verbosity,
        }
    }

    /// Validate and register a submission, then schedule the full
    /// pipeline run. A rejected media type creates no task.
    async fn submit(&self, media_type: String, audio: Vec<u8>) -> Response {
        let media_type = match MediaType::parse(&media_type) {
            Ok(media_type) => media_type,
            Err(e) => {
                return Response::Error {
                    message: e.to_string(),
                };
            }
        };

        let task_id = TaskId::new();
        let payload = AudioPayload::new(audio, media_type);
        if !self.state.registry.create(task_id, Some(payload)) {
            return Response::Error {
                message: format!("Task id collision: {}", task_id),
            };
        }

        if !self.quiet && self.verbosity >= 1 {
            eprintln!("scribed: accepted task {}", task_id);
        }

        let orchestrator = Arc::clone(&self.state.orchestrator);
        tokio::task::spawn_blocking(move || orchestrator.run_full(task_id));

        Response::Submitted {
            task_id,
            status: TaskStatus::Pending,
        }
    }

    /// Schedule a single stage against an existing task.
    async fn run_stage(&self, task_id: TaskId, stage: Stage) -> Response {
        let Some(snapshot) = self.state.registry.read(task_id) else {
            return Response::NotFound { task_id };
        };

        let orchestrator = Arc::clone(&self.state.orchestrator);
        tokio::task::spawn_blocking(move || orchestrator.run_stage(task_id, stage));

        Response::StageScheduled {
            task_id,
            stage,
            status: snapshot.status,
        }
    }

    async fn status(&self, task_id: TaskId) -> Response {
        match self.state.registry.read(task_id) {
            Some(snapshot) => Response::Task { task_id, snapshot },
            None => Response::NotFound { task_id },
        }
    }

    async fn health(&self) -> Response {
        Response::Health {
            model_loaded: self.state.orchestrator.model_ready(),
            model_name: Some(self.state.orchestrator.model_name()),
            tasks: self.state.registry.len(),
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for ServiceCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Submit { media_type, audio } => self.submit(media_type, audio).await,
            Command::RunStage { task_id, stage } => self.run_stage(task_id, stage).await,
            Command::Status { task_id } => self.status(task_id).await,
            Command::Health => self.health().await,
            Command::Shutdown => {
                // Shutdown is handled by stopping the IPC server
                Response::Ok
            }
        }
    }
}
