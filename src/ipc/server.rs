//! Async Unix socket server fronting the transcription service.
//!
//! One connection carries one command line and one response line. The
//! server never blocks on pipeline work: handlers schedule tasks and
//! answer immediately, so a status query stays responsive while a long
//! recognition runs on a worker thread.

use crate::error::{Result, ScribedError};
use crate::ipc::protocol::{Command, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;

/// Handler trait for processing IPC commands.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a command and return a response.
    async fn handle(&self, command: Command) -> Response;
}

/// State for managing server shutdown.
#[derive(Debug, Clone)]
struct ServerState {
    shutdown: Arc<Mutex<bool>>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            shutdown: Arc::new(Mutex::new(false)),
        }
    }

    async fn is_shutdown(&self) -> bool {
        *self.shutdown.lock().await
    }

    async fn set_shutdown(&self) {
        *self.shutdown.lock().await = true;
    }
}

/// IPC server accepting task commands over a Unix socket.
pub struct IpcServer {
    socket_path: PathBuf,
    state: ServerState,
}

impl IpcServer {
    /// Create a new IPC server bound to the specified socket path.
    pub fn new(socket_path: PathBuf) -> Result<Self> {
        Ok(Self {
            socket_path,
            state: ServerState::new(),
        })
    }

    /// Get the socket path this server is using.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Get the default socket path based on XDG_RUNTIME_DIR or fallback.
    pub fn default_socket_path() -> PathBuf {
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            PathBuf::from(xdg_runtime).join("scribed.sock")
        } else {
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/scribed-{}.sock", uid))
        }
    }

    /// Start the IPC server and handle incoming connections.
    pub async fn start<H>(&self, handler: H) -> Result<()>
    where
        H: CommandHandler + 'static,
    {
        // Clean up any existing socket file
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| ScribedError::IpcSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).map_err(|e| ScribedError::IpcSocket {
                message: format!("Failed to bind to socket: {}", e),
            })?;

        let handler = Arc::new(handler);

        loop {
            if self.state.is_shutdown().await {
                break;
            }

            // Accept with timeout so the shutdown flag gets re-checked
            let accept_result =
                tokio::time::timeout(tokio::time::Duration::from_millis(100), listener.accept())
                    .await;

            match accept_result {
                Ok(Ok((stream, _))) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler).await {
                            eprintln!("scribed: error handling client: {}", e);
                        }
                    });
                }
                Ok(Err(e)) => {
                    return Err(ScribedError::IpcConnection {
                        message: format!("Failed to accept connection: {}", e),
                    });
                }
                Err(_) => {
                    continue;
                }
            }
        }

        Ok(())
    }

    /// Stop the IPC server and clean up the socket file.
    pub async fn stop(&self) -> Result<()> {
        self.state.set_shutdown().await;

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| ScribedError::IpcSocket {
                message: format!("Failed to remove socket file: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Handle a single client connection: one command line, one response line.
async fn handle_client<H>(stream: UnixStream, handler: Arc<H>) -> Result<()>
where
    H: CommandHandler,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader
        .read_line(&mut line)
        .await
        .map_err(|e| ScribedError::IpcConnection {
            message: format!("Failed to read from client: {}", e),
        })?;

    // A malformed command still gets an answer so the client does not
    // have to infer the failure from a closed socket.
    let response = match Command::from_json(line.trim()) {
        Ok(command) => handler.handle(command).await,
        Err(e) => Response::Error {
            message: format!("Failed to parse command: {}", e),
        },
    };

    let response_json = response.to_json().map_err(|e| ScribedError::IpcProtocol {
        message: format!("Failed to serialize response: {}", e),
    })?;

    writer
        .write_all(response_json.as_bytes())
        .await
        .map_err(|e| ScribedError::IpcConnection {
            message: format!("Failed to write to client: {}", e),
        })?;

    writer
        .write_all(b"\n")
        .await
        .map_err(|e| ScribedError::IpcConnection {
            message: format!("Failed to write newline to client: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| ScribedError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    Ok(())
}
