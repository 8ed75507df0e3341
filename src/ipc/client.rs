//! IPC client for sending commands to the daemon.

use crate::error::{Result, ScribedError};
use crate::ipc::protocol::{Command, Response};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Send a command to the daemon via Unix socket.
///
/// # Errors
/// Returns `ScribedError::IpcConnection` if connection fails
/// Returns `ScribedError::IpcProtocol` if serialization/deserialization fails
pub async fn send_command(socket_path: &Path, command: Command) -> Result<Response> {
    let stream =
        UnixStream::connect(socket_path)
            .await
            .map_err(|e| ScribedError::IpcConnection {
                message: format!("Failed to connect to daemon: {}", e),
            })?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let command_json = command.to_json().map_err(|e| ScribedError::IpcProtocol {
        message: format!("Failed to serialize command: {}", e),
    })?;

    writer
        .write_all(command_json.as_bytes())
        .await
        .map_err(|e| ScribedError::IpcConnection {
            message: format!("Failed to write command: {}", e),
        })?;

    writer
        .write_all(b"\n")
        .await
        .map_err(|e| ScribedError::IpcConnection {
            message: format!("Failed to write newline: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| ScribedError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .await
        .map_err(|e| ScribedError::IpcConnection {
            message: format!("Failed to read response: {}", e),
        })?;

    let response =
        Response::from_json(response_line.trim()).map_err(|e| ScribedError::IpcProtocol {
            message: format!("Failed to deserialize response: {}", e),
        })?;

    Ok(response)
}
