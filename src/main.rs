use anyhow::{Context, Result};
use clap::Parser;
use scribed::cli::{guess_media_type, Cli, Commands};
use scribed::config::Config;
use scribed::ipc::client::send_command;
use scribed::ipc::protocol::{Command, Response};
use scribed::ipc::server::IpcServer;
use scribed::service::run_service;
use scribed::task::TaskId;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { socket } => {
            let config = load_config(cli.config.as_deref())?;
            run_service(config, socket, cli.quiet, cli.verbose).await?;
        }
        Commands::Submit {
            file,
            media_type,
            socket,
        } => {
            let media_type = match media_type {
                Some(media_type) => media_type,
                None => guess_media_type(&file)
                    .context("Cannot guess media type from extension, pass --media-type")?
                    .to_string(),
            };
            let audio = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let response = send(socket, Command::Submit { media_type, audio }).await?;
            print_response(&response)?;
        }
        Commands::RunStage {
            task_id,
            stage,
            socket,
        } => {
            let task_id = TaskId::parse(&task_id)?;
            let response = send(socket, Command::RunStage { task_id, stage }).await?;
            print_response(&response)?;
        }
        Commands::Status { task_id, socket } => {
            let task_id = TaskId::parse(&task_id)?;
            let response = send(socket, Command::Status { task_id }).await?;
            print_response(&response)?;
        }
        Commands::Health { socket } => {
            let response = send(socket, Command::Health).await?;
            print_response(&response)?;
        }
        Commands::Shutdown { socket } => {
            let response = send(socket, Command::Shutdown).await?;
            print_response(&response)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()?)?,
    };
    Ok(config.with_env_overrides())
}

async fn send(socket: Option<PathBuf>, command: Command) -> Result<Response> {
    let socket = socket.unwrap_or_else(IpcServer::default_socket_path);
    Ok(send_command(&socket, command).await?)
}

/// Print a daemon response as one line of JSON. Error responses also
/// fail the process so scripts can branch on the exit code.
fn print_response(response: &Response) -> Result<()> {
    println!("{}", response.to_json()?);
    match response {
        Response::Error { message } => anyhow::bail!("daemon error: {message}"),
        Response::NotFound { task_id } => anyhow::bail!("task not found: {task_id}"),
        _ => Ok(()),
    }
}
