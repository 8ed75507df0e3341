//! Inter-process communication over a Unix domain socket.

pub mod client;
pub mod protocol;
pub mod server;

pub use protocol::{Command, Response};
pub use server::{CommandHandler, IpcServer};
