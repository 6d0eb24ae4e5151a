//! WebSocket IPC surface for the dispatcher.
//!
//! - Localhost-only binding (`127.0.0.1`), non-loopback peers rejected
//! - Authentication token required in the first message
//! - JSON text frames (see [`protocol`])
//!
//! Calls run on their own tasks so UI answers can arrive on the same socket
//! while a call waits for them.

mod connection_state;
mod handle;
pub mod protocol;
mod server;

pub use handle::IpcServerHandle;
pub use server::start_ipc_server;
