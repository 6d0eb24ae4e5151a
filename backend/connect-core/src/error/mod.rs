pub mod config;
pub mod connect;
pub mod device;
pub mod ipc;

pub use connect::ConnectError;

use common::ErrorLocation;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Connect(#[from] connect::ConnectError),

    #[error(transparent)]
    Device(#[from] device::DeviceError),

    #[error(transparent)]
    Ipc(#[from] ipc::IpcError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },
}
