//! Protocol-dispatch engine for hardware wallet calls.
//!
//! A caller hands [`Core::call`] an untyped parameter object naming a method.
//! The dispatcher builds the method (validating its parameters and computing
//! its firmware window), gates it on the connected device, walks it through
//! confirmation and run, and always answers with a [`models::CallResponse`]
//! envelope. UI interaction happens out of band: requests are published on a
//! broadcast channel and answers come back through [`Core::ui_response`].

pub mod coins;
pub mod config;
pub mod core;
pub mod device;
pub mod error;
pub mod firmware;
pub mod ipc;
pub mod logger;
pub mod method;
pub mod methods;
pub mod params;
pub mod ui;

#[cfg(test)]
mod tests;

pub use crate::core::Core;

pub const CONNECT_IPC_HOSTNAME: &str = "127.0.0.1";
pub const CONNECT_IPC_BASE_URL: &str = const_format::concatcp!("ws://", CONNECT_IPC_HOSTNAME);
