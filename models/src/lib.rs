//! Domain models for the Connect engine.
//!
//! This crate contains pure data structures shared by the dispatcher, the
//! methods and the IPC layer. Models have no business logic beyond
//! validation and ordering - they're just data that can be passed between
//! layers and serialized onto the wire.
//!
//! ## Architecture
//!
//! - **common**: error location and secret handling
//! - **models** (this crate): pure data structures
//! - **connect-core**: validation, firmware gating, device exchanges, dispatch

pub mod coin_info;
pub mod device;
pub mod envelope;
pub mod error;
pub mod events;
pub mod firmware;
pub mod params;
pub mod permission;

pub use coin_info::{CoinInfo, CoinSupport, CoinType};
pub use common::ErrorLocation;
pub use device::builder::FeaturesBuilder;
pub use device::features::{DeviceFeatures, DeviceModel};
pub use envelope::{CallResponse, FailurePayload};
pub use error::model_error::ModelError;
pub use events::{CoreMessage, UiEvent, UiMessage, UiResponse};
pub use firmware::range::{FirmwareBounds, FirmwareCheck, FirmwareRange};
pub use firmware::version::FirmwareVersion;
pub use params::{CommonParams, DeviceSelector};
pub use permission::Permission;

#[cfg(test)]
mod tests;
