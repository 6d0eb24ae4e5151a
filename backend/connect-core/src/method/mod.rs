//! The lifecycle every RPC verb implements.
//!
//! Init is construction: a registry factory validates the raw parameters and
//! returns a ready [`Method`], or fails and nothing else happens. After that
//! the dispatcher calls [`Method::confirmation`] (only for methods that use
//! the UI) and then [`Method::run`], each at most once.

pub mod context;
pub mod descriptor;
pub mod registry;

pub use context::{MethodContext, MethodEnv};
pub use descriptor::MethodDescriptor;
pub use registry::{MethodFactory, MethodRegistry};

use crate::error::ConnectError;

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Method: Send + Sync {
    fn descriptor(&self) -> &MethodDescriptor;

    /// Ask the user to approve the call. `Ok(false)` aborts it.
    async fn confirmation(&self, _ctx: &MethodContext) -> Result<bool, ConnectError> {
        Ok(true)
    }

    async fn run(&self, ctx: &MethodContext) -> Result<Value, ConnectError>;
}
