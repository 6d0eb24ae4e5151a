use crate::error::ConnectError;
use crate::method::{Method, MethodContext, MethodDescriptor, MethodEnv};

use async_trait::async_trait;
use serde_json::{Value, json};

pub const METHOD_NAME: &str = "getDeviceState";

/// Reports the acquired device's wallet-state fingerprint. Needs no device
/// exchange and no user interaction.
pub struct GetDeviceState {
    descriptor: MethodDescriptor,
}

impl GetDeviceState {
    pub fn build(
        mut descriptor: MethodDescriptor,
        _payload: &Value,
        _env: &MethodEnv,
    ) -> Result<Box<dyn Method>, ConnectError> {
        descriptor.required_permissions = Vec::new();
        descriptor.use_ui = false;
        descriptor.info = "Get device state".to_string();
        Ok(Box::new(Self { descriptor }))
    }
}

#[async_trait]
impl Method for GetDeviceState {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &MethodContext) -> Result<Value, ConnectError> {
        let state = ctx.require_device()?.state.clone();
        Ok(json!({ "state": state }))
    }
}
