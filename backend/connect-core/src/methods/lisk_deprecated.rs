use crate::error::ConnectError;
use crate::method::{Method, MethodContext, MethodDescriptor, MethodEnv};

use models::FirmwareRange;

use async_trait::async_trait;
use serde_json::Value;

pub const METHOD_NAMES: [&str; 5] = [
    "liskGetAddress",
    "liskGetPublicKey",
    "liskSignMessage",
    "liskVerifyMessage",
    "liskSignTransaction",
];

/// Placeholder for the removed Lisk verbs. Disabled on every generation, so
/// the firmware gate rejects it before `run` is reached.
pub struct LiskDeprecated {
    descriptor: MethodDescriptor,
}

impl LiskDeprecated {
    pub fn build(
        mut descriptor: MethodDescriptor,
        _payload: &Value,
        _env: &MethodEnv,
    ) -> Result<Box<dyn Method>, ConnectError> {
        descriptor.firmware_range = FirmwareRange::unsupported();
        descriptor.info = "Lisk not supported".to_string();
        Ok(Box::new(Self { descriptor }))
    }
}

#[async_trait]
impl Method for LiskDeprecated {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    async fn run(&self, _ctx: &MethodContext) -> Result<Value, ConnectError> {
        Err(ConnectError::runtime(self.descriptor.info.clone()))
    }
}
