use crate::error::ConnectError;
use crate::method::{Method, MethodContext, MethodDescriptor, MethodEnv};
use crate::params::{FieldSpec, FieldType, validate_params};

use models::CoinInfo;

use async_trait::async_trait;
use serde_json::Value;

pub const METHOD_NAME: &str = "getCoinInfo";

/// Static lookup in the coin table. Runs without a device.
pub struct GetCoinInfo {
    descriptor: MethodDescriptor,
    coin: CoinInfo,
}

impl GetCoinInfo {
    pub fn build(
        mut descriptor: MethodDescriptor,
        payload: &Value,
        env: &MethodEnv,
    ) -> Result<Box<dyn Method>, ConnectError> {
        descriptor.use_device = false;
        descriptor.use_ui = false;

        validate_params(payload, &[FieldSpec::new("coin", FieldType::String).required()])?;

        let name = payload["coin"].as_str().unwrap_or_default();
        let coin = env.coins.require(name)?.clone();
        descriptor.info = format!("Get {} info", coin.name);

        Ok(Box::new(Self { descriptor, coin }))
    }
}

#[async_trait]
impl Method for GetCoinInfo {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    async fn run(&self, _ctx: &MethodContext) -> Result<Value, ConnectError> {
        serde_json::to_value(&self.coin)
            .map_err(|e| ConnectError::runtime(format!("Failed to serialize coin info: {e}")))
    }
}
