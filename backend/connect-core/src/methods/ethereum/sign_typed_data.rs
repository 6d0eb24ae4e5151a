use crate::coins::network_label;
use crate::error::ConnectError;
use crate::firmware::get_firmware_range;
use crate::method::{Method, MethodContext, MethodDescriptor, MethodEnv};
use crate::methods::ethereum::typed_data::{
    SIGNATURE, STRUCT_REQUEST, TypedData, TypedDataResponse, VALUE_REQUEST, build_struct_ack,
    encode_member,
};
use crate::methods::format::message_to_hex;
use crate::params::path::{slip44_by_path, validate_path};
use crate::params::{FieldSpec, FieldType, validate_params};

use models::{DeviceModel, Permission};

use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};

pub const METHOD_NAME: &str = "ethereumSignTypedData";
const DOMAIN_ONLY_FEATURE: &str = "eip712-domain-only";

const STRUCT_LOOP_EXPECTED: &str = const_format::concatcp!(
    STRUCT_REQUEST,
    "|",
    VALUE_REQUEST,
    "|",
    SIGNATURE
);
const VALUE_LOOP_EXPECTED: &str = const_format::concatcp!(VALUE_REQUEST, "|", SIGNATURE);

#[derive(Debug, Clone, PartialEq)]
struct SignTypedDataParams {
    address_n: Vec<u32>,
    metamask_v4_compat: bool,
    data: TypedData,
    domain_separator_hash: Option<String>,
    message_hash: Option<String>,
}

pub struct EthereumSignTypedData {
    descriptor: MethodDescriptor,
    params: SignTypedDataParams,
}

impl EthereumSignTypedData {
    pub fn build(
        mut descriptor: MethodDescriptor,
        payload: &Value,
        env: &MethodEnv,
    ) -> Result<Box<dyn Method>, ConnectError> {
        descriptor.required_permissions = vec![Permission::Read, Permission::Write];

        validate_params(
            payload,
            &[
                FieldSpec::any("path").required(),
                FieldSpec::new("metamask_v4_compat", FieldType::Boolean).required(),
                FieldSpec::new("data", FieldType::Object).required(),
                FieldSpec::new("domain_separator_hash", FieldType::String),
                FieldSpec::new("message_hash", FieldType::String),
            ],
        )?;

        let address_n = validate_path(&payload["path"], 3)?;
        let network = slip44_by_path(&address_n)
            .and_then(|slip44| env.coins.ethereum_network_by_slip44(slip44));

        let mut firmware_range = get_firmware_range(
            &descriptor.name,
            network,
            &descriptor.firmware_range,
            &env.firmware,
        );
        descriptor.info = network_label("Sign #NETWORK typed data", network);

        let data: TypedData = serde_json::from_value(payload["data"].clone()).map_err(|e| {
            ConnectError::invalid_parameter(format!("Parameter \"data\" is not typed data: {e}"))
        })?;

        let domain_separator_hash = payload
            .get("domain_separator_hash")
            .and_then(Value::as_str)
            .map(message_to_hex);

        let mut message_hash = None;
        if domain_separator_hash.is_some() {
            match payload.get("message_hash").and_then(Value::as_str) {
                Some(hash) if !hash.is_empty() => message_hash = Some(message_to_hex(hash)),
                _ if !data.is_domain_only() => {
                    return Err(ConnectError::invalid_parameter(
                        "message_hash should only be empty when data.primaryType=EIP712Domain",
                    ));
                }
                _ => {}
            }
        }

        if data.is_domain_only() {
            firmware_range =
                get_firmware_range(DOMAIN_ONLY_FEATURE, network, &firmware_range, &env.firmware);

            if message_hash.is_some() {
                return Err(ConnectError::invalid_parameter(
                    "message_hash should be empty when data.primaryType=EIP712Domain",
                ));
            }
        }

        descriptor.firmware_range = firmware_range;

        let metamask_v4_compat = payload["metamask_v4_compat"].as_bool().unwrap_or_default();

        Ok(Box::new(Self {
            descriptor,
            params: SignTypedDataParams {
                address_n,
                metamask_v4_compat,
                data,
                domain_separator_hash,
                message_hash,
            },
        }))
    }

    /// First generation: one call with precomputed hashes.
    async fn sign_hash(&self, ctx: &MethodContext) -> Result<Value, ConnectError> {
        let domain_separator_hash = self.params.domain_separator_hash.as_ref().ok_or_else(|| {
            ConnectError::invalid_parameter("Parameter \"domain_separator_hash\" is missing.")
        })?;

        let mut request = json!({
            "address_n": self.params.address_n,
            "domain_separator_hash": domain_separator_hash,
        });
        if let Some(message_hash) = &self.params.message_hash {
            request["message_hash"] = json!(message_hash);
        }

        let reply = ctx
            .commands()?
            .typed_call("EthereumSignTypedHash", SIGNATURE, request)
            .await?;
        signature_result(TypedDataResponse::parse(&reply)?)
    }

    /// Second generation: the device walks the type dictionary and the
    /// values one request at a time.
    async fn sign_typed(&self, ctx: &MethodContext) -> Result<Value, ConnectError> {
        let commands = ctx.commands()?;
        let data = &self.params.data;

        let mut reply = commands
            .typed_call(
                "EthereumSignTypedData",
                STRUCT_LOOP_EXPECTED,
                json!({
                    "address_n": self.params.address_n,
                    "primary_type": data.primary_type,
                    "metamask_v4_compat": self.params.metamask_v4_compat,
                }),
            )
            .await?;

        loop {
            match TypedDataResponse::parse(&reply)? {
                TypedDataResponse::StructRequest { name } => {
                    debug!("Struct request for {name}");
                    let ack = build_struct_ack(&data.types, &name)?;
                    reply = commands
                        .typed_call("EthereumTypedDataStructAck", STRUCT_LOOP_EXPECTED, ack)
                        .await?;
                }
                TypedDataResponse::ValueRequest { member_path } => {
                    let value = encode_member(data, &member_path)?;
                    reply = commands
                        .typed_call(
                            "EthereumTypedDataValueAck",
                            VALUE_LOOP_EXPECTED,
                            json!({ "value": value }),
                        )
                        .await?;
                }
                signature @ TypedDataResponse::Signature { .. } => {
                    return signature_result(signature);
                }
            }
        }
    }
}

fn signature_result(response: TypedDataResponse) -> Result<Value, ConnectError> {
    match response {
        TypedDataResponse::Signature { address, signature } => Ok(json!({
            "address": address,
            "signature": format!("0x{signature}"),
        })),
        other => Err(ConnectError::runtime(format!(
            "Expected a signature, got {other:?}"
        ))),
    }
}

#[async_trait]
impl Method for EthereumSignTypedData {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &MethodContext) -> Result<Value, ConnectError> {
        let device = ctx.require_device()?;
        if device.features.model == DeviceModel::One {
            self.sign_hash(ctx).await
        } else {
            self.sign_typed(ctx).await
        }
    }
}
