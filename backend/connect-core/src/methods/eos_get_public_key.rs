use crate::error::ConnectError;
use crate::firmware::get_firmware_range;
use crate::method::{Method, MethodContext, MethodDescriptor, MethodEnv};
use crate::params::path::{from_hardened, serialized_path, validate_path};
use crate::params::{FieldSpec, FieldType, validate_params};

use models::{Permission, UiEvent, UiMessage};

use async_trait::async_trait;
use serde_json::{Value, json};

pub const METHOD_NAME: &str = "eosGetPublicKey";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Batch {
    address_n: Vec<u32>,
    show_display: bool,
}

/// Exports one EOS public key, or several when called with `bundle`.
pub struct EosGetPublicKey {
    descriptor: MethodDescriptor,
    has_bundle: bool,
    batches: Vec<Batch>,
}

impl EosGetPublicKey {
    pub fn build(
        mut descriptor: MethodDescriptor,
        payload: &Value,
        env: &MethodEnv,
    ) -> Result<Box<dyn Method>, ConnectError> {
        descriptor.required_permissions = vec![Permission::Read];
        descriptor.firmware_range = get_firmware_range(
            &descriptor.name,
            env.coins.get("EOS"),
            &descriptor.firmware_range,
            &env.firmware,
        );
        descriptor.info = "Export Eos public key".to_string();

        let has_bundle = payload.get("bundle").is_some_and(|b| !b.is_null());
        let bundle = if has_bundle {
            validate_params(payload, &[FieldSpec::new("bundle", FieldType::Array)])?;
            payload["bundle"].as_array().cloned().unwrap_or_default()
        } else {
            vec![payload.clone()]
        };

        let batches = bundle
            .iter()
            .map(|batch| {
                validate_params(
                    batch,
                    &[
                        FieldSpec::any("path").required(),
                        FieldSpec::new("showOnTrezor", FieldType::Boolean),
                    ],
                )?;
                Ok(Batch {
                    address_n: validate_path(&batch["path"], 3)?,
                    show_display: batch
                        .get("showOnTrezor")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                })
            })
            .collect::<Result<Vec<_>, ConnectError>>()?;

        if batches.is_empty() {
            return Err(ConnectError::invalid_parameter("Parameter \"bundle\" is empty."));
        }

        Ok(Box::new(Self {
            descriptor,
            has_bundle,
            batches,
        }))
    }

    fn confirmation_label(&self) -> String {
        match self.batches.as_slice() {
            [single] => format!(
                "Export Eos public key for account #{}",
                from_hardened(single.address_n[2]) + 1
            ),
            _ => "Export multiple Eos public keys".to_string(),
        }
    }
}

#[async_trait]
impl Method for EosGetPublicKey {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    async fn confirmation(&self, ctx: &MethodContext) -> Result<bool, ConnectError> {
        ctx.request_confirmation(json!({
            "view": "export-address",
            "label": self.confirmation_label(),
        }))
        .await
    }

    async fn run(&self, ctx: &MethodContext) -> Result<Value, ConnectError> {
        let commands = ctx.commands()?;
        let mut responses = Vec::with_capacity(self.batches.len());

        for (i, batch) in self.batches.iter().enumerate() {
            let reply = commands
                .typed_call(
                    "EosGetPublicKey",
                    "EosPublicKey",
                    json!({
                        "address_n": batch.address_n,
                        "show_display": batch.show_display,
                    }),
                )
                .await?;

            responses.push(json!({
                "rawPublicKey": reply.message["raw_public_key"],
                "wifPublicKey": reply.message["wif_public_key"],
                "path": batch.address_n,
                "serializedPath": serialized_path(&batch.address_n),
            }));

            if self.has_bundle {
                ctx.post_message(UiMessage::new(
                    UiEvent::BundleProgress,
                    json!({ "progress": i, "response": reply.message }),
                ));
            }
        }

        if self.has_bundle {
            Ok(Value::Array(responses))
        } else {
            Ok(responses.into_iter().next().unwrap_or(Value::Null))
        }
    }
}
