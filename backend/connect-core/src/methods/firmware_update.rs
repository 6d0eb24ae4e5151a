//! Firmware upload to a device in bootloader mode.
//!
//! Generation 1 takes the whole image in one `FirmwareUpload`. Generation 2
//! pulls it in chunks: every `FirmwareRequest` names the next
//! `[offset, offset + length)` slice until the device answers `Success`.

use crate::error::ConnectError;
use crate::method::{Method, MethodContext, MethodDescriptor, MethodEnv};
use crate::methods::format::hex_to_bytes;
use crate::params::{FieldSpec, FieldType, validate_params};

use models::{Permission, UiEvent, UiMessage};

use async_trait::async_trait;
use log::info;
use serde_json::{Value, json};

pub const METHOD_NAME: &str = "firmwareUpdate";

pub struct FirmwareUpdate {
    descriptor: MethodDescriptor,
    binary: Vec<u8>,
}

impl FirmwareUpdate {
    pub fn build(
        mut descriptor: MethodDescriptor,
        payload: &Value,
        _env: &MethodEnv,
    ) -> Result<Box<dyn Method>, ConnectError> {
        descriptor.required_permissions = vec![Permission::Read, Permission::Write];
        descriptor.use_ui = true;
        descriptor.allow_bootloader = true;
        descriptor.require_bootloader = true;
        descriptor.allow_seedless = true;
        descriptor.info = "Update firmware".to_string();

        validate_params(payload, &[FieldSpec::new("binary", FieldType::String).required()])?;

        let binary = payload["binary"]
            .as_str()
            .map(hex_to_bytes)
            .transpose()
            .map_err(|e| {
                ConnectError::invalid_parameter(format!("Parameter \"binary\" is not hex: {e}"))
            })?
            .unwrap_or_default();

        if binary.is_empty() {
            return Err(ConnectError::invalid_parameter("Parameter \"binary\" is empty."));
        }

        Ok(Box::new(Self { descriptor, binary }))
    }
}

#[async_trait]
impl Method for FirmwareUpdate {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &MethodContext) -> Result<Value, ConnectError> {
        upload_firmware(ctx, &self.binary).await
    }
}

/// Drive the erase/upload exchange and report progress.
pub async fn upload_firmware(ctx: &MethodContext, payload: &[u8]) -> Result<Value, ConnectError> {
    let device = ctx.require_device()?;
    let commands = ctx.commands()?;
    let firmware_present = device.features.firmware_present.unwrap_or(false);

    match device.features.major_version {
        1 => {
            post_confirmation(ctx, firmware_present);
            commands.typed_call("FirmwareErase", "Success", json!({})).await?;
            post_progress(ctx, 0);
            let reply = commands
                .typed_call("FirmwareUpload", "Success", json!({ "payload": hex::encode(payload) }))
                .await?;
            post_progress(ctx, 100);
            Ok(reply.message)
        }
        2 => {
            post_confirmation(ctx, firmware_present);
            let length = payload.len();
            let mut reply = commands
                .typed_call("FirmwareErase", "FirmwareRequest", json!({ "length": length }))
                .await?;

            while !reply.is("Success") {
                let (start, end) = chunk_bounds(&reply.message, length)?;
                if start > 0 {
                    post_progress(ctx, progress_percent(start, length));
                }
                reply = commands
                    .typed_call(
                        "FirmwareUpload",
                        "FirmwareRequest|Success",
                        json!({ "payload": hex::encode(&payload[start..end]) }),
                    )
                    .await?;
            }

            post_progress(ctx, 100);
            info!("Firmware upload finished ({length} bytes)");
            Ok(reply.message)
        }
        other => Err(ConnectError::runtime(format!(
            "Firmware upload not supported for generation {other}"
        ))),
    }
}

fn chunk_bounds(request: &Value, length: usize) -> Result<(usize, usize), ConnectError> {
    let field = |name: &str| {
        request
            .get(name)
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| ConnectError::runtime(format!("FirmwareRequest without {name}")))
    };
    let start = field("offset")?;
    let end = start.saturating_add(field("length")?);
    if start > length || end > length {
        return Err(ConnectError::runtime(format!(
            "FirmwareRequest [{start}, {end}) outside of {length} bytes"
        )));
    }
    Ok((start, end))
}

pub fn progress_percent(offset: usize, length: usize) -> u32 {
    if length == 0 {
        return 100;
    }
    ((offset as f64 / length as f64) * 100.0).round() as u32
}

/// The device does not ask for a button press during an update, but the
/// user still has to press it when a firmware is already installed.
fn post_confirmation(ctx: &MethodContext, firmware_present: bool) {
    if firmware_present {
        ctx.post_message(UiMessage::new(
            UiEvent::RequestButton,
            json!({ "code": "ButtonRequest_FirmwareUpdate" }),
        ));
    }
}

fn post_progress(ctx: &MethodContext, progress: u32) {
    ctx.post_message(UiMessage::new(
        UiEvent::FirmwareProgress,
        json!({ "progress": progress }),
    ));
}
