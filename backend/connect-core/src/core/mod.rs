//! Call dispatcher.
//!
//! [`Core::call`] takes an untyped parameter object, builds the named method,
//! gates it on the device, walks it through permissions, confirmation and
//! run, and always answers with a [`CallResponse`].
//!
//! # Gating order
//!
//! 1. Registry lookup (unknown verb is `Method_NotAllowed`)
//! 2. Init: the method factory validates parameters and computes its window
//! 3. Device: selection, session slot, acquire, wallet state, bootloader
//!    mode, seed presence, firmware window
//! 4. Permissions (UI round trip unless trusted or already granted)
//! 5. Confirmation (UI methods only), then run
//! 6. Cleanup: leftover UI promises cancelled, device released

mod permissions;
mod scope;
mod sessions;

pub use permissions::PermissionStore;
pub use scope::{CallScope, ScopeEntry};
pub use sessions::{SessionGuard, SessionSlots};

use crate::device::{Device, DeviceProvider, DeviceSessionOptions};
use crate::error::ConnectError;
use crate::firmware::check_device_firmware;
use crate::method::{Method, MethodContext, MethodDescriptor, MethodEnv, MethodRegistry};
use crate::ui::{EventSink, UiKey, UiOutcome, UiPromiseBroker};

use common::ErrorLocation;
use models::{CallResponse, CommonParams, CoreMessage, UiEvent, UiMessage, UiResponse};

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::{Value, json};
use tokio::sync::broadcast;

/// The dispatch engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Core {
    registry: Arc<MethodRegistry>,
    env: MethodEnv,
    provider: Arc<dyn DeviceProvider>,
    broker: UiPromiseBroker,
    events: EventSink,
    sessions: SessionSlots,
    permissions: PermissionStore,
}

impl Core {
    pub fn new(registry: MethodRegistry, env: MethodEnv, provider: Arc<dyn DeviceProvider>) -> Self {
        info!(
            "Connect core ready with {} methods, {} coins",
            registry.names().len(),
            env.coins.len()
        );
        Self {
            registry: Arc::new(registry),
            env,
            provider,
            broker: UiPromiseBroker::new(),
            events: EventSink::new(),
            sessions: SessionSlots::new(),
            permissions: PermissionStore::new(),
        }
    }

    pub fn env(&self) -> &MethodEnv {
        &self.env
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// Run one call to completion. Never fails; errors become the failure
    /// envelope.
    pub async fn call(&self, id: u64, params: Value) -> CallResponse {
        self.respond(id, self.dispatch(id, &params, None).await)
    }

    /// Like [`Core::call`], counting the call against `scope` while it runs.
    pub async fn call_in_scope(&self, id: u64, params: Value, scope: &CallScope) -> CallResponse {
        self.respond(id, self.dispatch(id, &params, Some(scope)).await)
    }

    fn respond(&self, id: u64, result: Result<Value, ConnectError>) -> CallResponse {
        match result {
            Ok(payload) => CallResponse::success(id, payload),
            Err(err) => {
                if err.is_cancellation() {
                    warn!("Call {id} cancelled: {err}");
                } else {
                    error!("Call {id} failed: {err}");
                }
                CallResponse::failure(err.message(), Some(err.code()))
            }
        }
    }

    /// Deliver a UI answer. Returns whether a pending request took it.
    pub async fn ui_response(&self, response: UiResponse) -> bool {
        match response.device.as_deref() {
            Some(device) => {
                self.broker
                    .resolve(response.event, Some(device), response.payload)
                    .await
            }
            None => self.broker.resolve_any(response.event, response.payload).await,
        }
    }

    /// Cancel pending UI requests for one device, or all of them.
    pub async fn cancel(&self, device: Option<&str>) -> usize {
        let cancelled = match device {
            Some(device) => self.broker.cancel_device(device).await,
            None => self.broker.cancel_all().await,
        };
        info!("Cancelled {cancelled} pending UI request(s)");
        cancelled
    }

    /// Cancel the UI requests of every call still in flight in `scope`.
    pub async fn cancel_scope(&self, scope: &CallScope) -> usize {
        scope.close();
        let mut cancelled = 0;
        for device in scope.devices() {
            cancelled += match device.as_deref() {
                Some(device) => self.broker.cancel_device(device).await,
                None => self.broker.cancel_unbound().await,
            };
        }
        if cancelled > 0 {
            info!("Cancelled {cancelled} UI request(s) left by a departed client");
        }
        cancelled
    }

    pub fn is_device_busy(&self, path: &str) -> bool {
        self.sessions.is_busy(path)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreMessage> {
        self.events.subscribe()
    }

    pub async fn pending_ui_requests(&self) -> Vec<(UiKey, Value)> {
        self.broker.pending_requests().await
    }

    async fn dispatch(
        &self,
        id: u64,
        params: &Value,
        scope: Option<&CallScope>,
    ) -> Result<Value, ConnectError> {
        let name = params
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| ConnectError::invalid_parameter("Parameter \"method\" is missing."))?;

        let factory = self
            .registry
            .get(name)
            .ok_or_else(|| ConnectError::MethodNotAllowed {
                message: format!("Method not found: {name}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let common: CommonParams = serde_json::from_value(params.clone())
            .map_err(|e| ConnectError::invalid_parameter(format!("Invalid common parameters: {e}")))?;

        let method = factory(MethodDescriptor::new(name, common), params, &self.env)?;
        let descriptor = method.descriptor();
        debug!("Call {id}: {} ({})", descriptor.name, descriptor.info);

        if !descriptor.use_device {
            let _entry = enter_scope(scope, None)?;
            let ctx = self.context(id, None, descriptor);
            return self.confirm_and_run(method.as_ref(), &ctx).await;
        }

        let path = match descriptor.device_path() {
            Some(path) => path.to_string(),
            None => self.first_device().await?,
        };

        let _slot = self.sessions.try_acquire(&path)?;
        let _entry = enter_scope(scope, Some(&path))?;
        let options = DeviceSessionOptions {
            instance: descriptor.common.device.as_ref().and_then(|d| d.instance),
            keep_session: descriptor.common.keep_session,
        };
        let device = self.provider.acquire(&path, &options).await?;

        let result = self.run_on_device(id, method.as_ref(), device).await;

        let leftover = self.broker.cancel_device(&path).await;
        if leftover > 0 {
            debug!("Cancelled {leftover} leftover UI request(s) for {path}");
        }
        if let Err(e) = self.provider.release(&path, options.keep_session).await {
            warn!("Failed to release {path}: {e}");
        }

        result
    }

    async fn first_device(&self) -> Result<String, ConnectError> {
        self.provider
            .enumerate()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectError::DeviceNotFound {
                message: "Device not found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    async fn run_on_device(
        &self,
        id: u64,
        method: &dyn Method,
        device: Device,
    ) -> Result<Value, ConnectError> {
        let descriptor = method.descriptor();
        check_device(descriptor, &device)?;

        let path = device.path.clone();
        let ctx = self.context(id, Some(device), descriptor);

        if descriptor.use_ui && descriptor.needs_permissions() {
            self.ensure_permissions(&ctx, descriptor, &path).await?;
        }

        self.confirm_and_run(method, &ctx).await
    }

    async fn ensure_permissions(
        &self,
        ctx: &MethodContext,
        descriptor: &MethodDescriptor,
        path: &str,
    ) -> Result<(), ConnectError> {
        if self.env.settings.trusted_host {
            return Ok(());
        }

        let missing = self
            .permissions
            .missing(path, &descriptor.required_permissions)
            .await;
        if missing.is_empty() {
            return Ok(());
        }

        let request = json!({ "permissions": missing, "device": path });
        let promise = ctx
            .create_ui_promise(UiEvent::ReceivePermission, request.clone())
            .await;
        ctx.post_message(UiMessage::new(UiEvent::RequestPermission, request));

        let granted = match promise.wait().await {
            UiOutcome::Resolved(answer) => answer
                .as_bool()
                .or_else(|| answer.get("granted").and_then(Value::as_bool))
                .unwrap_or(false),
            UiOutcome::Cancelled => false,
        };

        if !granted {
            return Err(ConnectError::PermissionsNotGranted {
                message: "Permissions not granted".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!("Granted {missing:?} for {path}");
        self.permissions.grant(path, &missing).await;
        Ok(())
    }

    async fn confirm_and_run(
        &self,
        method: &dyn Method,
        ctx: &MethodContext,
    ) -> Result<Value, ConnectError> {
        if method.descriptor().use_ui {
            match method.confirmation(ctx).await {
                Ok(true) => {}
                Ok(false) => return Err(ConnectError::action_cancelled()),
                Err(e) => {
                    warn!("Confirmation for call {} failed: {e}", ctx.call_id);
                    return Err(ConnectError::action_cancelled());
                }
            }
        }
        method.run(ctx).await
    }

    fn context(
        &self,
        id: u64,
        device: Option<Device>,
        descriptor: &MethodDescriptor,
    ) -> MethodContext {
        MethodContext::new(
            id,
            device,
            self.broker.clone(),
            self.events.clone(),
            descriptor.common.use_empty_passphrase,
            Duration::from_secs(self.env.settings.typed_call_timeout_secs),
        )
    }
}

#[track_caller]
fn enter_scope(
    scope: Option<&CallScope>,
    device: Option<&str>,
) -> Result<Option<ScopeEntry>, ConnectError> {
    let Some(scope) = scope else {
        return Ok(None);
    };
    let entry = scope.enter(device);
    if scope.is_closed() {
        return Err(ConnectError::action_cancelled());
    }
    Ok(Some(entry))
}

/// Device gates that need no user interaction.
#[track_caller]
fn check_device(descriptor: &MethodDescriptor, device: &Device) -> Result<(), ConnectError> {
    let expected_state = descriptor.common.device.as_ref().and_then(|d| d.state.as_deref());
    if expected_state.is_some_and(|expected| device.state.as_deref() != Some(expected)) {
        return Err(ConnectError::DeviceInvalidState {
            message: "Passphrase is incorrect".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if device.is_bootloader() {
        if !descriptor.allow_bootloader {
            return Err(ConnectError::DeviceInvalidState {
                message: "Device is in bootloader mode".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        // Bootloader firmware versions are not comparable with the window.
        return Ok(());
    }

    if descriptor.require_bootloader {
        return Err(ConnectError::DeviceInvalidState {
            message: "Device must be in bootloader mode".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if !device.is_initialized()
        && !descriptor.allow_seedless
        && !descriptor.common.allow_seedless_device
    {
        return Err(ConnectError::DeviceNotInitialized {
            message: "Device not initialized".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    check_device_firmware(&descriptor.firmware_range, &device.features)
}
