//! Pending "waiting for the user" futures.
//!
//! At most one promise is pending per `(event, device)` key. Creating a
//! promise for a key that is already pending replaces it, and the replaced
//! waiter observes [`UiOutcome::Cancelled`]. Resolving a key that has no
//! pending promise is logged and dropped.

use models::UiEvent;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone, PartialEq)]
pub enum UiOutcome {
    Resolved(Value),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UiKey {
    pub event: UiEvent,
    pub device: Option<String>,
}

impl UiKey {
    pub fn new(event: UiEvent, device: Option<&str>) -> Self {
        Self {
            event,
            device: device.map(str::to_string),
        }
    }
}

struct PendingPromise {
    sender: oneshot::Sender<UiOutcome>,
    request: Value,
}

/// A pending UI answer. Dropping it without waiting is allowed.
#[derive(Debug)]
pub struct UiPromise {
    key: UiKey,
    receiver: oneshot::Receiver<UiOutcome>,
}

impl UiPromise {
    pub fn key(&self) -> &UiKey {
        &self.key
    }

    /// Wait for the answer. A broker that goes away counts as cancellation.
    pub async fn wait(self) -> UiOutcome {
        self.receiver.await.unwrap_or(UiOutcome::Cancelled)
    }
}

#[derive(Clone, Default)]
pub struct UiPromiseBroker {
    pending: Arc<Mutex<HashMap<UiKey, PendingPromise>>>,
}

impl UiPromiseBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a promise for `(event, device)`. `request` is the payload of
    /// the UI request that asked for it.
    pub async fn create(&self, event: UiEvent, device: Option<&str>, request: Value) -> UiPromise {
        let key = UiKey::new(event, device);
        let (sender, receiver) = oneshot::channel();

        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.insert(key.clone(), PendingPromise { sender, request }) {
            debug!("Replacing pending {} promise for {:?}", event, key.device);
            let _ = previous.sender.send(UiOutcome::Cancelled);
        }

        UiPromise { key, receiver }
    }

    /// Resolve the promise for `(event, device)`. Returns whether one was
    /// pending.
    pub async fn resolve(&self, event: UiEvent, device: Option<&str>, payload: Value) -> bool {
        let key = UiKey::new(event, device);
        let entry = self.pending.lock().await.remove(&key);
        match entry {
            Some(promise) => {
                let _ = promise.sender.send(UiOutcome::Resolved(payload));
                true
            }
            None => {
                warn!("Dropping unsolicited {} response for {:?}", event, key.device);
                false
            }
        }
    }

    /// Resolve the single pending promise of type `event`, whatever device
    /// it belongs to. Ambiguous or missing matches are dropped.
    pub async fn resolve_any(&self, event: UiEvent, payload: Value) -> bool {
        let mut pending = self.pending.lock().await;
        let keys: Vec<UiKey> = pending.keys().filter(|k| k.event == event).cloned().collect();

        match keys.as_slice() {
            [key] => match pending.remove(key) {
                Some(promise) => {
                    let _ = promise.sender.send(UiOutcome::Resolved(payload));
                    true
                }
                None => false,
            },
            [] => {
                warn!("Dropping unsolicited {} response", event);
                false
            }
            _ => {
                warn!(
                    "Dropping {} response: {} devices are waiting, device path required",
                    event,
                    keys.len()
                );
                false
            }
        }
    }

    /// Cancel every promise pending for `device`. Returns how many.
    pub async fn cancel_device(&self, device: &str) -> usize {
        let mut pending = self.pending.lock().await;
        let keys: Vec<UiKey> = pending
            .keys()
            .filter(|k| k.device.as_deref() == Some(device))
            .cloned()
            .collect();
        cancel_keys(&mut pending, &keys)
    }

    /// Cancel every promise not bound to a device.
    pub async fn cancel_unbound(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let keys: Vec<UiKey> = pending.keys().filter(|k| k.device.is_none()).cloned().collect();
        cancel_keys(&mut pending, &keys)
    }

    pub async fn cancel_all(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let keys: Vec<UiKey> = pending.keys().cloned().collect();
        cancel_keys(&mut pending, &keys)
    }

    pub async fn is_pending(&self, event: UiEvent, device: Option<&str>) -> bool {
        self.pending.lock().await.contains_key(&UiKey::new(event, device))
    }

    /// Snapshot of pending keys with their originating request payloads.
    pub async fn pending_requests(&self) -> Vec<(UiKey, Value)> {
        self.pending
            .lock()
            .await
            .iter()
            .map(|(key, promise)| (key.clone(), promise.request.clone()))
            .collect()
    }
}

fn cancel_keys(pending: &mut HashMap<UiKey, PendingPromise>, keys: &[UiKey]) -> usize {
    let mut cancelled = 0;
    for key in keys {
        if let Some(promise) = pending.remove(key) {
            let _ = promise.sender.send(UiOutcome::Cancelled);
            cancelled += 1;
        }
    }
    cancelled
}
