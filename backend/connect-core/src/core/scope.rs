//! Calls issued on behalf of one client.
//!
//! A scope counts in-flight calls per device (or `None` for calls that use
//! no device). When the client goes away, [`crate::Core::cancel_scope`]
//! cancels the UI requests of exactly those devices.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct CallScope {
    inflight: Arc<Mutex<HashMap<Option<String>, usize>>>,
    closed: Arc<AtomicBool>,
}

impl CallScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call against `device` until the returned entry drops.
    pub fn enter(&self, device: Option<&str>) -> ScopeEntry {
        let key = device.map(str::to_string);
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *inflight.entry(key.clone()).or_default() += 1;

        ScopeEntry {
            scope: self.clone(),
            key,
        }
    }

    /// Devices with at least one call still in flight.
    pub fn devices(&self) -> Vec<Option<String>> {
        self.inflight
            .lock()
            .map(|inflight| inflight.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Mark the client as gone. Calls entering afterwards are refused.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.inflight
            .lock()
            .map(|inflight| inflight.is_empty())
            .unwrap_or(true)
    }
}

pub struct ScopeEntry {
    scope: CallScope,
    key: Option<String>,
}

impl Drop for ScopeEntry {
    fn drop(&mut self) {
        let mut inflight = self
            .scope
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(count) = inflight.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                inflight.remove(&self.key);
            }
        }
    }
}
