//! One call per device at a time.

use crate::error::ConnectError;

use common::ErrorLocation;

use std::collections::HashSet;
use std::panic::Location;
use std::sync::{Arc, Mutex};

use log::debug;

/// Device paths with a call in flight.
#[derive(Clone, Default)]
pub struct SessionSlots {
    busy: Arc<Mutex<HashSet<String>>>,
}

impl SessionSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path`. Fails with `Device_CallInProgress` while another call
    /// holds it. The slot is released when the guard drops.
    #[track_caller]
    pub fn try_acquire(&self, path: &str) -> Result<SessionGuard, ConnectError> {
        let mut busy = self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !busy.insert(path.to_string()) {
            return Err(ConnectError::DeviceCallInProgress {
                message: format!("Device call in progress: {path}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        debug!("Session slot taken for {path}");

        Ok(SessionGuard {
            slots: self.clone(),
            path: path.to_string(),
        })
    }

    pub fn is_busy(&self, path: &str) -> bool {
        self.busy
            .lock()
            .map(|busy| busy.contains(path))
            .unwrap_or(false)
    }
}

pub struct SessionGuard {
    slots: SessionSlots,
    path: String,
}

impl SessionGuard {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut busy = self
            .slots
            .busy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        busy.remove(&self.path);
        debug!("Session slot released for {}", self.path);
    }
}
