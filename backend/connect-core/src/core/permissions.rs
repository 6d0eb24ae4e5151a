//! Permissions the user granted, per device path, for the life of the core.

use models::Permission;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct PermissionStore {
    granted: Arc<RwLock<HashMap<String, BTreeSet<Permission>>>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subset of `required` not yet granted for `device`.
    pub async fn missing(&self, device: &str, required: &[Permission]) -> Vec<Permission> {
        let granted = self.granted.read().await;
        let held = granted.get(device);
        required
            .iter()
            .filter(|p| !held.is_some_and(|set| set.contains(p)))
            .copied()
            .collect()
    }

    pub async fn grant(&self, device: &str, permissions: &[Permission]) {
        self.granted
            .write()
            .await
            .entry(device.to_string())
            .or_default()
            .extend(permissions.iter().copied());
    }
}
