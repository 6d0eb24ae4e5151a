use crate::core::{CallScope, PermissionStore, SessionSlots};

use models::Permission;

#[test]
fn given_slot_taken_when_guard_dropped_then_device_free_again() {
    // GIVEN
    let slots = SessionSlots::new();
    let guard = slots.try_acquire("usb-1").unwrap();
    assert!(slots.is_busy("usb-1"));
    assert!(!slots.is_busy("usb-2"));

    // WHEN
    let second = slots.try_acquire("usb-1");
    drop(guard);

    // THEN
    assert_eq!(second.err().map(|e| e.code().to_string()).as_deref(), Some("Device_CallInProgress"));
    assert!(!slots.is_busy("usb-1"));
    assert!(slots.try_acquire("usb-1").is_ok());
}

/// **VALUE**: A scope lists a device only while one of its calls is in flight there.
///
/// **WHY THIS MATTERS**: When a client leaves, its devices' prompts are cancelled. A
/// stale entry would cancel prompts that now belong to another client's call.
///
/// **BUG THIS CATCHES**: Would catch entries surviving their guard, or the count for
/// a device dropping to zero while a second call on it is still running.
#[test]
fn given_scope_entries_when_dropped_then_devices_cleared() {
    // GIVEN
    let scope = CallScope::new();
    let first = scope.enter(Some("usb-1"));
    let second = scope.enter(Some("usb-1"));
    let unbound = scope.enter(None);

    let mut devices = scope.devices();
    devices.sort();
    assert_eq!(devices, vec![None, Some("usb-1".to_string())]);

    // WHEN
    drop(first);
    drop(unbound);

    // THEN
    assert_eq!(scope.devices(), vec![Some("usb-1".to_string())]);
    drop(second);
    assert!(scope.is_empty());
}

#[test]
fn given_scope_when_closed_then_clones_see_it() {
    let scope = CallScope::new();
    let clone = scope.clone();

    clone.close();

    assert!(scope.is_closed());
}

#[tokio::test]
async fn given_partial_grant_when_checked_then_only_rest_missing() {
    let store = PermissionStore::new();

    store.grant("usb-1", &[Permission::Read]).await;

    assert_eq!(
        store.missing("usb-1", &[Permission::Read, Permission::Write]).await,
        vec![Permission::Write]
    );
    assert_eq!(
        store.missing("usb-2", &[Permission::Read]).await,
        vec![Permission::Read]
    );
}
