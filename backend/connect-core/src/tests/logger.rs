use crate::error::CoreError;
use crate::logger::{LOG_FILE_NAME, build_dispatch, initialize};

use std::path::Path;

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Repeated initialization is harmless.
///
/// **WHY THIS MATTERS**: Embedders and test harnesses may both try to set up logging.
/// A second call must not fail or panic on the already-installed global logger.
///
/// **BUG THIS CATCHES**: Would catch the guard being removed and `apply()` erroring
/// on the second call.
#[test]
#[serial]
fn given_logger_initialized_when_initialized_again_then_ok() {
    // GIVEN
    let dir = TempDir::new().unwrap();
    let first = initialize(dir.path());

    // WHEN
    let second = initialize(dir.path());

    // THEN
    assert!(second.is_ok());
    // The first call may lose to another test binary's logger; either way it
    // must not panic.
    let _ = first;
}

#[test]
#[serial]
fn given_writable_dir_when_building_dispatch_then_log_file_created() {
    let dir = TempDir::new().unwrap();

    let dispatch = build_dispatch(dir.path());

    assert!(dispatch.is_ok());
    assert!(dir.path().join(LOG_FILE_NAME).exists());
}

#[test]
#[serial]
fn given_unwritable_dir_when_building_dispatch_then_logger_error() {
    let result = build_dispatch(Path::new("/dev/null/invalid-path"));

    match result {
        Err(CoreError::Logger { message, .. }) => {
            assert!(message.contains("Failed to create log file"), "got: {message}");
        }
        Err(other) => panic!("expected Logger error, got {other}"),
        Ok(_) => panic!("expected Logger error, got a dispatch"),
    }
}
