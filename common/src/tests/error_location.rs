use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures the file, line and column of the call.
///
/// **WHY THIS MATTERS**: Every error variant in the workspace carries an `ErrorLocation`.
/// If capture breaks, a `Runtime` failure in the typed-data loop cannot be told apart
/// from one raised in the firmware uploader.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN/WHEN: Capturing the current location
    let location = ErrorLocation::from(Location::caller());

    // THEN: File, line and column are populated
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert!(location.line > 0, "Should capture line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies the `[file:line:column]` display format that every error message ends with.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    let location = ErrorLocation {
        file: "src/device/commands.rs",
        line: 42,
        column: 7,
    };

    assert_eq!(location.to_string(), "[src/device/commands.rs:42:7]");
}

/// **VALUE**: Verifies that `#[track_caller]` helpers report their caller, not themselves.
///
/// **BUG THIS CATCHES**: Would catch the attribute being dropped from an error constructor,
/// which makes every error point at the constructor body.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    let first = capture_location();
    let second = capture_location();

    assert_eq!(first.file, second.file, "Should have same file");
    assert_eq!(first.line + 1, second.line, "Lines should be sequential");
}
