//! Cross-cutting primitives shared by every crate in the workspace.
//!
//! Nothing in here knows about devices, methods or coins. It only provides
//! the error-location plumbing used by every error enum and a holder for
//! secrets (PIN, passphrase) that must never reach a log line.

pub mod error;
pub mod redacted_secret;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_secret::RedactedSecret;

#[cfg(test)]
mod tests;
