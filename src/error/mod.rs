// Error types for the xo native engine boundary
//
// This module defines the session error type and the numeric error codes
// reported across the JNI boundary.

mod session;

pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Numeric code plus human-readable message for an error
///
/// The JNI layer only sees integers, so every error that can cross it
/// carries a stable code.
pub trait ErrorCode {
    fn code(&self) -> i32;

    fn message(&self) -> String;
}
