// Session error types and constants

use crate::error::ErrorCode;
use crate::session::SessionState;
use log::error;
use std::fmt;

/// Session error code constants reported across the JNI boundary
///
/// The boundary reports failures as the negated code (`render()` returns
/// `-3001` for an invalid state), so these values must stay stable.
///
/// Error code range: 3001-3007
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// Operation is not legal in the current session state
    pub const INVALID_STATE: i32 = 3001;

    /// Surface or graphics resource allocation failed
    pub const RESOURCE: i32 = 3002;

    /// Surface dimensions were zero or negative
    pub const INVALID_SURFACE: i32 = 3003;

    /// Display scale was not a positive finite number
    pub const INVALID_SCALE: i32 = 3004;

    /// Pointer coordinate arrays have different lengths
    pub const POINTER_MISMATCH: i32 = 3005;

    /// Snapshot could not be written to or read from the cache directory
    pub const PERSISTENCE: i32 = 3006;

    /// Mutex guarding the session slot was poisoned
    pub const LOCK_POISONED: i32 = 3007;
}

/// Log a session error with structured context
///
/// Logs the numeric code, the call site and the message. Never panics.
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=EngineSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session-related errors
///
/// `InvalidState` is non-fatal: the caller should treat the session as
/// needing reinitialization. `Resource` leaves the session in the state it
/// was in before the failed call, so the call can be retried.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Operation not legal in the current state
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Surface/graphics resource allocation failed
    Resource { reason: String },

    /// Surface dimensions must both be positive
    InvalidSurface { width: i32, height: i32 },

    /// Display scale must be positive and finite
    InvalidScale { scale: f32 },

    /// Parallel coordinate arrays differ in length
    PointerMismatch { xs: usize, ys: usize },

    /// Snapshot persistence failed
    Persistence { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::InvalidState { .. } => SessionErrorCodes::INVALID_STATE,
            SessionError::Resource { .. } => SessionErrorCodes::RESOURCE,
            SessionError::InvalidSurface { .. } => SessionErrorCodes::INVALID_SURFACE,
            SessionError::InvalidScale { .. } => SessionErrorCodes::INVALID_SCALE,
            SessionError::PointerMismatch { .. } => SessionErrorCodes::POINTER_MISMATCH,
            SessionError::Persistence { .. } => SessionErrorCodes::PERSISTENCE,
            SessionError::LockPoisoned { .. } => SessionErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::InvalidState { operation, state } => {
                format!("{} is not valid while the session is {}", operation, state)
            }
            SessionError::Resource { reason } => {
                format!("Resource allocation failed: {}", reason)
            }
            SessionError::InvalidSurface { width, height } => {
                format!(
                    "Surface dimensions must be positive (got {}x{})",
                    width, height
                )
            }
            SessionError::InvalidScale { scale } => {
                format!("Display scale must be positive and finite (got {})", scale)
            }
            SessionError::PointerMismatch { xs, ys } => {
                format!(
                    "Pointer arrays differ in length: {} x values, {} y values",
                    xs, ys
                )
            }
            SessionError::Persistence { reason } => {
                format!("Session snapshot persistence failed: {}", reason)
            }
            SessionError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl SessionError {
    /// Shorthand for an `InvalidState` error
    pub fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        SessionError::InvalidState { operation, state }
    }

    /// Status code reported to the platform layer (always negative)
    pub fn boundary_code(&self) -> i32 {
        -self.code()
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Persistence {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Persistence {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_codes() {
        assert_eq!(
            SessionError::invalid_state("step", SessionState::SurfaceLost).code(),
            SessionErrorCodes::INVALID_STATE
        );
        assert_eq!(
            SessionError::Resource {
                reason: "test".to_string()
            }
            .code(),
            SessionErrorCodes::RESOURCE
        );
        assert_eq!(
            SessionError::InvalidSurface {
                width: 0,
                height: 10
            }
            .code(),
            SessionErrorCodes::INVALID_SURFACE
        );
        assert_eq!(
            SessionError::InvalidScale { scale: -1.0 }.code(),
            SessionErrorCodes::INVALID_SCALE
        );
        assert_eq!(
            SessionError::PointerMismatch { xs: 2, ys: 1 }.code(),
            SessionErrorCodes::POINTER_MISMATCH
        );
        assert_eq!(
            SessionError::Persistence {
                reason: "test".to_string()
            }
            .code(),
            SessionErrorCodes::PERSISTENCE
        );
        assert_eq!(
            SessionError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            SessionErrorCodes::LOCK_POISONED
        );
    }

    #[test]
    fn test_session_error_messages() {
        let err = SessionError::invalid_state("step", SessionState::SurfaceLost);
        assert_eq!(
            err.message(),
            "step is not valid while the session is surface-lost"
        );

        let err = SessionError::InvalidSurface {
            width: 0,
            height: 600,
        };
        assert_eq!(
            err.message(),
            "Surface dimensions must be positive (got 0x600)"
        );

        let err = SessionError::PointerMismatch { xs: 3, ys: 2 };
        assert!(err.message().contains("3 x values"));
    }

    #[test]
    fn test_boundary_code_is_negative() {
        let err = SessionError::invalid_state("teardown", SessionState::Destroyed);
        assert_eq!(err.boundary_code(), -3001);
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::InvalidScale { scale: 0.0 };
        let display = format!("{}", err);
        assert!(display.contains("SessionError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("disk full");
        let err: SessionError = io_err.into();
        match err {
            SessionError::Persistence { reason } => assert!(reason.contains("disk full")),
            _ => panic!("Expected Persistence"),
        }
    }
}
