// xo native engine core
// Surface lifecycle, input funnel and background asset loading behind a JNI boundary

// Module declarations
pub mod assets;
pub mod config;
pub mod error;
pub mod host;
pub mod input;
pub mod persistence;
pub mod session;
pub mod surface;
pub mod telemetry;

#[cfg(target_os = "android")]
mod android;

// Re-exports for convenience
pub use config::EngineConfig;
pub use error::{ErrorCode, SessionError, SessionErrorCodes};
pub use host::SessionHost;
pub use input::{InputKind, Pointer, PointerBatch};
pub use session::{EngineSession, FrameResult, SessionState};

/// Install the process-wide log subscriber
///
/// Safe to call more than once; later calls are ignored.
#[cfg(target_os = "android")]
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    match tracing_android::layer("xo") {
        Ok(layer) => {
            let _ = tracing_subscriber::registry().with(layer).try_init();
        }
        Err(err) => eprintln!("xo: android log layer unavailable: {}", err),
    }
}

#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// JNI_OnLoad is called when the native library is loaded by Android
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn JNI_OnLoad(_vm: jni::JavaVM, _reserved: *mut std::ffi::c_void) -> jni::sys::jint {
    init_logging();
    log::info!("JNI_OnLoad: xo native library loaded");
    jni::sys::JNI_VERSION_1_6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
