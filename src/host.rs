// SessionHost: owner of the process-wide session slot
// Serializes platform callbacks onto one EngineSession and maps results to
// the status codes the JNI layer hands back to the activity.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};

use crate::config::EngineConfig;
use crate::error::{log_session_error, SessionError};
use crate::input::{InputKind, PointerBatch};
use crate::session::{EngineSession, FrameResult, SessionState};
use crate::surface::{HeadlessBackend, RenderBackend};

/// Builds the render backend for each fresh session
pub type BackendFactory = Box<dyn Fn(&EngineConfig) -> Box<dyn RenderBackend> + Send + Sync>;

/// Launch parameters delivered before the first surface exists
#[derive(Debug, Clone, Default, PartialEq)]
struct LaunchParams {
    cache_dir: Option<PathBuf>,
    scale: Option<f32>,
}

/// Process-wide session owner
///
/// The platform layer calls in from its UI and render threads; every call
/// takes the session lock, so a session is only ever driven by one thread
/// at a time. After `teardown` the destroyed session stays in the slot
/// until the next `initialize` replaces it with a fresh one.
pub struct SessionHost {
    session: Mutex<Option<EngineSession>>,
    launch: Mutex<LaunchParams>,
    config_override: Option<EngineConfig>,
    backend_factory: BackendFactory,
}

impl SessionHost {
    /// Host that resolves its config from the cache directory and renders
    /// with the headless backend
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            launch: Mutex::new(LaunchParams::default()),
            config_override: None,
            backend_factory: Box::new(|config: &EngineConfig| {
                Box::new(HeadlessBackend::new(config.surface.max_dimension)) as Box<dyn RenderBackend>
            }),
        }
    }

    /// Use `config` for every session instead of reading the cache directory
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config_override = Some(config);
        self
    }

    pub fn with_backend_factory(mut self, factory: BackendFactory) -> Self {
        self.backend_factory = factory;
        self
    }

    // ========================================================================
    // LOCK HELPER METHODS
    // ========================================================================

    fn lock_session(&self) -> Result<MutexGuard<'_, Option<EngineSession>>, SessionError> {
        self.session.lock().map_err(|_| {
            let err = SessionError::LockPoisoned {
                component: "session".to_string(),
            };
            log_session_error(&err, "lock_session");
            err
        })
    }

    fn lock_launch(&self) -> Result<MutexGuard<'_, LaunchParams>, SessionError> {
        self.launch.lock().map_err(|_| {
            let err = SessionError::LockPoisoned {
                component: "launch_params".to_string(),
            };
            log_session_error(&err, "lock_launch");
            err
        })
    }

    // ========================================================================
    // PLATFORM CALLBACKS
    // ========================================================================

    /// Record the cache directory and display density for the next session
    ///
    /// Called once at process start, before any surface exists.
    pub fn configure(&self, cache_dir: Option<PathBuf>, scale: f32) -> Result<(), SessionError> {
        if !scale.is_finite() || scale <= 0.0 {
            let err = SessionError::InvalidScale { scale };
            log_session_error(&err, "configure");
            return Err(err);
        }

        let mut launch = self.lock_launch()?;
        info!(
            "[Host] Configured cache {:?}, scale {}",
            cache_dir, scale
        );
        *launch = LaunchParams {
            cache_dir,
            scale: Some(scale),
        };
        Ok(())
    }

    /// Attach a surface
    ///
    /// Creates a fresh session when the slot is empty or holds a destroyed
    /// one. A repeat call while `Active` is a size change and resizes the
    /// surface instead of failing. `scale` and `cache_dir` fall back to the
    /// values given to `configure`.
    pub fn initialize(
        &self,
        width: i32,
        height: i32,
        scale: Option<f32>,
        cache_dir: Option<&Path>,
    ) -> Result<(), SessionError> {
        let launch = self.lock_launch()?.clone();
        let cache_dir = cache_dir.or(launch.cache_dir.as_deref());
        let mut slot = self.lock_session()?;

        let needs_fresh = slot
            .as_ref()
            .map_or(true, |session| session.state().is_destroyed());
        if needs_fresh {
            debug!("[Host] Creating session");
            *slot = Some(self.fresh_session(cache_dir));
        }

        let Some(session) = slot.as_mut() else {
            return Err(SessionError::invalid_state("initialize", SessionState::Uninitialized));
        };

        if session.state().is_active() {
            return session.resize(width, height);
        }
        session.initialize(width, height, scale.or(launch.scale), cache_dir)
    }

    pub fn notify_surface_lost(&self) -> Result<(), SessionError> {
        let mut slot = self.lock_session()?;
        match slot.as_mut() {
            Some(session) => session.notify_surface_lost(),
            None => debug!("[Host] Surface loss before any session"),
        }
        Ok(())
    }

    /// Advance one frame of the current session
    pub fn step(&self) -> Result<FrameResult, SessionError> {
        let mut slot = self.lock_session()?;
        match slot.as_mut() {
            Some(session) => session.step(),
            None => {
                let err = SessionError::invalid_state("step", SessionState::Uninitialized);
                log_session_error(&err, "step");
                Err(err)
            }
        }
    }

    /// `step` as a status code: `0` rendered, `1` nothing to render,
    /// negated error code on failure
    pub fn step_code(&self) -> i32 {
        match self.step() {
            Ok(result) => result.code(),
            Err(err) => err.boundary_code(),
        }
    }

    /// Forward one platform input event
    ///
    /// # Errors
    /// `PointerMismatch` when the coordinate arrays differ in length;
    /// `InvalidState` when the session has been destroyed.
    pub fn submit_input(&self, kind: i32, xs: &[f32], ys: &[f32]) -> Result<(), SessionError> {
        let batch = PointerBatch::from_parallel(xs, ys).map_err(|err| {
            log_session_error(&err, "submit_input");
            err
        })?;

        let mut slot = self.lock_session()?;
        match slot.as_mut() {
            Some(session) => session.submit_input(InputKind::from_code(kind), batch),
            None => Ok(()),
        }
    }

    pub fn request_asset(&self, key: &str, path: &Path) -> Result<(), SessionError> {
        let mut slot = self.lock_session()?;
        match slot.as_mut() {
            Some(session) => session.request_asset(key, path),
            None => {
                let err = SessionError::invalid_state("request_asset", SessionState::Uninitialized);
                log_session_error(&err, "request_asset");
                Err(err)
            }
        }
    }

    /// Destroy the current session; a no-op when none was ever created
    ///
    /// `is_terminating` is the platform flag: `0` when the application may
    /// come back, anything else when it is finishing.
    pub fn teardown(&self, is_terminating: i32) -> Result<(), SessionError> {
        let mut slot = self.lock_session()?;
        match slot.as_mut() {
            Some(session) => session.teardown(is_terminating != 0),
            None => Ok(()),
        }
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    /// State of the current session, `None` before the first `initialize`
    pub fn state(&self) -> Result<Option<SessionState>, SessionError> {
        Ok(self.lock_session()?.as_ref().map(EngineSession::state))
    }

    /// Run `f` against the current session, if there is one
    pub fn with_session<R>(&self, f: impl FnOnce(&EngineSession) -> R) -> Result<Option<R>, SessionError> {
        Ok(self.lock_session()?.as_ref().map(f))
    }

    fn fresh_session(&self, cache_dir: Option<&Path>) -> EngineSession {
        let config = match &self.config_override {
            Some(config) => config.clone(),
            None => EngineConfig::resolve(cache_dir),
        };
        let backend = (self.backend_factory)(&config);
        EngineSession::with_backend(config, backend)
    }
}

/// Scale argument from the platform: `0.0` means "not supplied"
///
/// Any other value is passed through so that invalid densities reach
/// validation and fail as `InvalidScale`.
pub fn platform_scale(raw: f32) -> Option<f32> {
    if raw == 0.0 {
        None
    } else {
        Some(raw)
    }
}

impl Default for SessionHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionErrorCodes;

    #[test]
    fn step_before_initialize_reports_invalid_state() {
        let host = SessionHost::new();
        assert_eq!(host.step_code(), -SessionErrorCodes::INVALID_STATE);
        assert_eq!(host.state().unwrap(), None);
    }

    #[test]
    fn initialize_while_active_resizes() {
        let host = SessionHost::new().with_config(EngineConfig::default());
        host.initialize(800, 600, Some(1.0), None).unwrap();
        host.initialize(600, 800, None, None).unwrap();

        let width = host
            .with_session(|s| s.surface_size().map(|size| size.width))
            .unwrap()
            .flatten();
        assert_eq!(width, Some(600));
        assert_eq!(host.state().unwrap(), Some(SessionState::Active));
    }

    #[test]
    fn configure_supplies_default_scale() {
        let host = SessionHost::new().with_config(EngineConfig::default());
        host.configure(None, 2.75).unwrap();
        host.initialize(100, 100, None, None).unwrap();
        let scale = host.with_session(EngineSession::display_scale).unwrap();
        assert_eq!(scale, Some(Some(2.75)));
    }

    #[test]
    fn configure_rejects_bad_scale() {
        let host = SessionHost::new();
        assert!(matches!(
            host.configure(None, -1.0),
            Err(SessionError::InvalidScale { .. })
        ));
    }

    #[test]
    fn mismatched_arrays_are_rejected_before_locking() {
        let host = SessionHost::new();
        let err = host.submit_input(1, &[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err.boundary_code(), -SessionErrorCodes::POINTER_MISMATCH);
    }

    #[test]
    fn teardown_then_initialize_starts_fresh_session() {
        let host = SessionHost::new().with_config(EngineConfig::default());
        host.initialize(100, 100, None, None).unwrap();
        assert_eq!(host.step_code(), 0);
        host.teardown(1).unwrap();
        assert_eq!(host.state().unwrap(), Some(SessionState::Destroyed));
        assert_eq!(host.step_code(), -SessionErrorCodes::INVALID_STATE);

        host.initialize(100, 100, None, None).unwrap();
        assert_eq!(host.with_session(EngineSession::frame_count).unwrap(), Some(0));
    }

    #[test]
    fn platform_scale_only_treats_zero_as_missing() {
        assert_eq!(platform_scale(0.0), None);
        assert_eq!(platform_scale(2.0), Some(2.0));

        let host = SessionHost::new().with_config(EngineConfig::default());
        let err = host
            .initialize(100, 100, platform_scale(-1.0), None)
            .unwrap_err();
        assert_eq!(err.boundary_code(), -SessionErrorCodes::INVALID_SCALE);
        assert!(matches!(
            host.initialize(100, 100, platform_scale(f32::NAN), None),
            Err(SessionError::InvalidScale { .. })
        ));
        assert_eq!(host.state().unwrap(), Some(SessionState::Uninitialized));
    }

    #[test]
    fn teardown_without_session_is_noop() {
        let host = SessionHost::new();
        host.teardown(0).unwrap();
        host.notify_surface_lost().unwrap();
        assert_eq!(host.state().unwrap(), None);
    }
}
