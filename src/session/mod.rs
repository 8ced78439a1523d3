//! EngineSession: lifecycle state and input funnel for one rendering surface.
//!
//! One owner thread drives a session through `initialize`, `step`,
//! `submit_input`, `notify_surface_lost` and `teardown`. Nothing in here
//! blocks: file reads happen on the session's asset worker and are picked
//! up by the next `step`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::assets::{self, AssetLoader, AssetRequest, AssetStore};
use crate::config::EngineConfig;
use crate::error::{log_session_error, SessionError};
use crate::input::{InputEvent, InputKind, InputQueue, Pointer, PointerBatch, PushOutcome};
use crate::persistence::{self, SessionSnapshot, SnapshotAsset};
use crate::surface::{BackendStats, FrameInput, HeadlessBackend, RenderBackend, SurfaceSize};
use crate::telemetry::{LifecyclePhase, MetricEvent, SessionTelemetry};

mod state;

pub use state::SessionState;

/// Outcome of one frame step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameResult {
    /// A frame was presented
    Rendered,
    /// Nothing changed since the last presented frame
    NothingToRender,
}

impl FrameResult {
    /// Status code reported to the platform layer
    pub fn code(&self) -> i32 {
        match self {
            FrameResult::Rendered => 0,
            FrameResult::NothingToRender => 1,
        }
    }
}

/// One rendering/interaction session bound to a surface lifetime
pub struct EngineSession {
    config: EngineConfig,
    state: SessionState,
    surface: Option<SurfaceSize>,
    display_scale: Option<f32>,
    cache_dir: Option<PathBuf>,
    backend: Box<dyn RenderBackend>,
    loader: Option<AssetLoader>,
    assets: AssetStore,
    requested: BTreeMap<String, PathBuf>,
    input: InputQueue,
    pointers: Vec<Pointer>,
    last_pointer_count: usize,
    frame_count: u64,
    needs_redraw: bool,
    telemetry: SessionTelemetry,
}

impl EngineSession {
    /// Create an uninitialized session with the headless backend
    pub fn new(config: EngineConfig) -> Self {
        let backend = Box::new(HeadlessBackend::new(config.surface.max_dimension));
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: EngineConfig, backend: Box<dyn RenderBackend>) -> Self {
        let input = InputQueue::new(config.input.queue_capacity);
        let telemetry = SessionTelemetry::new(&config.telemetry);
        Self {
            config,
            state: SessionState::Uninitialized,
            surface: None,
            display_scale: None,
            cache_dir: None,
            backend,
            loader: None,
            assets: AssetStore::new(),
            requested: BTreeMap::new(),
            input,
            pointers: Vec::new(),
            last_pointer_count: 0,
            frame_count: 0,
            needs_redraw: false,
            telemetry,
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Attach a surface and enter `Active`
    ///
    /// Valid from `Uninitialized` (first attach: starts the asset worker and
    /// restores any snapshot in the cache directory) and from `SurfaceLost`
    /// (resume: re-attaches without rebuilding session state).
    ///
    /// # Errors
    /// - `InvalidState` when `Active` or `Destroyed`
    /// - `InvalidSurface` / `InvalidScale` for bad parameters
    /// - `Resource` when the surface cannot be allocated; the session keeps
    ///   its previous state and the call may be retried
    pub fn initialize(
        &mut self,
        width: i32,
        height: i32,
        scale: Option<f32>,
        cache_dir: Option<&Path>,
    ) -> Result<(), SessionError> {
        const OP: &str = "initialize";
        if !self.state.can_initialize() {
            let err = SessionError::invalid_state(OP, self.state);
            return Err(self.fail(OP, err));
        }

        let size = SurfaceSize::from_platform(width, height).map_err(|err| self.fail(OP, err))?;
        let scale = validate_scale(scale).map_err(|err| self.fail(OP, err))?;
        let resuming = self.state == SessionState::SurfaceLost;

        let snapshot = if resuming {
            None
        } else {
            self.read_snapshot(cache_dir)
        };
        let attach_scale = scale
            .or(self.display_scale)
            .or_else(|| snapshot.as_ref().and_then(|(_, snap)| snap.display_scale))
            .unwrap_or(1.0);

        self.backend
            .attach(size, attach_scale)
            .map_err(|err| self.fail(OP, err))?;

        if self.loader.is_none() {
            match AssetLoader::spawn(&self.config.assets) {
                Ok(loader) => self.loader = Some(loader),
                Err(err) => {
                    self.backend.release_surface();
                    return Err(self.fail(OP, err));
                }
            }
        }

        self.adopt_cache_dir(cache_dir);
        self.surface = Some(size);
        if scale.is_some() {
            self.display_scale = scale;
        }
        self.state = SessionState::Active;
        self.needs_redraw = true;

        if resuming {
            info!(
                "[Session] Resurfaced at {}x{}",
                size.width, size.height
            );
            self.telemetry.record_phase(LifecyclePhase::Resurfaced);
        } else {
            info!(
                "[Session] Initialized {}x{} (scale {:?}, cache {:?})",
                size.width, size.height, self.display_scale, self.cache_dir
            );
            self.telemetry.record_phase(LifecyclePhase::Initialized);
            if let Some((path, snapshot)) = snapshot {
                self.restore_snapshot(&path, snapshot);
            }
        }

        Ok(())
    }

    /// Change the size of the attached surface
    ///
    /// # Errors
    /// `InvalidState` unless `Active`; `InvalidSurface` or `Resource` as for
    /// `initialize`. On error the previous surface stays attached.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<(), SessionError> {
        const OP: &str = "resize";
        if !self.state.is_active() {
            let err = SessionError::invalid_state(OP, self.state);
            return Err(self.fail(OP, err));
        }

        let size = SurfaceSize::from_platform(width, height).map_err(|err| self.fail(OP, err))?;
        if self.surface == Some(size) {
            return Ok(());
        }

        self.backend.resize(size).map_err(|err| self.fail(OP, err))?;
        self.surface = Some(size);
        self.needs_redraw = true;
        debug!("[Session] Resized to {}x{}", size.width, size.height);
        self.telemetry.record_phase(LifecyclePhase::Resized);
        Ok(())
    }

    /// Release surface-bound resources after the platform invalidated them
    ///
    /// No-op outside `Active`: surface loss can race with teardown.
    pub fn notify_surface_lost(&mut self) {
        if !self.state.is_active() {
            debug!(
                "[Session] Surface loss ignored while {}",
                self.state
            );
            return;
        }

        self.backend.release_surface();
        let discarded = self.input.clear();
        self.pointers.clear();
        self.state = SessionState::SurfaceLost;

        info!(
            "[Session] Surface lost; discarded {} pending input events",
            discarded
        );
        self.telemetry.record_phase(LifecyclePhase::SurfaceLost);
    }

    /// Destroy the session
    ///
    /// `is_terminating == false` means the application may come back: the
    /// resumable state is written to the cache directory. `true` skips that
    /// work and removes any stale snapshot. The session is `Destroyed` after
    /// this call even when persisting fails; the failure is still returned.
    pub fn teardown(&mut self, is_terminating: bool) -> Result<(), SessionError> {
        const OP: &str = "teardown";
        if self.state.is_destroyed() {
            let err = SessionError::invalid_state(OP, self.state);
            return Err(self.fail(OP, err));
        }

        if let Some(mut loader) = self.loader.take() {
            loader.shutdown(self.config.assets.shutdown_grace());
        }

        let persisted = if is_terminating {
            self.discard_snapshot()
        } else {
            self.persist_snapshot()
        };

        self.backend.release_surface();
        self.input.clear();
        self.pointers.clear();
        self.assets.clear();
        self.requested.clear();
        self.state = SessionState::Destroyed;

        let phase = if is_terminating {
            LifecyclePhase::Terminated
        } else {
            LifecyclePhase::Suspended
        };
        info!("[Session] Torn down ({:?})", phase);
        self.telemetry.record_phase(phase);

        persisted.map_err(|err| self.fail(OP, err))
    }

    // ========================================================================
    // FRAME + INPUT
    // ========================================================================

    /// Advance one frame
    ///
    /// Polls finished asset loads, applies queued input, uploads textures
    /// the backend is missing and presents a frame if anything changed.
    ///
    /// # Errors
    /// `InvalidState` unless `Active`; `Resource` if the backend fails, in
    /// which case the next step retries the frame.
    pub fn step(&mut self) -> Result<FrameResult, SessionError> {
        const OP: &str = "step";
        if !self.state.is_active() {
            let err = SessionError::invalid_state(OP, self.state);
            return Err(self.fail(OP, err));
        }

        let started = Instant::now();
        let mut dirty = std::mem::take(&mut self.needs_redraw);
        dirty |= self.collect_assets();
        dirty |= self.dispatch_input();

        match self.upload_textures() {
            Ok(uploaded) => dirty |= uploaded > 0,
            Err(err) => {
                self.needs_redraw = true;
                return Err(self.fail(OP, err));
            }
        }

        if !dirty {
            return Ok(FrameResult::NothingToRender);
        }

        let frame = FrameInput {
            frame_index: self.frame_count,
            pointers: &self.pointers,
        };
        if let Err(err) = self.backend.present(&frame) {
            self.needs_redraw = true;
            return Err(self.fail(OP, err));
        }
        self.frame_count += 1;

        let elapsed = started.elapsed();
        self.telemetry.record_frame(elapsed);
        let budget = Duration::from_millis(self.config.surface.frame_budget_ms);
        if elapsed > budget {
            warn!(
                "[Session] Frame {} took {:?} (budget {:?})",
                self.frame_count, elapsed, budget
            );
        }

        Ok(FrameResult::Rendered)
    }

    /// Queue one pointer batch for the next step
    ///
    /// Dropped without error while `Uninitialized` or `SurfaceLost`; input
    /// arriving around surface transitions is expected. Batches longer than
    /// `input.max_pointers` are truncated.
    ///
    /// # Errors
    /// `InvalidState` once the session is `Destroyed`.
    pub fn submit_input(
        &mut self,
        kind: InputKind,
        mut batch: PointerBatch,
    ) -> Result<(), SessionError> {
        const OP: &str = "submit_input";
        match self.state {
            SessionState::Active => {}
            SessionState::Uninitialized | SessionState::SurfaceLost => {
                debug!(
                    "[Session] Dropped {:?} input ({} pointers) while {}",
                    kind,
                    batch.len(),
                    self.state
                );
                return Ok(());
            }
            SessionState::Destroyed => {
                let err = SessionError::invalid_state(OP, self.state);
                return Err(self.fail(OP, err));
            }
        }

        let dropped = batch.truncate(self.config.input.max_pointers);
        if dropped > 0 {
            warn!(
                "[Session] Input batch exceeded {} pointers; dropped {}",
                self.config.input.max_pointers, dropped
            );
        }

        if self.input.push(InputEvent::new(kind, batch)) == PushOutcome::DroppedOldest {
            warn!(
                "[Session] Input queue full ({}); oldest event discarded",
                self.config.input.queue_capacity
            );
        }
        Ok(())
    }

    /// Load a file in the background and make it available as `key`
    ///
    /// Relative paths are resolved against the cache directory.
    ///
    /// # Errors
    /// `InvalidState` unless `Active` or `SurfaceLost`.
    pub fn request_asset(
        &mut self,
        key: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<(), SessionError> {
        const OP: &str = "request_asset";
        if !matches!(
            self.state,
            SessionState::Active | SessionState::SurfaceLost
        ) {
            let err = SessionError::invalid_state(OP, self.state);
            return Err(self.fail(OP, err));
        }

        let path = assets::resolve_path(path.as_ref(), self.cache_dir.as_deref());
        self.queue_asset(key.into(), path);
        Ok(())
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Size of the most recently attached surface
    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.surface
    }

    pub fn display_scale(&self) -> Option<f32> {
        self.display_scale
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Pointer count of the last batch dispatched by `step`
    pub fn last_pointer_count(&self) -> usize {
        self.last_pointer_count
    }

    /// Pointers currently in contact, as of the last step
    pub fn active_pointers(&self) -> &[Pointer] {
        &self.pointers
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Asset loads requested but not yet picked up by a step
    pub fn pending_assets(&self) -> usize {
        self.loader.as_ref().map_or(0, AssetLoader::in_flight)
    }

    pub fn asset(&self, key: &str) -> Option<&[u8]> {
        self.assets.get(key).map(|asset| asset.bytes.as_slice())
    }

    pub fn asset_failure(&self, key: &str) -> Option<&str> {
        self.assets.failure(key)
    }

    pub fn backend_stats(&self) -> BackendStats {
        self.backend.stats()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &SessionTelemetry {
        &self.telemetry
    }

    // ========================================================================
    // PRIVATE HELPERS
    // ========================================================================

    /// Log and record an error before handing it back to the caller
    fn fail(&mut self, context: &'static str, err: SessionError) -> SessionError {
        log_session_error(&err, context);
        self.telemetry.record_error(&err, context);
        err
    }

    fn adopt_cache_dir(&mut self, cache_dir: Option<&Path>) {
        match (self.cache_dir.as_deref(), cache_dir) {
            (None, Some(dir)) => self.cache_dir = Some(dir.to_path_buf()),
            (Some(current), Some(dir)) if current != dir => {
                debug!(
                    "[Session] Keeping cache directory {:?}; ignoring {:?}",
                    current, dir
                );
            }
            _ => {}
        }
    }

    fn queue_asset(&mut self, key: String, path: PathBuf) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        self.requested.insert(key.clone(), path.clone());
        loader.request(AssetRequest { key, path });
    }

    fn collect_assets(&mut self) -> bool {
        let completions = match self.loader.as_mut() {
            Some(loader) => loader.poll(),
            None => return false,
        };

        let mut changed = false;
        for completion in completions {
            match &completion.result {
                Ok(bytes) => self.telemetry.publish(MetricEvent::AssetLoaded {
                    key: completion.key.clone(),
                    bytes: bytes.len(),
                }),
                Err(reason) => {
                    warn!(
                        "[Session] Asset '{}' failed to load from {:?}: {}",
                        completion.key, completion.path, reason
                    );
                    self.requested.remove(&completion.key);
                    self.telemetry.publish(MetricEvent::AssetFailed {
                        key: completion.key.clone(),
                        reason: reason.clone(),
                    });
                }
            }
            changed |= self.assets.apply(completion);
        }
        changed
    }

    fn dispatch_input(&mut self) -> bool {
        let events: Vec<InputEvent> = self.input.drain().collect();
        if events.is_empty() {
            return false;
        }

        for event in events {
            self.last_pointer_count = event.batch.len();
            if event.kind.ends_contact() {
                self.pointers.clear();
            } else {
                self.pointers = event.batch.points().to_vec();
            }
            self.telemetry
                .record_input(event.kind.code(), event.batch.len());
        }
        true
    }

    fn upload_textures(&mut self) -> Result<usize, SessionError> {
        let mut uploaded = 0;
        for (key, asset) in self.assets.iter() {
            if !self.backend.has_texture(key) {
                self.backend.upload(key, &asset.bytes)?;
                uploaded += 1;
            }
        }
        Ok(uploaded)
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        self.cache_dir
            .as_deref()
            .map(|dir| persistence::snapshot_path(dir, &self.config.persistence.snapshot_file))
    }

    /// Load the snapshot a first `initialize` would restore
    ///
    /// Unreadable snapshots are reported and deleted. The file itself is
    /// only consumed once the surface is attached.
    fn read_snapshot(&mut self, cache_dir: Option<&Path>) -> Option<(PathBuf, SessionSnapshot)> {
        const OP: &str = "restore_snapshot";
        let dir = self.cache_dir.as_deref().or(cache_dir)?;
        let path = persistence::snapshot_path(dir, &self.config.persistence.snapshot_file);

        match persistence::load(&path) {
            Ok(Some(snapshot)) => Some((path, snapshot)),
            Ok(None) => None,
            Err(err) => {
                self.fail(OP, err);
                if let Err(err) = persistence::remove(&path) {
                    self.fail(OP, err);
                }
                None
            }
        }
    }

    fn restore_snapshot(&mut self, path: &Path, snapshot: SessionSnapshot) {
        const OP: &str = "restore_snapshot";
        self.frame_count = snapshot.frame_count;
        if self.display_scale.is_none() {
            self.display_scale = snapshot.display_scale;
        }
        let asset_count = snapshot.assets.len();
        for asset in snapshot.assets {
            self.queue_asset(asset.key, asset.path);
        }
        if let Err(err) = persistence::remove(path) {
            self.fail(OP, err);
        }

        info!(
            "[Session] Restored snapshot: frame {}, {} assets queued",
            self.frame_count, asset_count
        );
        self.telemetry.record_phase(LifecyclePhase::Restored);
    }

    fn persist_snapshot(&self) -> Result<(), SessionError> {
        let (Some(path), Some(surface)) = (self.snapshot_path(), self.surface) else {
            debug!("[Session] Nothing to persist (no cache directory or surface)");
            return Ok(());
        };

        let assets = self
            .requested
            .iter()
            .map(|(key, path)| SnapshotAsset {
                key: key.clone(),
                path: path.clone(),
            })
            .collect();
        let snapshot = SessionSnapshot::new(surface, self.display_scale, self.frame_count, assets);
        persistence::save(&path, &snapshot)?;
        info!("[Session] Snapshot written to {:?}", path);
        Ok(())
    }

    fn discard_snapshot(&self) -> Result<(), SessionError> {
        match self.snapshot_path() {
            Some(path) => persistence::remove(&path).map(|removed| {
                if removed {
                    debug!("[Session] Removed stale snapshot {:?}", path);
                }
            }),
            None => Ok(()),
        }
    }
}

fn validate_scale(scale: Option<f32>) -> Result<Option<f32>, SessionError> {
    match scale {
        Some(s) if !s.is_finite() || s <= 0.0 => Err(SessionError::InvalidScale { scale: s }),
        other => Ok(other),
    }
}
