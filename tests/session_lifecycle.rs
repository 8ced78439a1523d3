// Integration tests for the EngineSession lifecycle through the public API

use std::time::{Duration, Instant};

use xo_native::surface::RenderBackend;
use xo_native::telemetry::MetricEvent;
use xo_native::{
    EngineConfig, EngineSession, FrameResult, InputKind, PointerBatch, SessionError,
    SessionState,
};

fn session() -> EngineSession {
    EngineSession::new(EngineConfig::default())
}

#[test]
fn full_lifecycle_with_resume() {
    let mut s = session();
    s.initialize(800, 600, Some(1.0), None).unwrap();
    s.submit_input(InputKind::Touch, PointerBatch::single(10.0, 20.0))
        .unwrap();
    assert_eq!(s.step().unwrap(), FrameResult::Rendered);
    assert_eq!(s.last_pointer_count(), 1);

    s.notify_surface_lost();
    s.notify_surface_lost();
    assert_eq!(s.state(), SessionState::SurfaceLost);
    assert!(matches!(
        s.step(),
        Err(SessionError::InvalidState { .. })
    ));

    s.initialize(800, 600, Some(1.0), None).unwrap();
    assert_eq!(s.step().unwrap(), FrameResult::Rendered);
    assert_eq!(s.frame_count(), 2);

    s.teardown(true).unwrap();
    assert_eq!(s.state(), SessionState::Destroyed);
}

#[test]
fn independent_sessions_share_nothing() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let mut s = session();
                s.initialize(100 + i, 100, None, None).unwrap();
                for _ in 0..i {
                    s.submit_input(InputKind::Move, PointerBatch::single(1.0, 1.0))
                        .unwrap();
                    s.step().unwrap();
                }
                let frames = s.frame_count();
                s.teardown(true).unwrap();
                frames
            })
        })
        .collect();

    let frames: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(frames, vec![0, 1, 2, 3]);
}

#[test]
fn telemetry_subscribers_see_frames() {
    let mut s = session();
    let mut rx = s.telemetry().subscribe();
    s.initialize(64, 64, None, None).unwrap();
    s.step().unwrap();

    let mut saw_frame = false;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, MetricEvent::FrameTiming { .. }) {
            saw_frame = true;
        }
    }
    assert!(saw_frame);
}

#[test]
fn headless_pixels_show_active_pointer() {
    let mut s = session();
    s.initialize(32, 32, None, None).unwrap();
    s.submit_input(InputKind::Down, PointerBatch::single(16.0, 16.0))
        .unwrap();
    s.step().unwrap();

    let stats = s.backend_stats();
    assert_eq!(stats.frames_presented, 1);
    assert!(stats.attached);
}

#[test]
fn custom_backend_failure_is_resource_error() {
    struct NoSurface;

    impl RenderBackend for NoSurface {
        fn attach(
            &mut self,
            _size: xo_native::surface::SurfaceSize,
            _scale: f32,
        ) -> Result<(), SessionError> {
            Err(SessionError::Resource {
                reason: "no EGL context".to_string(),
            })
        }
        fn resize(&mut self, _size: xo_native::surface::SurfaceSize) -> Result<(), SessionError> {
            Ok(())
        }
        fn release_surface(&mut self) {}
        fn has_texture(&self, _key: &str) -> bool {
            false
        }
        fn upload(&mut self, _key: &str, _bytes: &[u8]) -> Result<u32, SessionError> {
            Ok(0)
        }
        fn present(&mut self, _frame: &xo_native::surface::FrameInput<'_>) -> Result<(), SessionError> {
            Ok(())
        }
        fn stats(&self) -> xo_native::surface::BackendStats {
            Default::default()
        }
    }

    let mut s = EngineSession::with_backend(EngineConfig::default(), Box::new(NoSurface));
    let err = s.initialize(800, 600, None, None).unwrap_err();
    assert!(matches!(err, SessionError::Resource { .. }));
    assert_eq!(s.state(), SessionState::Uninitialized);
}

#[test]
fn snapshot_round_trip_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tiles.bin"), vec![7u8; 128]).unwrap();

    let mut first = session();
    first
        .initialize(800, 600, Some(2.0), Some(dir.path()))
        .unwrap();
    first.request_asset("tiles", "tiles.bin").unwrap();
    first.step().unwrap();
    first.teardown(false).unwrap();

    let mut second = session();
    second
        .initialize(800, 600, None, Some(dir.path()))
        .unwrap();
    assert_eq!(second.display_scale(), Some(2.0));
    assert_eq!(second.frame_count(), 1);

    let deadline = Instant::now() + Duration::from_secs(5);
    while second.asset("tiles").is_none() && Instant::now() < deadline {
        second.step().unwrap();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(second.asset("tiles").map(<[u8]>::len), Some(128));
}
