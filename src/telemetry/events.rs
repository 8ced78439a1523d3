//! Telemetry event types describing session lifecycle, frame pacing and
//! input/asset activity.

use serde::{Deserialize, Serialize};

/// Lifecycle transitions reported by a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Initialized,
    Restored,
    Resurfaced,
    Resized,
    SurfaceLost,
    Suspended,
    Terminated,
}

/// Metric events retained in the session history and broadcast to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    Lifecycle {
        phase: LifecyclePhase,
        timestamp_ms: u64,
    },
    FrameTiming {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
    },
    InputBatch {
        kind: i32,
        pointer_count: usize,
    },
    AssetLoaded {
        key: String,
        bytes: usize,
    },
    AssetFailed {
        key: String,
        reason: String,
    },
    Error {
        code: i32,
        context: String,
    },
}
