//! Per-session telemetry collector.
//!
//! Lifecycle transitions, frame timing and input/asset activity go into a
//! bounded history plus a broadcast stream. Each session owns its own
//! collector; nothing here is shared between sessions.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;

use crate::config::TelemetryConfig;
use crate::error::{ErrorCode, SessionError};

pub mod events;

pub use events::{LifecyclePhase, MetricEvent};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Frame tracker maintains a rolling window to compute avg/max frame time.
struct FrameTracker {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl FrameTracker {
    fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn observe(&mut self, value: f32) -> (f32, f32, usize) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value);

        let count = self.samples.len();
        let sum: f32 = self.samples.iter().copied().sum();
        let max = self
            .samples
            .iter()
            .copied()
            .fold(0.0_f32, |acc, next| acc.max(next));
        (sum / count as f32, max, count)
    }
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct SessionTelemetry {
    tx: broadcast::Sender<MetricEvent>,
    history: VecDeque<MetricEvent>,
    history_capacity: usize,
    frames: FrameTracker,
    total_events: u64,
    dropped_history: u64,
}

impl SessionTelemetry {
    pub fn new(config: &TelemetryConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity.max(1));
        let history_capacity = config.history_capacity.max(1);
        Self {
            tx,
            history: VecDeque::with_capacity(history_capacity),
            history_capacity,
            frames: FrameTracker::new(config.frame_window),
            total_events: 0,
            dropped_history: 0,
        }
    }

    pub fn publish(&mut self, event: MetricEvent) {
        self.total_events += 1;
        if self.history.len() == self.history_capacity {
            self.history.pop_front();
            self.dropped_history += 1;
        }
        self.history.push_back(event.clone());

        // No subscribers is the normal case.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            recent: self.history.iter().cloned().collect(),
            total_events: self.total_events,
            dropped_events: self.dropped_history,
        }
    }

    pub fn record_phase(&mut self, phase: LifecyclePhase) {
        self.publish(MetricEvent::Lifecycle {
            phase,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_frame(&mut self, elapsed: Duration) {
        let (avg_ms, max_ms, sample_count) =
            self.frames.observe(elapsed.as_secs_f32() * 1000.0);
        self.publish(MetricEvent::FrameTiming {
            avg_ms,
            max_ms,
            sample_count,
        });
    }

    pub fn record_input(&mut self, kind: i32, pointer_count: usize) {
        self.publish(MetricEvent::InputBatch {
            kind,
            pointer_count,
        });
    }

    pub fn record_error(&mut self, err: &SessionError, context: impl Into<String>) {
        self.publish(MetricEvent::Error {
            code: err.code(),
            context: context.into(),
        });
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
