//! Configuration management for the engine boundary
//!
//! Runtime configuration is loaded from JSON so that queue sizes, surface
//! limits and shutdown timing can be tuned per device without rebuilding the
//! native library. A `xo-config.json` placed in the application cache
//! directory overrides the built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// File name looked up inside the cache directory by [`EngineConfig::resolve`]
pub const CONFIG_FILE_NAME: &str = "xo-config.json";

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Pointer input funnel parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Maximum simultaneous pointers kept per batch; extra pointers are dropped
    pub max_pointers: usize,
    /// Maximum queued batches between two steps
    pub queue_capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_pointers: 10,
            queue_capacity: 64,
        }
    }
}

/// Surface allocation and frame pacing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Largest accepted width or height in pixels
    pub max_dimension: u32,
    /// Frame budget; steps slower than this are logged as warnings
    pub frame_budget_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            max_dimension: 8192,
            frame_budget_ms: 16,
        }
    }
}

/// Background asset loader parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Capacity of the request channel to the worker
    pub request_capacity: usize,
    /// Capacity of the completion ring drained by `step()`
    pub completion_capacity: usize,
    /// How long teardown waits for the worker to exit
    pub shutdown_grace_ms: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            request_capacity: 64,
            completion_capacity: 32,
            shutdown_grace_ms: 250,
        }
    }
}

impl AssetConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Resumable state persistence parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot file name inside the cache directory
    pub snapshot_file: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_file: "xo-session.json".to_string(),
        }
    }
}

/// Per-session telemetry parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub history_capacity: usize,
    pub channel_capacity: usize,
    /// Number of recent frames used for the rolling frame-time average
    pub frame_window: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            history_capacity: 64,
            channel_capacity: 128,
            frame_window: 32,
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults when the file is missing
    /// or invalid (a warning is logged in that case).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Resolve configuration for a session
    ///
    /// Uses `xo-config.json` from the cache directory when it exists,
    /// otherwise the defaults. A missing file is not worth a warning here.
    pub fn resolve(cache_dir: Option<&Path>) -> Self {
        match cache_dir.map(|dir| dir.join(CONFIG_FILE_NAME)) {
            Some(path) if path.is_file() => Self::load_from_file(path),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.input.max_pointers, 10);
        assert_eq!(config.input.queue_capacity, 64);
        assert_eq!(config.surface.max_dimension, 8192);
        assert_eq!(config.persistence.snapshot_file, "xo-session.json");
        assert_eq!(config.assets.shutdown_grace(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "input": { "max_pointers": 4, "queue_capacity": 8 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.input.max_pointers, 4);
        assert_eq!(config.surface.frame_budget_ms, 16);
        assert_eq!(config.telemetry.history_capacity, 64);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load_from_file("/nonexistent/xo-config.json");
        assert_eq!(config.input.max_pointers, 10);
    }

    #[test]
    fn test_resolve_reads_cache_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "surface": { "max_dimension": 1024, "frame_budget_ms": 8 } }"#,
        )
        .unwrap();

        let config = EngineConfig::resolve(Some(dir.path()));
        assert_eq!(config.surface.max_dimension, 1024);
        assert_eq!(config.surface.frame_budget_ms, 8);

        let config = EngineConfig::resolve(None);
        assert_eq!(config.surface.max_dimension, 8192);
    }
}
