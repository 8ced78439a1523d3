//! Resumable session state stored in the cache directory.
//!
//! A non-terminating teardown writes a [`SessionSnapshot`]; the next session
//! initialized with the same cache directory picks it up and deletes it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::surface::SurfaceSize;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Asset that should be reloaded when the session resumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAsset {
    pub key: String,
    pub path: PathBuf,
}

/// State persisted across a backgrounding pause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub surface: SurfaceSize,
    #[serde(default)]
    pub display_scale: Option<f32>,
    pub frame_count: u64,
    #[serde(default)]
    pub assets: Vec<SnapshotAsset>,
    pub saved_at_ms: u64,
}

impl SessionSnapshot {
    pub fn new(
        surface: SurfaceSize,
        display_scale: Option<f32>,
        frame_count: u64,
        assets: Vec<SnapshotAsset>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            surface,
            display_scale,
            frame_count,
            assets,
            saved_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }
}

pub fn snapshot_path(cache_dir: &Path, file_name: &str) -> PathBuf {
    cache_dir.join(file_name)
}

/// Write the snapshot atomically (temp file + rename)
pub fn save(path: &Path, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a snapshot; a missing file is `Ok(None)`
///
/// # Errors
/// `SessionError::Persistence` for unreadable or malformed files and for
/// snapshots written by an unknown format version.
pub fn load(path: &Path) -> Result<Option<SessionSnapshot>, SessionError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let snapshot: SessionSnapshot = serde_json::from_slice(&data)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SessionError::Persistence {
            reason: format!("unsupported snapshot version {}", snapshot.version),
        });
    }
    Ok(Some(snapshot))
}

/// Delete a snapshot; returns whether one existed
pub fn remove(path: &Path) -> Result<bool, SessionError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
