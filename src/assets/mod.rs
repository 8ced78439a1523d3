//! Session-level asset storage and the background loader feeding it.
//!
//! Loaded bytes belong to the session and survive surface loss; only the
//! textures a backend creates from them are surface-bound.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

mod loader;

pub use loader::{AssetCompletion, AssetLoader, AssetRequest};

/// Bytes loaded for one asset key
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Loaded assets and load failures, keyed by asset name
#[derive(Debug, Default)]
pub struct AssetStore {
    assets: BTreeMap<String, Asset>,
    failures: BTreeMap<String, String>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completion; returns `true` if an asset was stored
    pub fn apply(&mut self, completion: AssetCompletion) -> bool {
        match completion.result {
            Ok(bytes) => {
                self.failures.remove(&completion.key);
                self.assets.insert(
                    completion.key,
                    Asset {
                        path: completion.path,
                        bytes,
                    },
                );
                true
            }
            Err(reason) => {
                self.failures.insert(completion.key, reason);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Asset> {
        self.assets.get(key)
    }

    pub fn failure(&self, key: &str) -> Option<&str> {
        self.failures.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Asset)> {
        self.assets.iter().map(|(key, asset)| (key.as_str(), asset))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn clear(&mut self) {
        self.assets.clear();
        self.failures.clear();
    }
}

/// Resolve a requested path; relative paths are taken from the cache directory
pub fn resolve_path(path: &Path, cache_dir: Option<&Path>) -> PathBuf {
    match cache_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
