use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an [`EngineSession`](super::EngineSession).
///
/// `Uninitialized → Active ⇄ SurfaceLost`, any of them `→ Destroyed`.
/// `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Active,
    SurfaceLost,
    Destroyed,
}

impl SessionState {
    pub fn can_initialize(&self) -> bool {
        matches!(self, SessionState::Uninitialized | SessionState::SurfaceLost)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, SessionState::Destroyed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Active => "active",
            SessionState::SurfaceLost => "surface-lost",
            SessionState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}
