//! Surface-bound rendering resources.
//!
//! Everything a [`RenderBackend`] holds is tied to the current drawable
//! surface and is released on surface loss. Session-level data (decoded
//! assets, frame counters) lives in the session and survives.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::input::Pointer;

mod headless;

pub use headless::HeadlessBackend;

/// Texture handle assigned by a backend on upload.
pub type TextureId = u32;

/// Surface dimensions in pixels. Both are non-zero once validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    /// Validate dimensions coming from the platform.
    ///
    /// # Errors
    /// `SessionError::InvalidSurface` if either dimension is zero or negative.
    pub fn from_platform(width: i32, height: i32) -> Result<Self, SessionError> {
        if width <= 0 || height <= 0 {
            return Err(SessionError::InvalidSurface { width, height });
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Everything a backend needs to produce one frame.
#[derive(Debug)]
pub struct FrameInput<'a> {
    pub frame_index: u64,
    pub pointers: &'a [Pointer],
}

/// Read-only view of backend resource usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    pub attached: bool,
    pub size: Option<SurfaceSize>,
    pub textures: usize,
    pub frames_presented: u64,
    /// `frame_index` of the most recently presented frame
    pub last_frame: Option<u64>,
}

/// Trait implemented by rendering backends.
///
/// A backend owns only surface-bound resources. After `release_surface` it
/// must hold no handles into the lost context; the session re-uploads
/// textures after the next `attach`.
pub trait RenderBackend: Send {
    fn attach(&mut self, size: SurfaceSize, scale: f32) -> Result<(), SessionError>;
    fn resize(&mut self, size: SurfaceSize) -> Result<(), SessionError>;
    fn release_surface(&mut self);
    fn has_texture(&self, key: &str) -> bool;
    fn upload(&mut self, key: &str, bytes: &[u8]) -> Result<TextureId, SessionError>;
    fn present(&mut self, frame: &FrameInput<'_>) -> Result<(), SessionError>;
    fn stats(&self) -> BackendStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_size_rejects_non_positive() {
        assert!(SurfaceSize::from_platform(800, 600).is_ok());
        assert_eq!(
            SurfaceSize::from_platform(0, 600).unwrap_err(),
            SessionError::InvalidSurface {
                width: 0,
                height: 600
            }
        );
        assert!(SurfaceSize::from_platform(800, -1).is_err());
    }

    #[test]
    fn pixel_count_does_not_overflow() {
        let size = SurfaceSize::from_platform(i32::MAX, i32::MAX).unwrap();
        assert_eq!(size.pixel_count(), (i32::MAX as u64) * (i32::MAX as u64));
    }
}
