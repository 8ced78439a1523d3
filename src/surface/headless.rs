use std::collections::HashMap;

use log::{debug, info};

use crate::error::SessionError;

use super::{BackendStats, FrameInput, RenderBackend, SurfaceSize, TextureId};

const BYTES_PER_PIXEL: u64 = 4;
const CLEAR_COLOR: [u8; 4] = [0x20, 0x20, 0x20, 0xff];
const POINTER_COLOR: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
const POINTER_RADIUS: i64 = 1;

/// CPU framebuffer standing in for a graphics context.
struct Framebuffer {
    size: SurfaceSize,
    pixels: Vec<u8>,
}

impl Framebuffer {
    fn allocate(size: SurfaceSize) -> Result<Self, SessionError> {
        let len = usize::try_from(size.pixel_count() * BYTES_PER_PIXEL).map_err(|_| {
            SessionError::Resource {
                reason: format!(
                    "framebuffer {}x{} exceeds addressable memory",
                    size.width, size.height
                ),
            }
        })?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|err| SessionError::Resource {
                reason: format!(
                    "framebuffer {}x{} allocation failed: {}",
                    size.width, size.height, err
                ),
            })?;
        pixels.resize(len, 0);

        Ok(Self { size, pixels })
    }

    fn clear(&mut self, color: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    fn stamp(&mut self, cx: f32, cy: f32, color: [u8; 4]) {
        if !cx.is_finite() || !cy.is_finite() {
            return;
        }
        let (w, h) = (i64::from(self.size.width), i64::from(self.size.height));
        // Off-surface coordinates collapse to just outside the edge.
        let cx = (cx as i64).clamp(-POINTER_RADIUS - 1, w + POINTER_RADIUS);
        let cy = (cy as i64).clamp(-POINTER_RADIUS - 1, h + POINTER_RADIUS);
        for y in (cy - POINTER_RADIUS).max(0)..=(cy + POINTER_RADIUS).min(h - 1) {
            for x in (cx - POINTER_RADIUS).max(0)..=(cx + POINTER_RADIUS).min(w - 1) {
                let offset = ((y * w + x) * BYTES_PER_PIXEL as i64) as usize;
                self.pixels[offset..offset + 4].copy_from_slice(&color);
            }
        }
    }

    fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let offset = ((u64::from(y) * u64::from(self.size.width) + u64::from(x))
            * BYTES_PER_PIXEL) as usize;
        let mut px = [0; 4];
        px.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(px)
    }
}

/// Headless backend used on desktop, in tests and by the replay CLI.
///
/// Allocates an RGBA framebuffer sized to the surface and a texture table.
/// Presenting clears the framebuffer and marks every active pointer.
pub struct HeadlessBackend {
    max_dimension: u32,
    framebuffer: Option<Framebuffer>,
    textures: HashMap<String, TextureId>,
    next_texture: TextureId,
    frames_presented: u64,
    last_frame: Option<u64>,
}

impl HeadlessBackend {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            framebuffer: None,
            textures: HashMap::new(),
            next_texture: 1,
            frames_presented: 0,
            last_frame: None,
        }
    }

    /// Read back one pixel of the last presented frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.framebuffer.as_ref().and_then(|fb| fb.pixel(x, y))
    }

    fn check_limits(&self, size: SurfaceSize) -> Result<(), SessionError> {
        if size.width > self.max_dimension || size.height > self.max_dimension {
            return Err(SessionError::Resource {
                reason: format!(
                    "surface {}x{} exceeds maximum dimension {}",
                    size.width, size.height, self.max_dimension
                ),
            });
        }
        Ok(())
    }
}

impl RenderBackend for HeadlessBackend {
    fn attach(&mut self, size: SurfaceSize, scale: f32) -> Result<(), SessionError> {
        self.check_limits(size)?;
        self.framebuffer = Some(Framebuffer::allocate(size)?);
        info!(
            "[Headless] Attached {}x{} surface (scale {})",
            size.width, size.height, scale
        );
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<(), SessionError> {
        self.check_limits(size)?;
        if self.framebuffer.as_ref().map(|fb| fb.size) == Some(size) {
            return Ok(());
        }
        self.framebuffer = Some(Framebuffer::allocate(size)?);
        debug!("[Headless] Resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn release_surface(&mut self) {
        let textures = self.textures.len();
        self.framebuffer = None;
        self.textures.clear();
        debug!("[Headless] Released surface and {} textures", textures);
    }

    fn has_texture(&self, key: &str) -> bool {
        self.textures.contains_key(key)
    }

    fn upload(&mut self, key: &str, bytes: &[u8]) -> Result<TextureId, SessionError> {
        if self.framebuffer.is_none() {
            return Err(SessionError::Resource {
                reason: format!("cannot upload '{}' without an attached surface", key),
            });
        }
        let id = self.next_texture;
        self.next_texture = self.next_texture.wrapping_add(1);
        self.textures.insert(key.to_string(), id);
        debug!("[Headless] Uploaded '{}' ({} bytes) as texture {}", key, bytes.len(), id);
        Ok(id)
    }

    fn present(&mut self, frame: &FrameInput<'_>) -> Result<(), SessionError> {
        let fb = self.framebuffer.as_mut().ok_or_else(|| SessionError::Resource {
            reason: "present called without an attached surface".to_string(),
        })?;

        fb.clear(CLEAR_COLOR);
        for pointer in frame.pointers {
            fb.stamp(pointer.x, pointer.y, POINTER_COLOR);
        }
        self.frames_presented += 1;
        self.last_frame = Some(frame.frame_index);
        Ok(())
    }

    fn stats(&self) -> BackendStats {
        BackendStats {
            attached: self.framebuffer.is_some(),
            size: self.framebuffer.as_ref().map(|fb| fb.size),
            textures: self.textures.len(),
            frames_presented: self.frames_presented,
            last_frame: self.last_frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Pointer;

    fn size(width: u32, height: u32) -> SurfaceSize {
        SurfaceSize { width, height }
    }

    #[test]
    fn attach_allocates_sized_framebuffer() {
        let mut backend = HeadlessBackend::new(4096);
        backend.attach(size(64, 32), 1.0).unwrap();

        let stats = backend.stats();
        assert!(stats.attached);
        assert_eq!(stats.size, Some(size(64, 32)));
        assert_eq!(backend.pixel(63, 31), Some([0, 0, 0, 0]));
        assert_eq!(backend.pixel(64, 0), None);
    }

    #[test]
    fn attach_rejects_oversized_surface() {
        let mut backend = HeadlessBackend::new(128);
        let err = backend.attach(size(256, 16), 1.0).unwrap_err();
        assert!(matches!(err, SessionError::Resource { .. }));
        assert!(!backend.stats().attached);
    }

    #[test]
    fn present_marks_pointers() {
        let mut backend = HeadlessBackend::new(4096);
        backend.attach(size(32, 32), 1.0).unwrap();
        let pointers = [Pointer::new(10.0, 20.0), Pointer::new(-5.0, f32::NAN)];
        backend
            .present(&FrameInput {
                frame_index: 7,
                pointers: &pointers,
            })
            .unwrap();

        assert_eq!(backend.pixel(10, 20), Some(POINTER_COLOR));
        assert_eq!(backend.pixel(11, 21), Some(POINTER_COLOR));
        assert_eq!(backend.pixel(0, 0), Some(CLEAR_COLOR));
        assert_eq!(backend.stats().frames_presented, 1);
        assert_eq!(backend.stats().last_frame, Some(7));
    }

    #[test]
    fn extreme_coordinates_are_clipped() {
        let mut backend = HeadlessBackend::new(4096);
        backend.attach(size(32, 32), 1.0).unwrap();
        let pointers = [
            Pointer::new(f32::MAX, 10.0),
            Pointer::new(10.0, -f32::MAX),
            Pointer::new(-f32::MAX, f32::MAX),
            Pointer::new(32.5, 31.9),
        ];
        backend
            .present(&FrameInput {
                frame_index: 0,
                pointers: &pointers,
            })
            .unwrap();

        assert_eq!(backend.pixel(31, 10), Some(CLEAR_COLOR));
        assert_eq!(backend.pixel(10, 0), Some(CLEAR_COLOR));
        assert_eq!(backend.pixel(31, 31), Some(POINTER_COLOR));
        assert_eq!(backend.stats().frames_presented, 1);
    }

    #[test]
    fn release_forgets_textures() {
        let mut backend = HeadlessBackend::new(4096);
        backend.attach(size(8, 8), 1.0).unwrap();
        backend.upload("font", &[1, 2, 3]).unwrap();
        assert!(backend.has_texture("font"));

        backend.release_surface();
        assert!(!backend.has_texture("font"));
        assert!(backend.upload("font", &[1]).is_err());
        assert_eq!(backend.stats(), BackendStats::default());
    }
}
