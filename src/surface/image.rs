use std::sync::Arc;

use crate::foundation::core::{Rgba8Premul, SurfaceSize};
use crate::gpu::context::{GpuContext, TextureId};

/// Owns one texture and deletes it on drop.
pub(crate) struct TextureHandle {
    context: Arc<dyn GpuContext>,
    texture: TextureId,
}

impl TextureHandle {
    pub(crate) fn new(context: Arc<dyn GpuContext>, texture: TextureId) -> Self {
        Self { context, texture }
    }

    pub(crate) fn id(&self) -> TextureId {
        self.texture
    }
}

impl Drop for TextureHandle {
    fn drop(&mut self) {
        self.context.delete_texture(self.texture);
    }
}

/// Immutable snapshot of a canvas.
///
/// Pixels are premultiplied RGBA8, tightly packed, row-major. A texture-backed image also keeps
/// its own GPU copy alive until the last clone drops.
#[derive(Clone)]
pub struct Image {
    size: SurfaceSize,
    pixels: Arc<[u8]>,
    texture: Option<Arc<TextureHandle>>,
}

impl Image {
    pub(crate) fn from_pixels(size: SurfaceSize, pixels: Vec<u8>) -> Self {
        Self {
            size,
            pixels: pixels.into(),
            texture: None,
        }
    }

    pub(crate) fn with_texture(size: SurfaceSize, pixels: Vec<u8>, texture: TextureHandle) -> Self {
        Self {
            size,
            pixels: pixels.into(),
            texture: Some(Arc::new(texture)),
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn is_texture_backed(&self) -> bool {
        self.texture.is_some()
    }

    pub fn texture_id(&self) -> Option<TextureId> {
        self.texture.as_ref().map(|t| t.id())
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn shared_pixels(&self) -> Arc<[u8]> {
        Arc::clone(&self.pixels)
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4).map(Rgba8Premul::from_slice)
    }

    /// Straight-alpha copy of the pixels, for encoders that expect it.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.pixels.to_vec();
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("size", &self.size)
            .field("texture", &self.texture_id())
            .finish_non_exhaustive()
    }
}
