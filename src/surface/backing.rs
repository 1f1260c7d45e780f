use std::sync::Arc;

use crate::foundation::core::{AccelerationHint, OpacityMode, SurfaceSize};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::gpu::context::{GpuContext, TextureId};
use crate::gpu::registry::{ContextRegistry, RegistryLease};
use crate::raster::composite::fill;
use crate::raster::draw::DrawCommand;
use crate::raster::rasterizer::Rasterizer;
use crate::surface::image::{Image, TextureHandle};

/// GPU-side storage of an accelerated surface.
///
/// Drawing rasterizes into `staging`; `flush` uploads it into `texture`. The staging pixmap is
/// what survives when the context is lost.
pub(crate) struct AcceleratedBacking {
    context: Arc<dyn GpuContext>,
    texture: TextureId,
    staging: vello_cpu::Pixmap,
    dirty: bool,
    _lease: RegistryLease,
}

impl Drop for AcceleratedBacking {
    fn drop(&mut self) {
        self.context.delete_texture(self.texture);
    }
}

pub(crate) enum SurfaceBacking {
    Accelerated(AcceleratedBacking),
    Unaccelerated { pixmap: vello_cpu::Pixmap },
}

/// The drawable target a bridge owns.
pub(crate) struct Surface {
    size: SurfaceSize,
    generation: u64,
    backing: SurfaceBacking,
}

fn new_pixmap(size: SurfaceSize, opacity: OpacityMode) -> BridgeResult<vello_cpu::Pixmap> {
    let (w, h) = size.as_u16()?;
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    fill(
        pixmap.data_as_u8_slice_mut(),
        opacity.initial_color().to_array(),
    );
    Ok(pixmap)
}

impl Surface {
    pub(crate) fn accelerated(
        context: &Arc<dyn GpuContext>,
        registry: &Arc<ContextRegistry>,
        size: SurfaceSize,
        opacity: OpacityMode,
        generation: u64,
    ) -> BridgeResult<Self> {
        if context.is_context_lost() {
            return Err(BridgeError::context_lost(
                "cannot allocate an accelerated surface on a lost context",
            ));
        }
        let staging = new_pixmap(size, opacity)?;
        let texture = context.create_texture(size)?;
        let backing = AcceleratedBacking {
            context: Arc::clone(context),
            texture,
            staging,
            dirty: false,
            _lease: registry.acquire(context.id()),
        };
        // Dropping the backing on error releases the texture and the lease.
        context.write_texture(texture, backing.staging.data_as_u8_slice())?;
        Ok(Self {
            size,
            generation,
            backing: SurfaceBacking::Accelerated(backing),
        })
    }

    pub(crate) fn unaccelerated(
        size: SurfaceSize,
        opacity: OpacityMode,
        generation: u64,
        max_pixels: u64,
    ) -> BridgeResult<Self> {
        if size.pixel_count() > max_pixels {
            return Err(BridgeError::allocation(format!(
                "{}x{} exceeds the software pixel budget of {max_pixels}",
                size.width, size.height
            )));
        }
        Ok(Self {
            size,
            generation,
            backing: SurfaceBacking::Unaccelerated {
                pixmap: new_pixmap(size, opacity)?,
            },
        })
    }

    pub(crate) fn size(&self) -> SurfaceSize {
        self.size
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_accelerated(&self) -> bool {
        matches!(self.backing, SurfaceBacking::Accelerated(_))
    }

    pub(crate) fn texture(&self) -> Option<TextureId> {
        match &self.backing {
            SurfaceBacking::Accelerated(b) => Some(b.texture),
            SurfaceBacking::Unaccelerated { .. } => None,
        }
    }

    /// An accelerated surface is invalid once its context is lost.
    pub(crate) fn is_valid(&self) -> bool {
        match &self.backing {
            SurfaceBacking::Accelerated(b) => !b.context.is_context_lost(),
            SurfaceBacking::Unaccelerated { .. } => true,
        }
    }

    /// CPU-side content: the pixmap, or the staging pixmap of an accelerated surface.
    pub(crate) fn cpu_pixels(&self) -> &[u8] {
        match &self.backing {
            SurfaceBacking::Accelerated(b) => b.staging.data_as_u8_slice(),
            SurfaceBacking::Unaccelerated { pixmap } => pixmap.data_as_u8_slice(),
        }
    }

    pub(crate) fn write_pixels(&mut self, pixels: &[u8]) -> BridgeResult<()> {
        let dst = match &mut self.backing {
            SurfaceBacking::Accelerated(b) => {
                b.dirty = true;
                b.staging.data_as_u8_slice_mut()
            }
            SurfaceBacking::Unaccelerated { pixmap } => pixmap.data_as_u8_slice_mut(),
        };
        if dst.len() != pixels.len() {
            return Err(BridgeError::validation(format!(
                "surface expects {} bytes, got {}",
                dst.len(),
                pixels.len()
            )));
        }
        dst.copy_from_slice(pixels);
        Ok(())
    }

    pub(crate) fn apply(
        &mut self,
        rasterizer: &mut Rasterizer,
        ops: &[DrawCommand],
    ) -> BridgeResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        match &mut self.backing {
            SurfaceBacking::Accelerated(b) => {
                b.dirty = true;
                rasterizer.apply(&mut b.staging, ops)
            }
            SurfaceBacking::Unaccelerated { pixmap } => rasterizer.apply(pixmap, ops),
        }
    }

    /// Make the GPU texture reflect everything drawn so far.
    pub(crate) fn flush(&mut self) -> BridgeResult<()> {
        if let SurfaceBacking::Accelerated(b) = &mut self.backing
            && b.dirty
        {
            b.context
                .write_texture(b.texture, b.staging.data_as_u8_slice())?;
            b.dirty = false;
        }
        Ok(())
    }

    /// Read the content back from the GPU (accelerated) or the pixmap.
    pub(crate) fn read_back(&mut self) -> BridgeResult<Vec<u8>> {
        self.flush()?;
        match &self.backing {
            SurfaceBacking::Accelerated(b) => b.context.read_texture(b.texture),
            SurfaceBacking::Unaccelerated { pixmap } => Ok(pixmap.data_as_u8_slice().to_vec()),
        }
    }

    /// Snapshot the content. Only an accelerated surface asked to prefer acceleration returns a
    /// texture-backed image; the image owns a copy, so later drawing does not affect it.
    pub(crate) fn snapshot(&mut self, hint: AccelerationHint) -> BridgeResult<Image> {
        self.flush()?;
        match &self.backing {
            SurfaceBacking::Accelerated(b) if hint == AccelerationHint::PreferAcceleration => {
                let copy = TextureHandle::new(
                    Arc::clone(&b.context),
                    b.context.copy_texture(b.texture)?,
                );
                let pixels = b.context.read_texture(copy.id())?;
                Ok(Image::with_texture(self.size, pixels, copy))
            }
            SurfaceBacking::Accelerated(b) => Ok(Image::from_pixels(
                self.size,
                b.context.read_texture(b.texture)?,
            )),
            SurfaceBacking::Unaccelerated { pixmap } => Ok(Image::from_pixels(
                self.size,
                pixmap.data_as_u8_slice().to_vec(),
            )),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/backing.rs"]
mod tests;
