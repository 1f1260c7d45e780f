use std::sync::Arc;

use crate::foundation::core::{OpacityMode, SurfaceSize};
use crate::foundation::error::BridgeError;
use crate::gpu::context::GpuContext;
use crate::gpu::registry::ContextRegistry;
use crate::surface::backing::Surface;

/// Everything needed to allocate a surface.
pub(crate) struct SurfaceRequest<'a> {
    pub(crate) size: SurfaceSize,
    pub(crate) opacity: OpacityMode,
    pub(crate) generation: u64,
    /// `None` skips the accelerated link of the chain.
    pub(crate) context: Option<&'a Arc<dyn GpuContext>>,
    pub(crate) registry: &'a Arc<ContextRegistry>,
    pub(crate) max_software_pixels: u64,
}

/// Result of walking the fallback chain accelerated → unaccelerated → invalid.
pub(crate) struct SurfaceOutcome {
    pub(crate) surface: Option<Surface>,
    /// Why the accelerated link failed, if it was attempted and failed.
    pub(crate) accelerated_error: Option<BridgeError>,
    /// Why the unaccelerated link failed, if it was reached and failed.
    pub(crate) software_error: Option<BridgeError>,
}

impl SurfaceOutcome {
    pub(crate) fn fell_back(&self) -> bool {
        self.accelerated_error.is_some() && self.surface.is_some()
    }
}

pub(crate) fn create_surface(req: SurfaceRequest<'_>) -> SurfaceOutcome {
    let mut accelerated_error = None;
    if let Some(context) = req.context {
        match Surface::accelerated(
            context,
            req.registry,
            req.size,
            req.opacity,
            req.generation,
        ) {
            Ok(surface) => {
                tracing::debug!(
                    generation = req.generation,
                    context = context.id().0,
                    "allocated accelerated surface"
                );
                return SurfaceOutcome {
                    surface: Some(surface),
                    accelerated_error: None,
                    software_error: None,
                };
            }
            Err(err) => {
                tracing::warn!(%err, "accelerated surface allocation failed");
                accelerated_error = Some(err);
            }
        }
    }

    match Surface::unaccelerated(
        req.size,
        req.opacity,
        req.generation,
        req.max_software_pixels,
    ) {
        Ok(surface) => {
            tracing::debug!(generation = req.generation, "allocated unaccelerated surface");
            SurfaceOutcome {
                surface: Some(surface),
                accelerated_error,
                software_error: None,
            }
        }
        Err(err) => {
            tracing::warn!(%err, "unaccelerated surface allocation failed; canvas is invalid");
            SurfaceOutcome {
                surface: None,
                accelerated_error,
                software_error: Some(err),
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/factory.rs"]
mod tests;
