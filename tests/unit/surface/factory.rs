use super::*;
use crate::gpu::emulated::EmulatedGpuContext;

fn request<'a>(
    context: Option<&'a Arc<dyn GpuContext>>,
    registry: &'a Arc<ContextRegistry>,
    max_software_pixels: u64,
) -> SurfaceRequest<'a> {
    SurfaceRequest {
        size: SurfaceSize::new(16, 16).unwrap(),
        opacity: OpacityMode::NonOpaque,
        generation: 3,
        context,
        registry,
        max_software_pixels,
    }
}

#[test]
fn prefers_accelerated_when_context_is_usable() {
    let ctx: Arc<dyn GpuContext> = EmulatedGpuContext::new();
    let registry = ContextRegistry::new();
    let out = create_surface(request(Some(&ctx), &registry, u64::MAX));
    let surface = out.surface.as_ref().unwrap();
    assert!(surface.is_accelerated());
    assert_eq!(surface.generation(), 3);
    assert!(!out.fell_back());
}

#[test]
fn falls_back_to_unaccelerated_on_allocation_failure() {
    let emu = EmulatedGpuContext::new();
    emu.fail_next_allocations(1);
    let ctx: Arc<dyn GpuContext> = emu;
    let registry = ContextRegistry::new();
    let out = create_surface(request(Some(&ctx), &registry, u64::MAX));
    assert!(out.fell_back());
    assert!(!out.surface.as_ref().unwrap().is_accelerated());
    assert!(matches!(
        out.accelerated_error,
        Some(BridgeError::Allocation(_))
    ));
    assert!(registry.is_empty());
}

#[test]
fn without_context_goes_straight_to_software() {
    let registry = ContextRegistry::new();
    let out = create_surface(request(None, &registry, u64::MAX));
    assert!(!out.surface.unwrap().is_accelerated());
    assert!(out.accelerated_error.is_none());
}

#[test]
fn exhausting_both_links_yields_invalid() {
    let emu = EmulatedGpuContext::new();
    emu.lose_context();
    let ctx: Arc<dyn GpuContext> = emu;
    let registry = ContextRegistry::new();
    let out = create_surface(request(Some(&ctx), &registry, 1));
    assert!(out.surface.is_none());
    assert!(!out.fell_back());
    assert!(out.accelerated_error.unwrap().is_context_lost());
    assert!(matches!(out.software_error, Some(BridgeError::Allocation(_))));
}
