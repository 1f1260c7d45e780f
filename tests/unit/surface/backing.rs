use super::*;
use crate::foundation::core::{Rect, Rgba8};
use crate::gpu::emulated::EmulatedGpuContext;

fn size() -> SurfaceSize {
    SurfaceSize::new(8, 8).unwrap()
}

fn red_rect() -> DrawCommand {
    DrawCommand::fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Rgba8::new(255, 0, 0, 255))
}

#[test]
fn accelerated_surface_uploads_on_flush() {
    let emu = EmulatedGpuContext::new();
    let ctx: Arc<dyn GpuContext> = emu.clone();
    let registry = ContextRegistry::new();
    let mut s = Surface::accelerated(&ctx, &registry, size(), OpacityMode::NonOpaque, 1).unwrap();
    assert!(s.is_accelerated());
    assert!(s.is_valid());
    assert_eq!(registry.lease_count(ctx.id()), 1);

    let tex = s.texture().unwrap();
    s.apply(&mut Rasterizer::new(), &[red_rect()]).unwrap();
    assert_eq!(&emu.read_texture(tex).unwrap()[..4], &[0, 0, 0, 0]);
    s.flush().unwrap();
    assert_eq!(&emu.read_texture(tex).unwrap()[..4], &[255, 0, 0, 255]);

    drop(s);
    assert!(!emu.has_texture(tex));
    assert!(registry.is_empty());
}

#[test]
fn opaque_surfaces_start_black() {
    let s = Surface::unaccelerated(size(), OpacityMode::Opaque, 1, u64::MAX).unwrap();
    assert_eq!(&s.cpu_pixels()[..4], &[0, 0, 0, 255]);
    assert!(!s.is_accelerated());
    assert!(s.texture().is_none());
}

#[test]
fn software_budget_is_enforced() {
    let err = Surface::unaccelerated(size(), OpacityMode::NonOpaque, 1, 10)
        .err()
        .unwrap();
    assert!(matches!(err, BridgeError::Allocation(_)));
}

#[test]
fn accelerated_allocation_fails_on_lost_context() {
    let emu = EmulatedGpuContext::new();
    emu.lose_context();
    let ctx: Arc<dyn GpuContext> = emu;
    let registry = ContextRegistry::new();
    let err = Surface::accelerated(&ctx, &registry, size(), OpacityMode::NonOpaque, 1)
        .err()
        .unwrap();
    assert!(err.is_context_lost());
    assert!(registry.is_empty());
}

#[test]
fn snapshot_honors_hint_on_accelerated_surface() {
    let emu = EmulatedGpuContext::new();
    let ctx: Arc<dyn GpuContext> = emu.clone();
    let registry = ContextRegistry::new();
    let mut s = Surface::accelerated(&ctx, &registry, size(), OpacityMode::NonOpaque, 1).unwrap();
    s.apply(&mut Rasterizer::new(), &[red_rect()]).unwrap();

    let gpu = s.snapshot(AccelerationHint::PreferAcceleration).unwrap();
    assert!(gpu.is_texture_backed());
    assert_ne!(gpu.texture_id(), s.texture());
    assert_eq!(gpu.pixel(3, 3).unwrap().to_array(), [255, 0, 0, 255]);
    assert_eq!(emu.live_textures(), 2);

    let cpu = s.snapshot(AccelerationHint::PreferNoAcceleration).unwrap();
    assert!(!cpu.is_texture_backed());
    assert_eq!(cpu.pixels(), gpu.pixels());

    drop(gpu);
    assert_eq!(emu.live_textures(), 1);
}

#[test]
fn snapshot_is_isolated_from_later_drawing() {
    let mut s = Surface::unaccelerated(size(), OpacityMode::NonOpaque, 1, u64::MAX).unwrap();
    let before = s.snapshot(AccelerationHint::PreferAcceleration).unwrap();
    assert!(!before.is_texture_backed());
    s.apply(&mut Rasterizer::new(), &[red_rect()]).unwrap();
    assert_eq!(before.pixel(0, 0).unwrap().to_array(), [0, 0, 0, 0]);
    assert_eq!(&s.cpu_pixels()[..4], &[255, 0, 0, 255]);
}

#[test]
fn context_loss_invalidates_but_keeps_staging() {
    let emu = EmulatedGpuContext::new();
    let ctx: Arc<dyn GpuContext> = emu.clone();
    let registry = ContextRegistry::new();
    let mut s = Surface::accelerated(&ctx, &registry, size(), OpacityMode::NonOpaque, 1).unwrap();
    s.apply(&mut Rasterizer::new(), &[red_rect()]).unwrap();
    emu.lose_context();

    assert!(!s.is_valid());
    assert!(s.flush().unwrap_err().is_context_lost());
    assert_eq!(&s.cpu_pixels()[..4], &[255, 0, 0, 255]);
}

#[test]
fn write_pixels_checks_length() {
    let mut s = Surface::unaccelerated(size(), OpacityMode::NonOpaque, 1, u64::MAX).unwrap();
    assert!(s.write_pixels(&[0; 4]).is_err());
    let full = vec![7u8; size().byte_len()];
    s.write_pixels(&full).unwrap();
    assert_eq!(s.read_back().unwrap(), full);
}
