use super::*;
use crate::bridge::events::EventLog;
use crate::foundation::core::{Rect, Rgba8};
use crate::gpu::emulated::EmulatedGpuContext;
use crate::scheduler::task::TaskQueue;

struct Harness {
    gpu: Arc<EmulatedGpuContext>,
    queue: Arc<TaskQueue>,
    log: Arc<EventLog>,
    registry: Arc<ContextRegistry>,
}

impl Harness {
    fn new() -> Self {
        Self {
            gpu: EmulatedGpuContext::new(),
            queue: TaskQueue::new(),
            log: EventLog::new(),
            registry: ContextRegistry::new(),
        }
    }

    fn deps(&self) -> BridgeDeps {
        BridgeDeps {
            context: Some(self.gpu.clone()),
            registry: Arc::clone(&self.registry),
            task_runner: self.queue.clone(),
            observer: Some(self.log.observer()),
        }
    }

    fn bridge(&self, config: BridgeConfig) -> CanvasSurfaceBridge {
        CanvasSurfaceBridge::new(config, self.deps()).unwrap()
    }
}

fn red() -> DrawCommand {
    DrawCommand::fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Rgba8::new(255, 0, 0, 255))
}

#[test]
fn transition_table() {
    use BridgeState::*;
    assert!(ActiveAccelerated.can_transition_to(Hibernating));
    assert!(Hibernating.can_transition_to(ActiveAccelerated));
    assert!(Hibernating.can_transition_to(ActiveUnaccelerated));
    assert!(ActiveAccelerated.can_transition_to(ActiveUnaccelerated));
    assert!(ActiveUnaccelerated.can_transition_to(ActiveAccelerated));
    assert!(!ActiveUnaccelerated.can_transition_to(Hibernating));
    for s in [ActiveAccelerated, ActiveUnaccelerated, Hibernating] {
        assert!(s.can_transition_to(Destroyed));
        assert!(!Destroyed.can_transition_to(s));
    }
    assert!(!Destroyed.can_transition_to(Destroyed));
}

#[test]
fn surface_is_allocated_lazily() {
    let h = Harness::new();
    let bridge = h.bridge(BridgeConfig::with_size(4, 4));
    assert_eq!(bridge.state(), BridgeState::ActiveAccelerated);
    assert!(bridge.surface_info().is_none());
    assert_eq!(h.gpu.live_textures(), 0);

    let info = bridge.request_surface().unwrap();
    assert!(info.accelerated);
    assert_eq!(info.generation, 1);
    assert_eq!(h.gpu.live_textures(), 1);
    assert_eq!(h.registry.lease_count(h.gpu.id()), 1);
}

#[test]
fn disabled_acceleration_ignores_the_context() {
    let h = Harness::new();
    let mut config = BridgeConfig::with_size(4, 4);
    config.acceleration = AccelerationMode::Disabled;
    let bridge = h.bridge(config);
    assert_eq!(bridge.state(), BridgeState::ActiveUnaccelerated);
    assert!(!bridge.request_surface().unwrap().accelerated);
    assert!(!bridge.restore_acceleration(h.gpu.clone()));
    assert_eq!(h.gpu.live_textures(), 0);
}

#[test]
fn deferral_limit_forces_a_flush() {
    let h = Harness::new();
    let mut config = BridgeConfig::with_size(4, 4);
    config.deferral.max_recorded_ops = 2;
    let bridge = h.bridge(config);

    bridge.draw([red(), red()]);
    assert!(bridge.has_recorded_draw_commands());
    bridge.draw([red()]);
    assert!(!bridge.has_recorded_draw_commands());

    bridge.disable_deferral();
    bridge.draw([red()]);
    assert!(!bridge.has_recorded_draw_commands());
}

#[test]
fn clear_discards_the_pending_recording() {
    let h = Harness::new();
    let bridge = h.bridge(BridgeConfig::with_size(4, 4));
    bridge.draw([red(), red(), DrawCommand::clear(Rgba8::new(0, 0, 255, 255))]);
    assert_eq!(bridge.core.lock().recording.len(), 1);

    let image = bridge.snapshot(AccelerationHint::PreferNoAcceleration).unwrap();
    assert_eq!(image.pixel(0, 0).unwrap().to_array(), [0, 0, 255, 255]);
}

#[test]
fn hibernation_disabled_never_schedules() {
    let h = Harness::new();
    let mut config = BridgeConfig::with_size(4, 4);
    config.hibernation.enabled = false;
    let bridge = h.bridge(config);
    bridge.request_surface();
    bridge.set_hidden(true);
    assert_eq!(h.queue.pending_tasks(), 0);
    assert_eq!(bridge.hibernation_phase(), HibernationPhase::Idle);
    assert!(h.log.events().is_empty());
}

#[test]
fn delayed_hibernation_waits_for_virtual_time() {
    let h = Harness::new();
    let mut config = BridgeConfig::with_size(4, 4);
    config.hibernation.delay_ms = 100;
    let bridge = h.bridge(config);
    bridge.request_surface();
    bridge.set_hidden(true);

    assert_eq!(h.queue.run_until_idle(), 0);
    assert_eq!(bridge.hibernation_phase(), HibernationPhase::Scheduled);
    h.queue.advance_time(std::time::Duration::from_millis(99));
    assert_eq!(bridge.state(), BridgeState::ActiveAccelerated);
    h.queue.advance_time(std::time::Duration::from_millis(1));
    assert_eq!(bridge.state(), BridgeState::Hibernating);
}

#[test]
fn software_handoff_uses_its_own_namespace() {
    let h = Harness::new();
    let mut config = BridgeConfig::with_size(4, 4);
    config.acceleration = AccelerationMode::Disabled;
    let bridge = h.bridge(config);
    bridge.draw([red()]);

    let a = bridge.prepare_frame_handoff().unwrap();
    bridge.draw([red()]);
    let b = bridge.prepare_frame_handoff().unwrap();
    assert!(!a.is_accelerated());
    assert_ne!(a.mailbox(), b.mailbox());
    assert_eq!(a.mailbox().0[7] & 0x80, 0x80);
    match a.resource() {
        HandoffResource::SharedBitmap { pixels } => assert_eq!(&pixels[..4], &[255, 0, 0, 255]),
        HandoffResource::Texture { .. } => panic!("expected a shared bitmap"),
    }
    assert_eq!(bridge.outstanding_handoffs(), 2);
    a.release().run(None, false);
    b.release().run(None, false);
    assert_eq!(bridge.outstanding_handoffs(), 0);
}

#[test]
fn released_textures_are_recycled_into_the_next_handoff() {
    let h = Harness::new();
    let bridge = h.bridge(BridgeConfig::with_size(4, 4));
    bridge.draw([red()]);

    let first = bridge.prepare_frame_handoff().unwrap();
    let HandoffResource::Texture { texture, .. } = *first.resource() else {
        panic!("expected a texture handoff");
    };
    first.release().run(None, false);
    assert_eq!(bridge.core.lock().recycler.len(), 1);

    let second = bridge.prepare_frame_handoff().unwrap();
    let HandoffResource::Texture { texture: reused, .. } = *second.resource() else {
        panic!("expected a texture handoff");
    };
    assert_eq!(reused, texture);
    assert_eq!(h.gpu.consume_mailbox(&second.mailbox()).unwrap()[..4], [255, 0, 0, 255]);
}
