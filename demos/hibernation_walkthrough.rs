use std::sync::Arc;

use canvas_bridge::{
    AccelerationHint, BridgeConfig, BridgeDeps, CanvasSurfaceBridge, ContextRegistry,
    DrawCommand, EmulatedGpuContext, EventLog, GpuContext, Rect, Rgba8, TaskQueue,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let gpu = EmulatedGpuContext::new();
    let queue = TaskQueue::new();
    let log = EventLog::new();
    let context: Arc<dyn GpuContext> = gpu.clone();
    let bridge = CanvasSurfaceBridge::new(
        BridgeConfig::with_size(320, 180),
        BridgeDeps {
            context: Some(context),
            registry: ContextRegistry::new(),
            task_runner: queue.clone(),
            observer: Some(log.observer()),
        },
    )?;

    bridge.draw([
        DrawCommand::clear(Rgba8::new(18, 20, 28, 255)),
        DrawCommand::fill_rect(
            Rect::new(40.0, 40.0, 280.0, 140.0),
            Rgba8::new(240, 180, 40, 255),
        ),
    ]);
    bridge.flush();
    println!("visible:    {:?}, {} texture(s)", bridge.state(), gpu.live_textures());

    bridge.set_hidden(true);
    queue.run_until_idle();
    println!("hidden:     {:?}, {} texture(s)", bridge.state(), gpu.live_textures());

    if let Some(image) = bridge.snapshot(AccelerationHint::PreferAcceleration) {
        println!(
            "snapshot:   texture-backed={}, center={:?}",
            image.is_texture_backed(),
            image.pixel(160, 90).map(|p| p.to_array())
        );
    }

    bridge.set_hidden(false);
    println!("visible:    {:?}, {} texture(s)", bridge.state(), gpu.live_textures());

    for event in log.events() {
        println!("event: {}", serde_json::to_string(&event)?);
    }
    Ok(())
}
