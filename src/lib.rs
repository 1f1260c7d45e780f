//! Surface lifecycle management for GPU-backed 2D canvases.
//!
//! A [`CanvasSurfaceBridge`] owns a canvas' drawing surface. It allocates accelerated surfaces
//! lazily, falls back to CPU rendering when the GPU fails, releases GPU memory while the canvas is
//! hidden (hibernation) and exports frames to a compositor through mailboxes with release
//! callbacks.
#![forbid(unsafe_code)]

mod bridge;
mod foundation;
mod gpu;
mod raster;
pub mod scenario;
mod scheduler;
mod surface;

pub use bridge::canvas::{BridgeDeps, BridgeState, CanvasSurfaceBridge, SurfaceInfo};
pub use bridge::config::{BridgeConfig, DeferralConfig, HibernationConfig};
pub use bridge::events::{BridgeEvent, BridgeObserver, EventLog, FallbackReason, HibernationEvent};
pub use bridge::hibernation::HibernationPhase;
pub use bridge::mailbox::{HandoffResource, MailboxHandoff, ReleaseCallback};
pub use foundation::core::{
    AccelerationHint, AccelerationMode, Affine, BezPath, OpacityMode, Rect, Rgba8, Rgba8Premul,
    SurfaceSize,
};
pub use foundation::error::{BridgeError, BridgeResult};
pub use gpu::context::{ContextId, GpuContext, Mailbox, SyncToken, TextureId};
pub use gpu::emulated::EmulatedGpuContext;
pub use gpu::registry::{ContextRegistry, RegistryLease};
pub use raster::draw::DrawCommand;
pub use scenario::{Scenario, ScenarioOutcome, ScenarioReport, Step, run_scenario};
pub use scheduler::task::{PostedFrom, Task, TaskQueue, TaskRunner};
pub use surface::image::Image;
