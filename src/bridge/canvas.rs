use std::collections::BTreeSet;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::bridge::config::BridgeConfig;
use crate::bridge::events::{
    BridgeEvent, BridgeObserver, FallbackReason, HibernationEvent, notify,
};
use crate::bridge::hibernation::{
    AttemptConditions, AttemptDecision, HibernationController, HibernationPhase,
};
use crate::bridge::mailbox::{
    HandoffResource, MailboxHandoff, ReleaseCallback, ReleaseSink, TextureRecycler,
};
use crate::foundation::core::{AccelerationHint, AccelerationMode, SurfaceSize};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::gpu::context::{GpuContext, Mailbox, TextureId};
use crate::gpu::registry::ContextRegistry;
use crate::raster::draw::{DrawCommand, Recording};
use crate::raster::rasterizer::Rasterizer;
use crate::scheduler::task::TaskRunner;
use crate::surface::backing::Surface;
use crate::surface::factory::{SurfaceRequest, create_surface};
use crate::surface::image::Image;

/// Namespace bit for mailboxes of unaccelerated frames, keeping them apart from GPU mailboxes.
const SOFTWARE_MAILBOX_NAMESPACE: u64 = 1 << 63;

/// Lifecycle of a bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    ActiveAccelerated,
    ActiveUnaccelerated,
    Hibernating,
    Destroyed,
}

impl BridgeState {
    /// Whether the lifecycle allows moving from `self` to `next`. Destroyed is terminal.
    pub fn can_transition_to(self, next: BridgeState) -> bool {
        use BridgeState::*;
        match (self, next) {
            (Destroyed, _) => false,
            (_, Destroyed) => true,
            (ActiveAccelerated, Hibernating | ActiveUnaccelerated) => true,
            (Hibernating, ActiveAccelerated | ActiveUnaccelerated) => true,
            (ActiveUnaccelerated, ActiveAccelerated) => true,
            _ => false,
        }
    }
}

/// The current drawable target, as seen by a caller of [`CanvasSurfaceBridge::request_surface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SurfaceInfo {
    pub size: SurfaceSize,
    pub accelerated: bool,
    /// Bumped every time the bridge allocates a new surface.
    pub generation: u64,
    pub texture: Option<TextureId>,
}

/// Collaborators a bridge is wired to.
#[derive(Clone)]
pub struct BridgeDeps {
    /// `None` renders unaccelerated from the start.
    pub context: Option<Arc<dyn GpuContext>>,
    pub registry: Arc<ContextRegistry>,
    /// Runs hibernation attempts on the bridge's owning thread.
    pub task_runner: Arc<dyn TaskRunner>,
    pub observer: Option<Weak<dyn BridgeObserver>>,
}

/// Owns a canvas' drawing surface and keeps it usable across hibernation, GPU context loss and
/// allocation failure.
///
/// All methods are meant for the owning thread. Posted hibernation tasks and release callbacks
/// reach the bridge through weak handles and do nothing once it is gone.
pub struct CanvasSurfaceBridge {
    core: Arc<Mutex<BridgeCore>>,
}

struct BridgeCore {
    id: u64,
    config: BridgeConfig,
    size: SurfaceSize,
    state: BridgeState,
    surface: Option<Surface>,
    next_generation: u64,
    hidden: bool,
    hibernation: HibernationController,
    /// Drawing happened while hibernating; stay unaccelerated until visible again.
    rendering_while_hidden: bool,
    /// Acceleration failed on this context; do not try again until it is restored.
    acceleration_blocked: bool,
    /// A handed-off resource was reported lost; replace the surface on next use.
    surface_needs_reset: bool,
    /// Both links of the fallback chain failed.
    invalid: bool,
    deferral_enabled: bool,
    recording: Recording,
    rasterizer: Rasterizer,
    context: Option<Arc<dyn GpuContext>>,
    registry: Arc<ContextRegistry>,
    task_runner: Arc<dyn TaskRunner>,
    observer: Option<Weak<dyn BridgeObserver>>,
    recycler: Arc<TextureRecycler>,
    outstanding: BTreeSet<Mailbox>,
    /// Bumped whenever the surface content may have changed.
    content_version: u64,
    /// Content version and mailbox of the most recent handoff.
    last_handoff: Option<(u64, Mailbox)>,
    next_software_frame: u64,
    weak_self: Weak<Mutex<BridgeCore>>,
}

impl CanvasSurfaceBridge {
    pub fn new(config: BridgeConfig, deps: BridgeDeps) -> BridgeResult<Self> {
        config.validate()?;
        let size = config.size()?;
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        let context = match config.acceleration {
            AccelerationMode::Disabled => None,
            AccelerationMode::Enabled | AccelerationMode::Force => deps.context,
        };
        let state = if context.as_ref().is_some_and(|c| !c.is_context_lost()) {
            BridgeState::ActiveAccelerated
        } else {
            BridgeState::ActiveUnaccelerated
        };
        tracing::debug!(bridge = id, ?state, width = size.width, height = size.height, "bridge created");

        let core = Arc::new_cyclic(|weak_self| {
            Mutex::new(BridgeCore {
                id,
                size,
                state,
                surface: None,
                next_generation: 1,
                hidden: false,
                hibernation: HibernationController::default(),
                rendering_while_hidden: false,
                acceleration_blocked: false,
                surface_needs_reset: false,
                invalid: false,
                deferral_enabled: config.deferral.enabled,
                recording: Recording::default(),
                rasterizer: Rasterizer::new(),
                context,
                registry: deps.registry,
                task_runner: deps.task_runner,
                observer: deps.observer,
                recycler: TextureRecycler::new(config.max_recycled_textures),
                outstanding: BTreeSet::new(),
                content_version: 0,
                last_handoff: None,
                next_software_frame: 0,
                weak_self: weak_self.clone(),
                config,
            })
        });
        Ok(Self { core })
    }

    pub fn state(&self) -> BridgeState {
        self.core.lock().state
    }

    pub fn is_accelerated(&self) -> bool {
        self.core.lock().state == BridgeState::ActiveAccelerated
    }

    pub fn is_hidden(&self) -> bool {
        self.core.lock().hidden
    }

    pub fn is_hibernating(&self) -> bool {
        self.core.lock().state == BridgeState::Hibernating
    }

    pub fn hibernation_phase(&self) -> HibernationPhase {
        self.core.lock().hibernation.phase()
    }

    /// False once torn down or when no surface of either kind could be allocated.
    pub fn is_valid(&self) -> bool {
        let core = self.core.lock();
        core.state != BridgeState::Destroyed && !core.invalid
    }

    pub fn size(&self) -> SurfaceSize {
        self.core.lock().size
    }

    pub fn has_recorded_draw_commands(&self) -> bool {
        !self.core.lock().recording.is_empty()
    }

    /// Handoffs whose release callback has not run yet.
    pub fn outstanding_handoffs(&self) -> usize {
        self.core.lock().outstanding.len()
    }

    pub fn config(&self) -> BridgeConfig {
        self.core.lock().config.clone()
    }

    /// The current surface without allocating or waking anything.
    pub fn surface_info(&self) -> Option<SurfaceInfo> {
        self.core.lock().surface_info()
    }

    /// The surface to draw into, allocated on first use. Wakes a hibernating bridge into
    /// unaccelerated rendering. `None` when the bridge is invalid or torn down.
    #[tracing::instrument(skip(self))]
    pub fn request_surface(&self) -> Option<SurfaceInfo> {
        let mut core = self.core.lock();
        if !core.ensure_surface() {
            return None;
        }
        core.surface_info()
    }

    /// Record draw commands. They reach the surface on the next flush, or right away when
    /// deferral is off or the recording grows past its limit.
    pub fn draw<I>(&self, commands: I)
    where
        I: IntoIterator<Item = DrawCommand>,
    {
        self.core.lock().draw(commands);
    }

    /// Rasterize recorded commands and push them to the GPU.
    #[tracing::instrument(skip(self))]
    pub fn flush(&self) {
        self.core.lock().flush();
    }

    /// Flush and rasterize every later draw immediately.
    pub fn disable_deferral(&self) {
        let mut core = self.core.lock();
        core.flush();
        core.deferral_enabled = false;
    }

    /// Tell the bridge whether its canvas is visible. Hiding an accelerated bridge schedules a
    /// hibernation attempt on the task runner, tagged with the caller's location.
    #[track_caller]
    pub fn set_hidden(&self, hidden: bool) {
        self.core.lock().set_hidden(hidden);
    }

    /// Current content as an immutable image. A hibernating bridge answers from its hibernation
    /// image without waking.
    #[tracing::instrument(skip(self))]
    pub fn snapshot(&self, hint: AccelerationHint) -> Option<Image> {
        self.core.lock().snapshot(hint)
    }

    /// Export the current frame. `None` when there is nothing to export, the GPU context is
    /// lost, or this frame is already handed off and not yet released; a failed export leaves the
    /// bridge as it was.
    #[tracing::instrument(skip(self))]
    pub fn prepare_frame_handoff(&self) -> Option<MailboxHandoff> {
        self.core.lock().prepare_frame_handoff()
    }

    /// Switch to a fresh GPU context after the previous one was lost. Returns whether the bridge
    /// will render accelerated.
    pub fn restore_acceleration(&self, context: Arc<dyn GpuContext>) -> bool {
        self.core.lock().restore_acceleration(context)
    }

    /// Release every resource and refuse later work. Also runs on drop.
    pub fn begin_teardown(&self) {
        self.core.lock().teardown();
    }
}

impl Drop for CanvasSurfaceBridge {
    fn drop(&mut self) {
        self.core.lock().teardown();
    }
}

impl std::fmt::Debug for CanvasSurfaceBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.lock();
        f.debug_struct("CanvasSurfaceBridge")
            .field("id", &core.id)
            .field("state", &core.state)
            .field("size", &core.size)
            .field("hidden", &core.hidden)
            .finish()
    }
}

impl ReleaseSink for Mutex<BridgeCore> {
    fn handoff_released(&self, mailbox: Mailbox, resource_lost: bool) {
        self.lock().handoff_released(mailbox, resource_lost);
    }
}

fn attempt_hibernation(core: Weak<Mutex<BridgeCore>>, observer: Option<Weak<dyn BridgeObserver>>) {
    match core.upgrade() {
        Some(core) => core.lock().attempt_hibernation(),
        None => {
            tracing::debug!("hibernation attempt outlived its bridge");
            notify(
                observer.as_ref(),
                HibernationEvent::HibernationAbortedDueToPendingDestruction.into(),
            );
        }
    }
}

impl BridgeCore {
    fn report(&self, event: BridgeEvent) {
        tracing::debug!(bridge = self.id, state = ?self.state, ?event, "bridge event");
        notify(self.observer.as_ref(), event);
    }

    fn transition(&mut self, next: BridgeState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::error!(bridge = self.id, from = ?self.state, to = ?next, "refused state transition");
            return;
        }
        tracing::debug!(bridge = self.id, from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    fn context_lost(&self) -> bool {
        self.context.as_ref().is_some_and(|c| c.is_context_lost())
    }

    fn can_accelerate(&self) -> bool {
        let usable = self.context.as_ref().is_some_and(|c| !c.is_context_lost());
        usable && (!self.acceleration_blocked || self.config.acceleration == AccelerationMode::Force)
    }

    fn surface_info(&self) -> Option<SurfaceInfo> {
        self.surface.as_ref().map(|s| SurfaceInfo {
            size: s.size(),
            accelerated: s.is_accelerated(),
            generation: s.generation(),
            texture: s.texture(),
        })
    }

    /// Allocate a surface, walking the fallback chain when `accelerated` is requested, and seed
    /// it with `pixels`. Moves the state to match what was allocated.
    fn install_surface(&mut self, accelerated: bool, pixels: Option<Vec<u8>>) -> bool {
        self.surface = None;
        let generation = self.next_generation;
        self.next_generation += 1;
        let context = if accelerated { self.context.clone() } else { None };
        let outcome = create_surface(SurfaceRequest {
            size: self.size,
            opacity: self.config.opacity,
            generation,
            context: context.as_ref(),
            registry: &self.registry,
            max_software_pixels: self.config.max_software_pixels,
        });

        if let Some(err) = &outcome.accelerated_error {
            let reason = if err.is_context_lost() {
                FallbackReason::ContextLost
            } else {
                FallbackReason::AllocationFailed
            };
            // Force keeps retrying after allocation failures; a lost context never comes back.
            if reason == FallbackReason::ContextLost
                || self.config.acceleration != AccelerationMode::Force
            {
                self.acceleration_blocked = true;
            }
            self.report(BridgeEvent::FellBackToUnaccelerated { reason });
        }

        let fell_back = outcome.fell_back();
        let Some(mut surface) = outcome.surface else {
            if let Some(err) = &outcome.software_error {
                tracing::warn!(bridge = self.id, generation, %err, "no surface of either kind could be allocated");
            }
            self.invalid = true;
            self.recording.clear();
            if self.state == BridgeState::ActiveAccelerated || self.state == BridgeState::Hibernating {
                self.transition(BridgeState::ActiveUnaccelerated);
            }
            self.report(BridgeEvent::SurfaceCreationFailed);
            return false;
        };
        self.invalid = false;
        if fell_back {
            tracing::debug!(bridge = self.id, generation, "rendering unaccelerated after fallback");
        }
        if let Some(pixels) = pixels
            && let Err(err) = surface.write_pixels(&pixels)
        {
            tracing::warn!(bridge = self.id, %err, "could not carry content into new surface");
        }
        let next = if surface.is_accelerated() {
            BridgeState::ActiveAccelerated
        } else {
            BridgeState::ActiveUnaccelerated
        };
        self.surface = Some(surface);
        self.content_version += 1;
        self.transition(next);
        true
    }

    /// Drop to unaccelerated rendering, keeping whatever content is still on the CPU side.
    fn fall_back(&mut self, reason: FallbackReason) -> bool {
        tracing::warn!(bridge = self.id, ?reason, "falling back to unaccelerated rendering");
        let pixels = self.surface.as_ref().map(|s| s.cpu_pixels().to_vec());
        self.surface = None;
        self.acceleration_blocked = true;
        self.report(BridgeEvent::FellBackToUnaccelerated { reason });
        self.install_surface(false, pixels)
    }

    /// Make sure a usable surface exists. False if the bridge is invalid or torn down.
    fn ensure_surface(&mut self) -> bool {
        match self.state {
            BridgeState::Destroyed => return false,
            BridgeState::Hibernating => {
                self.surface_needs_reset = false;
                return self.wake_for_background_rendering();
            }
            BridgeState::ActiveAccelerated | BridgeState::ActiveUnaccelerated => {}
        }
        if self.invalid {
            return false;
        }
        if self.surface_needs_reset {
            self.surface_needs_reset = false;
            if let Some(old) = &self.surface {
                tracing::debug!(bridge = self.id, generation = old.generation(), "replacing surface after lost handoff");
                let pixels = Some(old.cpu_pixels().to_vec());
                let accelerated = self.state == BridgeState::ActiveAccelerated && self.can_accelerate();
                return self.install_surface(accelerated, pixels);
            }
        }
        match self.surface.as_ref().map(Surface::is_valid) {
            Some(true) => true,
            Some(false) => self.fall_back(FallbackReason::ContextLost),
            None => {
                let accelerated = self.state == BridgeState::ActiveAccelerated;
                self.install_surface(accelerated, None)
            }
        }
    }

    fn draw<I>(&mut self, commands: I)
    where
        I: IntoIterator<Item = DrawCommand>,
    {
        if self.state == BridgeState::Destroyed || self.invalid {
            return;
        }
        if self.state == BridgeState::Hibernating && !self.wake_for_background_rendering() {
            return;
        }
        for cmd in commands {
            self.recording.push(cmd);
        }
        if !self.deferral_enabled || self.recording.len() > self.config.deferral.max_recorded_ops {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if !self.ensure_surface() {
            self.recording.clear();
            return;
        }
        let recording = std::mem::take(&mut self.recording);
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if !recording.is_empty() {
            self.content_version += 1;
        }
        if let Err(err) = surface.apply(&mut self.rasterizer, recording.ops()) {
            tracing::warn!(bridge = self.id, %err, "dropping recorded commands");
        }
        match surface.flush() {
            Ok(()) => {}
            Err(err) if err.is_context_lost() => {
                // The staging pixmap already holds this frame; it carries over.
                self.fall_back(FallbackReason::ContextLost);
            }
            Err(err) => tracing::warn!(bridge = self.id, %err, "surface flush failed"),
        }
    }

    #[track_caller]
    fn set_hidden(&mut self, hidden: bool) {
        if self.state == BridgeState::Destroyed || self.hidden == hidden {
            return;
        }
        self.hidden = hidden;
        if hidden {
            self.schedule_hibernation();
            return;
        }
        if self.state == BridgeState::Hibernating {
            self.wake_normally();
        } else if self.rendering_while_hidden {
            self.rendering_while_hidden = false;
            if self.state == BridgeState::ActiveUnaccelerated && self.can_accelerate() {
                let pixels = self.surface.as_ref().map(|s| s.cpu_pixels().to_vec());
                if self.install_surface(true, pixels) && self.state == BridgeState::ActiveAccelerated {
                    tracing::debug!(bridge = self.id, "re-accelerated after background rendering");
                }
            }
        }
    }

    #[track_caller]
    fn schedule_hibernation(&mut self) {
        if !self.config.hibernation.enabled
            || self.state != BridgeState::ActiveAccelerated
            || !self.hibernation.try_schedule()
        {
            return;
        }
        self.report(HibernationEvent::HibernationScheduled.into());
        let core = self.weak_self.clone();
        let observer = self.observer.clone();
        self.task_runner.post_delayed_task(
            Location::caller(),
            Box::new(move || attempt_hibernation(core, observer)),
            self.config.hibernation_delay(),
        );
    }

    #[tracing::instrument(skip(self), fields(bridge = self.id))]
    fn attempt_hibernation(&mut self) {
        let conditions = AttemptConditions {
            destroyed: self.state == BridgeState::Destroyed,
            hidden: self.hidden,
            context_lost: self.context_lost(),
            // A bridge that never drew allocates its surface during the commit.
            has_accelerated_surface: self.state == BridgeState::ActiveAccelerated
                && self.surface.as_ref().is_none_or(Surface::is_accelerated),
        };
        match self.hibernation.decide(conditions) {
            AttemptDecision::Abort(event) => {
                tracing::debug!(bridge = self.id, ?event, "hibernation aborted");
                self.report(event.into());
            }
            AttemptDecision::Commit => self.commit_hibernation(),
        }
    }

    fn commit_hibernation(&mut self) {
        self.flush();
        if self.context_lost() {
            self.report(HibernationEvent::HibernationAbortedDueGpuContextLoss.into());
            return;
        }
        let Some(surface) = self.surface.as_mut().filter(|s| s.is_accelerated()) else {
            self.report(HibernationEvent::HibernationAbortedBecauseNoSurface.into());
            return;
        };
        match surface.read_back() {
            Ok(pixels) => {
                self.surface = None;
                self.hibernation.enter(pixels);
                self.transition(BridgeState::Hibernating);
                self.report(HibernationEvent::DidStartHibernating.into());
            }
            Err(err) if err.is_context_lost() => {
                self.report(HibernationEvent::HibernationAbortedDueGpuContextLoss.into());
            }
            Err(err) => {
                tracing::warn!(bridge = self.id, %err, "could not read back surface for hibernation");
                self.report(HibernationEvent::HibernationAbortedBecauseNoSurface.into());
            }
        }
    }

    /// Leave hibernation because the canvas became visible.
    fn wake_normally(&mut self) {
        let pixels = self.hibernation.wake();
        self.report(HibernationEvent::HibernationEndedNormally.into());
        let accelerated = self.can_accelerate();
        self.install_surface(accelerated, pixels);
    }

    /// Leave hibernation because something draws while hidden. Stays unaccelerated until visible.
    fn wake_for_background_rendering(&mut self) -> bool {
        let pixels = self.hibernation.wake();
        self.report(HibernationEvent::HibernationEndedWithSwitchToBackgroundRendering.into());
        self.rendering_while_hidden = true;
        self.install_surface(false, pixels)
    }

    fn snapshot(&mut self, hint: AccelerationHint) -> Option<Image> {
        match self.state {
            BridgeState::Destroyed => return None,
            BridgeState::Hibernating => {
                let pixels = self.hibernation.image()?.to_vec();
                return Some(Image::from_pixels(self.size, pixels));
            }
            BridgeState::ActiveAccelerated | BridgeState::ActiveUnaccelerated => {}
        }
        self.flush();
        let surface = self.surface.as_mut()?;
        match surface.snapshot(hint) {
            Ok(image) => Some(image),
            Err(err) if err.is_context_lost() => {
                if !self.fall_back(FallbackReason::ContextLost) {
                    return None;
                }
                self.surface.as_mut()?.snapshot(hint).ok()
            }
            Err(err) => {
                tracing::warn!(bridge = self.id, %err, "snapshot failed");
                None
            }
        }
    }

    fn prepare_frame_handoff(&mut self) -> Option<MailboxHandoff> {
        if matches!(self.state, BridgeState::Destroyed | BridgeState::Hibernating) {
            return None;
        }
        if self.context_lost() {
            tracing::debug!(bridge = self.id, "no handoff: gpu context lost");
            return None;
        }
        self.flush();
        if let Some((version, mailbox)) = self.last_handoff
            && version == self.content_version
            && self.outstanding.contains(&mailbox)
        {
            tracing::debug!(bridge = self.id, mailbox = %mailbox.to_hex(), "no handoff: frame already handed off");
            return None;
        }
        let surface = self.surface.as_ref()?;
        let generation = surface.generation();
        let handoff = match surface.texture() {
            Some(texture) => self.export_texture(texture, generation),
            None => {
                let pixels: Arc<[u8]> = Arc::from(surface.cpu_pixels());
                Ok(self.export_bitmap(pixels, generation))
            }
        };
        match handoff {
            Ok(handoff) => {
                self.outstanding.insert(handoff.mailbox);
                self.last_handoff = Some((self.content_version, handoff.mailbox));
                Some(handoff)
            }
            Err(err) => {
                tracing::warn!(bridge = self.id, %err, "frame handoff failed");
                None
            }
        }
    }

    fn export_texture(&self, source: TextureId, generation: u64) -> BridgeResult<MailboxHandoff> {
        let context = self
            .context
            .clone()
            .ok_or_else(|| BridgeError::validation("accelerated surface without a context"))?;
        let texture = match self.recycler.take(context.id(), self.size) {
            Some(recycled) => match context.copy_texture_to(source, recycled) {
                Ok(()) => recycled,
                Err(err) => {
                    context.delete_texture(recycled);
                    return Err(err);
                }
            },
            None => context.copy_texture(source)?,
        };
        let exported = context
            .produce_mailbox(texture)
            .and_then(|mailbox| Ok((mailbox, context.gen_sync_token()?)));
        let (mailbox, sync_token) = match exported {
            Ok(v) => v,
            Err(err) => {
                context.delete_texture(texture);
                return Err(err);
            }
        };
        tracing::debug!(
            bridge = self.id,
            generation,
            texture = texture.0,
            pooled = self.recycler.len(),
            "exporting texture frame"
        );
        let sink: Weak<dyn ReleaseSink> = self.weak_self.clone();
        Ok(MailboxHandoff {
            mailbox,
            size: self.size,
            generation,
            resource: HandoffResource::Texture {
                context: context.id(),
                texture,
                sync_token,
            },
            release: ReleaseCallback::new(
                mailbox,
                self.size,
                Some((context, texture)),
                Arc::clone(&self.recycler),
                sink,
            ),
        })
    }

    fn export_bitmap(&mut self, pixels: Arc<[u8]>, generation: u64) -> MailboxHandoff {
        self.next_software_frame += 1;
        let mailbox = Mailbox::from_parts(
            SOFTWARE_MAILBOX_NAMESPACE | self.id,
            self.next_software_frame,
        );
        let sink: Weak<dyn ReleaseSink> = self.weak_self.clone();
        MailboxHandoff {
            mailbox,
            size: self.size,
            generation,
            resource: HandoffResource::SharedBitmap { pixels },
            release: ReleaseCallback::new(mailbox, self.size, None, Arc::clone(&self.recycler), sink),
        }
    }

    fn handoff_released(&mut self, mailbox: Mailbox, resource_lost: bool) {
        if self.state == BridgeState::Destroyed {
            return;
        }
        let tracked = self.outstanding.remove(&mailbox);
        if resource_lost && tracked {
            tracing::debug!(bridge = self.id, mailbox = %mailbox.to_hex(), "handoff resource lost");
            self.surface_needs_reset = true;
            self.report(BridgeEvent::HandoffResourceLost);
        }
    }

    fn restore_acceleration(&mut self, context: Arc<dyn GpuContext>) -> bool {
        if self.state == BridgeState::Destroyed
            || self.config.acceleration == AccelerationMode::Disabled
            || context.is_context_lost()
        {
            return false;
        }
        self.recycler.purge_except(Some(context.id()));
        self.context = Some(context);
        self.acceleration_blocked = false;
        self.invalid = false;

        match self.state {
            BridgeState::Hibernating => return true,
            BridgeState::ActiveUnaccelerated if self.rendering_while_hidden => return false,
            _ => {}
        }
        let pixels = self.surface.as_ref().map(|s| s.cpu_pixels().to_vec());
        if !self.install_surface(true, pixels) || self.state != BridgeState::ActiveAccelerated {
            return false;
        }
        self.report(BridgeEvent::AccelerationRestored);
        true
    }

    fn teardown(&mut self) {
        if self.state == BridgeState::Destroyed {
            return;
        }
        if let Some(event) = self.hibernation.teardown() {
            self.report(event.into());
        }
        self.recording.clear();
        self.surface = None;
        self.outstanding.clear();
        self.last_handoff = None;
        self.recycler.close();
        self.transition(BridgeState::Destroyed);
        tracing::debug!(bridge = self.id, "bridge torn down");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/canvas.rs"]
mod tests;
