use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::foundation::core::SurfaceSize;
use crate::gpu::context::{ContextId, GpuContext, Mailbox, SyncToken, TextureId};

/// What a handoff exports.
#[derive(Clone, Debug)]
pub enum HandoffResource {
    /// A GPU texture, readable by the consumer once it waits on `sync_token`.
    Texture {
        context: ContextId,
        texture: TextureId,
        sync_token: SyncToken,
    },
    /// Premultiplied RGBA8 pixels of an unaccelerated frame.
    SharedBitmap { pixels: Arc<[u8]> },
}

/// One frame exported to the compositor.
///
/// The consumer must eventually run [`MailboxHandoff::release`]'s callback exactly once; dropping
/// the callback unrun releases the resource without recycling it.
pub struct MailboxHandoff {
    pub(crate) mailbox: Mailbox,
    pub(crate) size: SurfaceSize,
    pub(crate) generation: u64,
    pub(crate) resource: HandoffResource,
    pub(crate) release: ReleaseCallback,
}

impl MailboxHandoff {
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Generation of the surface the frame was taken from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn resource(&self) -> &HandoffResource {
        &self.resource
    }

    pub fn is_accelerated(&self) -> bool {
        matches!(self.resource, HandoffResource::Texture { .. })
    }

    pub fn release(&self) -> ReleaseCallback {
        self.release.clone()
    }

    pub fn into_release(self) -> ReleaseCallback {
        self.release
    }
}

impl std::fmt::Debug for MailboxHandoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxHandoff")
            .field("mailbox", &self.mailbox.to_hex())
            .field("size", &self.size)
            .field("generation", &self.generation)
            .field("accelerated", &self.is_accelerated())
            .finish()
    }
}

/// The producing side of a handoff, notified when its consumer releases.
pub(crate) trait ReleaseSink: Send + Sync {
    fn handoff_released(&self, mailbox: Mailbox, resource_lost: bool);
}

struct RecycledTexture {
    context: Arc<dyn GpuContext>,
    size: SurfaceSize,
    texture: TextureId,
}

#[derive(Default)]
struct RecyclerState {
    textures: Vec<RecycledTexture>,
    closed: bool,
}

/// Pool of released handoff textures, shared between a bridge and its release callbacks.
///
/// Callbacks may run after the bridge is gone; once closed the pool deletes whatever it is
/// handed instead of keeping it.
pub(crate) struct TextureRecycler {
    capacity: usize,
    state: Mutex<RecyclerState>,
}

impl TextureRecycler {
    pub(crate) fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            state: Mutex::new(RecyclerState::default()),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().textures.len()
    }

    /// Keep `texture` for reuse, or delete it if the pool is closed or full.
    pub(crate) fn put(&self, context: Arc<dyn GpuContext>, size: SurfaceSize, texture: TextureId) {
        let mut st = self.state.lock();
        if st.closed || st.textures.len() >= self.capacity || context.is_context_lost() {
            drop(st);
            context.delete_texture(texture);
            return;
        }
        st.textures.push(RecycledTexture {
            context,
            size,
            texture,
        });
    }

    /// Take a texture of `size` that lives on `context`.
    pub(crate) fn take(&self, context: ContextId, size: SurfaceSize) -> Option<TextureId> {
        let mut st = self.state.lock();
        let idx = st
            .textures
            .iter()
            .position(|t| t.context.id() == context && t.size == size)?;
        Some(st.textures.swap_remove(idx).texture)
    }

    /// Delete every pooled texture not on `keep`.
    pub(crate) fn purge_except(&self, keep: Option<ContextId>) {
        let stale: Vec<RecycledTexture> = {
            let mut st = self.state.lock();
            let (kept, stale): (Vec<_>, Vec<_>) = std::mem::take(&mut st.textures)
                .into_iter()
                .partition(|t| Some(t.context.id()) == keep);
            st.textures = kept;
            stale
        };
        for t in stale {
            t.context.delete_texture(t.texture);
        }
    }

    /// Delete everything pooled and refuse later returns.
    pub(crate) fn close(&self) {
        let textures = {
            let mut st = self.state.lock();
            st.closed = true;
            std::mem::take(&mut st.textures)
        };
        for t in textures {
            t.context.delete_texture(t.texture);
        }
    }
}

struct ExportedTexture {
    context: Arc<dyn GpuContext>,
    texture: TextureId,
}

pub(crate) struct ReleaseState {
    mailbox: Mailbox,
    size: SurfaceSize,
    texture: Option<ExportedTexture>,
    recycler: Arc<TextureRecycler>,
    sink: Weak<dyn ReleaseSink>,
    released: AtomicBool,
}

impl ReleaseState {
    fn finish(&self, sync_token: Option<SyncToken>, resource_lost: bool, reusable: bool) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(t) = &self.texture {
            if resource_lost || !reusable {
                t.context.delete_texture(t.texture);
            } else {
                if let Some(token) = sync_token {
                    t.context.wait_sync_token(&token);
                }
                self.recycler
                    .put(Arc::clone(&t.context), self.size, t.texture);
            }
        }
        if let Some(sink) = self.sink.upgrade() {
            sink.handoff_released(self.mailbox, resource_lost);
        }
        true
    }
}

impl Drop for ReleaseState {
    fn drop(&mut self) {
        if !self.released.load(Ordering::Acquire) {
            tracing::debug!(
                mailbox = %self.mailbox.to_hex(),
                "release callback dropped without running"
            );
            self.finish(None, false, false);
        }
    }
}

/// Returns a handed-off resource to its producer.
///
/// Cheap to clone and safe to run from any thread, including after the bridge is gone. Only the
/// first run has an effect.
#[derive(Clone)]
pub struct ReleaseCallback {
    state: Arc<ReleaseState>,
}

impl ReleaseCallback {
    pub(crate) fn new(
        mailbox: Mailbox,
        size: SurfaceSize,
        texture: Option<(Arc<dyn GpuContext>, TextureId)>,
        recycler: Arc<TextureRecycler>,
        sink: Weak<dyn ReleaseSink>,
    ) -> Self {
        Self {
            state: Arc::new(ReleaseState {
                mailbox,
                size,
                texture: texture.map(|(context, texture)| ExportedTexture { context, texture }),
                recycler,
                sink,
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Report the consumer is done. `sync_token` orders the release after the consumer's reads;
    /// `resource_lost` says the consumer could not use the resource and it must not be reused.
    pub fn run(&self, sync_token: Option<SyncToken>, resource_lost: bool) {
        if !self.state.finish(sync_token, resource_lost, true) {
            tracing::warn!(
                mailbox = %self.state.mailbox.to_hex(),
                "release callback ran more than once; ignoring"
            );
        }
    }

    pub fn has_run(&self) -> bool {
        self.state.released.load(Ordering::Acquire)
    }

    pub fn mailbox(&self) -> Mailbox {
        self.state.mailbox
    }
}

impl std::fmt::Debug for ReleaseCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseCallback")
            .field("mailbox", &self.state.mailbox.to_hex())
            .field("has_run", &self.has_run())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/mailbox.rs"]
mod tests;
