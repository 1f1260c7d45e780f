use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::core::SurfaceSize;
use crate::foundation::error::BridgeResult;

/// Identifies one GPU context for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ContextId(pub u64);

impl ContextId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to a texture owned by a [`GpuContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct TextureId(pub u64);

/// Opaque, thread-crossable name of a GPU resource exported to a consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mailbox(pub [u8; 16]);

impl Mailbox {
    /// Build a name from a namespace and a sequence number.
    pub fn from_parts(namespace: u64, sequence: u64) -> Self {
        let mut name = [0u8; 16];
        name[..8].copy_from_slice(&namespace.to_le_bytes());
        name[8..].copy_from_slice(&sequence.to_le_bytes());
        Self(name)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl serde::Serialize for Mailbox {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

/// Ordering primitive exchanged between producer and consumer of a mailbox.
///
/// Waiting on a token orders later GPU work after everything the issuing side submitted
/// before generating it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SyncToken {
    pub context: ContextId,
    pub release_count: u64,
}

/// The GPU device a canvas renders through.
///
/// Every fallible call fails with [`crate::BridgeError::ContextLost`] once the context is lost.
/// Implementations are shared between the owning thread and compositor threads, so they must be
/// internally synchronized.
pub trait GpuContext: Send + Sync {
    fn id(&self) -> ContextId;

    fn is_context_lost(&self) -> bool;

    /// Allocate a texture initialized to transparent black.
    fn create_texture(&self, size: SurfaceSize) -> BridgeResult<TextureId>;

    /// Replace a texture's contents with premultiplied RGBA8 pixels.
    fn write_texture(&self, texture: TextureId, pixels: &[u8]) -> BridgeResult<()>;

    /// Read back a texture's premultiplied RGBA8 pixels.
    fn read_texture(&self, texture: TextureId) -> BridgeResult<Vec<u8>>;

    /// Copy a texture into a newly allocated one.
    fn copy_texture(&self, source: TextureId) -> BridgeResult<TextureId>;

    /// Copy a texture into an existing texture of the same size.
    fn copy_texture_to(&self, source: TextureId, dest: TextureId) -> BridgeResult<()>;

    /// Release a texture. Unknown ids are ignored, and so is a lost context.
    fn delete_texture(&self, texture: TextureId);

    /// Export a texture under a fresh, unique mailbox name.
    fn produce_mailbox(&self, texture: TextureId) -> BridgeResult<Mailbox>;

    fn gen_sync_token(&self) -> BridgeResult<SyncToken>;

    fn wait_sync_token(&self, token: &SyncToken);
}
