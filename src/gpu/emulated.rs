use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::gpu::context::{ContextId, GpuContext, Mailbox, SyncToken, TextureId};

struct Texture {
    size: SurfaceSize,
    pixels: Vec<u8>,
}

#[derive(Default)]
struct DeviceState {
    textures: HashMap<TextureId, Texture>,
    mailboxes: HashMap<Mailbox, TextureId>,
    next_texture: u64,
    next_mailbox: u64,
    release_count: u64,
    lost: bool,
    failing_allocations: u32,
    max_texture_bytes: Option<usize>,
    waited: Vec<SyncToken>,
}

/// In-memory GPU device.
///
/// Textures are plain byte buffers. Besides backing the scenario runner, it lets tests inject the
/// two failures the bridge has to survive: context loss and allocation failure.
pub struct EmulatedGpuContext {
    id: ContextId,
    state: Mutex<DeviceState>,
}

impl EmulatedGpuContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ContextId::next(),
            state: Mutex::new(DeviceState::default()),
        })
    }

    /// Mark the context lost. Live textures become unreadable.
    pub fn lose_context(&self) {
        let mut st = self.state.lock();
        if !st.lost {
            tracing::warn!(context = self.id.0, "emulated gpu context lost");
        }
        st.lost = true;
        st.textures.clear();
        st.mailboxes.clear();
    }

    /// Make the next `count` texture allocations fail.
    pub fn fail_next_allocations(&self, count: u32) {
        self.state.lock().failing_allocations = count;
    }

    /// Cap total texture memory; allocations beyond it fail.
    pub fn set_max_texture_bytes(&self, max: Option<usize>) {
        self.state.lock().max_texture_bytes = max;
    }

    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    pub fn has_texture(&self, texture: TextureId) -> bool {
        self.state.lock().textures.contains_key(&texture)
    }

    pub fn texture_bytes(&self) -> usize {
        self.state
            .lock()
            .textures
            .values()
            .map(|t| t.pixels.len())
            .sum()
    }

    pub fn waited_sync_tokens(&self) -> Vec<SyncToken> {
        self.state.lock().waited.clone()
    }

    /// Resolve a mailbox back to the texture it names, as a consumer would.
    pub fn consume_mailbox(&self, mailbox: &Mailbox) -> BridgeResult<Vec<u8>> {
        let st = self.state.lock();
        self.check_alive(&st)?;
        let texture = st
            .mailboxes
            .get(mailbox)
            .ok_or_else(|| BridgeError::validation("unknown mailbox"))?;
        Ok(Self::texture(&st, *texture)?.pixels.clone())
    }

    fn check_alive(&self, st: &DeviceState) -> BridgeResult<()> {
        if st.lost {
            return Err(BridgeError::context_lost(format!(
                "context {} is lost",
                self.id.0
            )));
        }
        Ok(())
    }

    fn texture(st: &DeviceState, texture: TextureId) -> BridgeResult<&Texture> {
        st.textures
            .get(&texture)
            .ok_or_else(|| BridgeError::validation(format!("unknown texture {}", texture.0)))
    }

    fn alloc(&self, st: &mut DeviceState, size: SurfaceSize) -> BridgeResult<TextureId> {
        self.check_alive(st)?;
        if st.failing_allocations > 0 {
            st.failing_allocations -= 1;
            return Err(BridgeError::allocation(format!(
                "injected failure allocating {}x{} texture",
                size.width, size.height
            )));
        }
        if let Some(max) = st.max_texture_bytes {
            let used: usize = st.textures.values().map(|t| t.pixels.len()).sum();
            if used.saturating_add(size.byte_len()) > max {
                return Err(BridgeError::allocation("texture memory budget exhausted"));
            }
        }
        st.next_texture += 1;
        let id = TextureId(st.next_texture);
        st.textures.insert(
            id,
            Texture {
                size,
                pixels: vec![0; size.byte_len()],
            },
        );
        Ok(id)
    }
}

impl GpuContext for EmulatedGpuContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn is_context_lost(&self) -> bool {
        self.state.lock().lost
    }

    fn create_texture(&self, size: SurfaceSize) -> BridgeResult<TextureId> {
        let mut st = self.state.lock();
        self.alloc(&mut st, size)
    }

    fn write_texture(&self, texture: TextureId, pixels: &[u8]) -> BridgeResult<()> {
        let mut st = self.state.lock();
        self.check_alive(&st)?;
        let tex = st
            .textures
            .get_mut(&texture)
            .ok_or_else(|| BridgeError::validation(format!("unknown texture {}", texture.0)))?;
        if tex.pixels.len() != pixels.len() {
            return Err(BridgeError::validation(format!(
                "texture {} expects {} bytes, got {}",
                texture.0,
                tex.pixels.len(),
                pixels.len()
            )));
        }
        tex.pixels.copy_from_slice(pixels);
        Ok(())
    }

    fn read_texture(&self, texture: TextureId) -> BridgeResult<Vec<u8>> {
        let st = self.state.lock();
        self.check_alive(&st)?;
        Ok(Self::texture(&st, texture)?.pixels.clone())
    }

    fn copy_texture(&self, source: TextureId) -> BridgeResult<TextureId> {
        let mut st = self.state.lock();
        self.check_alive(&st)?;
        let (size, pixels) = {
            let src = Self::texture(&st, source)?;
            (src.size, src.pixels.clone())
        };
        let id = self.alloc(&mut st, size)?;
        if let Some(dst) = st.textures.get_mut(&id) {
            dst.pixels = pixels;
        }
        Ok(id)
    }

    fn copy_texture_to(&self, source: TextureId, dest: TextureId) -> BridgeResult<()> {
        let mut st = self.state.lock();
        self.check_alive(&st)?;
        let (size, pixels) = {
            let src = Self::texture(&st, source)?;
            (src.size, src.pixels.clone())
        };
        let dst = st
            .textures
            .get_mut(&dest)
            .ok_or_else(|| BridgeError::validation(format!("unknown texture {}", dest.0)))?;
        if dst.size != size {
            return Err(BridgeError::validation("copy between textures of different size"));
        }
        dst.pixels = pixels;
        Ok(())
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut st = self.state.lock();
        st.textures.remove(&texture);
        st.mailboxes.retain(|_, t| *t != texture);
    }

    fn produce_mailbox(&self, texture: TextureId) -> BridgeResult<Mailbox> {
        let mut st = self.state.lock();
        self.check_alive(&st)?;
        Self::texture(&st, texture)?;
        st.next_mailbox += 1;
        let mailbox = Mailbox::from_parts(self.id.0, st.next_mailbox);
        st.mailboxes.insert(mailbox, texture);
        Ok(mailbox)
    }

    fn gen_sync_token(&self) -> BridgeResult<SyncToken> {
        let mut st = self.state.lock();
        self.check_alive(&st)?;
        st.release_count += 1;
        Ok(SyncToken {
            context: self.id,
            release_count: st.release_count,
        })
    }

    fn wait_sync_token(&self, token: &SyncToken) {
        let mut st = self.state.lock();
        if st.lost {
            return;
        }
        st.waited.push(*token);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/emulated.rs"]
mod tests;
