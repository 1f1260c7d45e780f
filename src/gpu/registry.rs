use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::gpu::context::ContextId;

/// Tracks which GPU contexts currently back live accelerated surfaces.
///
/// The registry is handed to every bridge at construction instead of living in a process-wide
/// static, so embedders (and tests) decide its scope.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    leases: Mutex<BTreeMap<ContextId, usize>>,
}

impl ContextRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register one more user of `context`. The registration ends when the lease drops.
    pub fn acquire(self: &Arc<Self>, context: ContextId) -> RegistryLease {
        let mut leases = self.leases.lock();
        *leases.entry(context).or_insert(0) += 1;
        tracing::trace!(context = context.0, "context lease acquired");
        RegistryLease {
            registry: Arc::clone(self),
            context,
        }
    }

    pub fn live_contexts(&self) -> Vec<ContextId> {
        self.leases.lock().keys().copied().collect()
    }

    pub fn lease_count(&self, context: ContextId) -> usize {
        self.leases.lock().get(&context).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.leases.lock().is_empty()
    }

    fn release(&self, context: ContextId) {
        let mut leases = self.leases.lock();
        if let Some(count) = leases.get_mut(&context) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                leases.remove(&context);
            }
        }
        tracing::trace!(context = context.0, "context lease released");
    }
}

/// RAII registration of a context in a [`ContextRegistry`].
#[derive(Debug)]
pub struct RegistryLease {
    registry: Arc<ContextRegistry>,
    context: ContextId,
}

impl RegistryLease {
    pub fn context(&self) -> ContextId {
        self.context
    }
}

impl Drop for RegistryLease {
    fn drop(&mut self) {
        self.registry.release(self.context);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/registry.rs"]
mod tests;
