use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// What a display handle refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Thumbnail for a frame or overlay image.
    Preview,
    /// The finished video.
    Output,
}

/// Revocable reference to displayable bytes.
///
/// Handles are plain tokens; the [`HandleRegistry`] that issued them decides whether they are
/// still live. Releasing is explicit, nothing happens on drop.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DisplayHandle {
    id: u64,
    kind: HandleKind,
}

impl DisplayHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }
}

/// Issues display handles and tracks which are still live.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    live: Mutex<BTreeMap<u64, HandleKind>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, kind: HandleKind) -> DisplayHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live_map().insert(id, kind);
        DisplayHandle { id, kind }
    }

    /// Release `handle`. Returns `false` when it was already released.
    pub fn release(&self, handle: &DisplayHandle) -> bool {
        self.live_map().remove(&handle.id).is_some()
    }

    pub fn is_live(&self, handle: &DisplayHandle) -> bool {
        self.live_map().contains_key(&handle.id)
    }

    /// Number of live handles of `kind`.
    pub fn live_count(&self, kind: HandleKind) -> usize {
        self.live_map().values().filter(|k| **k == kind).count()
    }

    fn live_map(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, HandleKind>> {
        // A poisoned map is still a consistent set of ids.
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }
}
