use std::sync::Arc;

use crate::foundation::core::SourceBlob;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::handles::{DisplayHandle, HandleKind, HandleRegistry};

/// Opaque frame identity, unique within its [`FrameSequence`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

/// One still image in the timeline.
///
/// Position is owned by the sequence, not stored on the item.
#[derive(Clone, Debug)]
pub struct FrameItem {
    pub id: FrameId,
    pub source: SourceBlob,
    pub preview: DisplayHandle,
    /// Overrides the configured per-image duration for this frame only.
    pub delay_ms: Option<u32>,
}

impl FrameItem {
    /// Playlist duration of this frame in seconds.
    pub fn duration_secs(&self, default_secs: f64) -> f64 {
        match self.delay_ms {
            Some(ms) if ms > 0 => f64::from(ms) / 1000.0,
            _ => default_secs,
        }
    }
}

/// Ordered, caller-mutable list of frames that owns their preview handles.
#[derive(Debug)]
pub struct FrameSequence {
    handles: Arc<HandleRegistry>,
    items: Vec<FrameItem>,
    next_id: u64,
}

impl FrameSequence {
    pub fn new(handles: Arc<HandleRegistry>) -> Self {
        Self {
            handles,
            items: Vec::new(),
            next_id: 0,
        }
    }

    pub fn items(&self) -> &[FrameItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append blobs in order, creating one frame (and preview handle) per blob.
    pub fn extend_from_blobs(&mut self, blobs: impl IntoIterator<Item = SourceBlob>) -> Vec<FrameId> {
        let mut added = Vec::new();
        for source in blobs {
            self.next_id += 1;
            let id = FrameId(self.next_id);
            let preview = self.handles.create(HandleKind::Preview);
            self.items.push(FrameItem {
                id,
                source,
                preview,
                delay_ms: None,
            });
            added.push(id);
        }
        added
    }

    pub fn position(&self, id: FrameId) -> Option<usize> {
        self.items.iter().position(|f| f.id == id)
    }

    /// Remove a frame and release its preview. Returns `false` for unknown ids.
    pub fn remove(&mut self, id: FrameId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let item = self.items.remove(idx);
        self.handles.release(&item.preview);
        true
    }

    /// Move the frame at `from` so that it ends up at index `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> ReelResult<()> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(ReelError::validation(format!(
                "frame index out of range (from {from}, to {to}, len {len})"
            )));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    pub fn set_delay(&mut self, id: FrameId, delay_ms: Option<u32>) -> ReelResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| ReelError::validation(format!("unknown frame id {}", id.0)))?;
        item.delay_ms = delay_ms;
        Ok(())
    }

    /// Drop every frame and release all previews.
    pub fn reset(&mut self) {
        for item in self.items.drain(..) {
            self.handles.release(&item.preview);
        }
    }

    /// Copy of the current order, taken when a conversion starts staging.
    pub fn snapshot(&self) -> Vec<FrameItem> {
        self.items.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ingest/sequence.rs"]
mod tests;
