use std::sync::Arc;

use crate::clip::source::ClipSource;
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::time::reconcile::is_equal;

/// Identity of a registered clip. Ids grow with registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClipId(pub(crate) u64);

impl ClipId {
    /// Raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A clip handle held by the registry.
#[derive(Clone)]
pub struct RegisteredClip {
    /// Registry identity.
    pub id: ClipId,
    /// Caller-owned clip.
    pub source: Arc<dyn ClipSource>,
}

impl std::fmt::Debug for RegisteredClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredClip")
            .field("id", &self.id)
            .field("name", &self.source.name())
            .field("position", &self.source.position())
            .field("layer", &self.source.layer())
            .finish()
    }
}

/// Ordered set of clips placed on a timeline.
///
/// Order is `(position, layer, registration)` ascending, i.e. the bottom-to-top compositing
/// sequence.
#[derive(Debug, Default)]
pub struct ClipRegistry {
    clips: Vec<RegisteredClip>,
    next_id: u64,
}

impl ClipRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip and re-sort. Registering the same `Arc` twice is an error.
    pub fn add_clip(&mut self, source: Arc<dyn ClipSource>) -> TimelineResult<ClipId> {
        if self
            .clips
            .iter()
            .any(|c| Arc::ptr_eq(&c.source, &source))
        {
            return Err(TimelineError::invalid_clip(format!(
                "clip '{}' is already on the timeline",
                source.name()
            )));
        }

        let id = ClipId(self.next_id);
        self.next_id += 1;
        self.clips.push(RegisteredClip { id, source });
        self.sort_clips();
        Ok(id)
    }

    /// Unregister a clip; absent ids are ignored.
    pub fn remove_clip(&mut self, id: ClipId) -> Option<RegisteredClip> {
        let idx = self.clips.iter().position(|c| c.id == id)?;
        Some(self.clips.remove(idx))
    }

    /// Re-order by `(position, layer, registration)`.
    ///
    /// Positions that are [`is_equal`] to their sorted neighbour share one slot and fall
    /// through to the layer, so placements derived from different rates stack by layer.
    pub fn sort_clips(&mut self) {
        let mut by_position: Vec<(f64, RegisteredClip)> = self
            .clips
            .drain(..)
            .map(|c| (c.source.position(), c))
            .collect();
        by_position.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));

        let mut slot = 0u64;
        let mut prev: Option<f64> = None;
        let mut ranked: Vec<(u64, RegisteredClip)> = Vec::with_capacity(by_position.len());
        for (position, clip) in by_position {
            if prev.is_some_and(|p| !is_equal(p, position)) {
                slot += 1;
            }
            prev = Some(position);
            ranked.push((slot, clip));
        }

        ranked.sort_by_cached_key(|(slot, c)| (*slot, c.source.layer(), c.id));
        self.clips = ranked.into_iter().map(|(_, c)| c).collect();
    }

    /// Look up a clip by id.
    pub fn get(&self, id: ClipId) -> Option<&RegisteredClip> {
        self.clips.iter().find(|c| c.id == id)
    }

    /// Clips in compositing order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredClip> {
        self.clips.iter()
    }

    /// Number of registered clips.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// `true` when no clip is registered.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clip/registry.rs"]
mod tests;
