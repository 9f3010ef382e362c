use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::compose::frame::OutputFrame;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TimelineError, TimelineResult};

/// Store of composited frames keyed by timeline frame index.
///
/// Implementations decide eviction. Entries are shared immutably.
pub trait FrameCache: Send + Sync {
    /// Cached frame for `index`, if present.
    fn get(&self, index: FrameIndex) -> Option<Arc<OutputFrame>>;

    /// Insert or replace the frame for `index`.
    fn add(&self, index: FrameIndex, frame: Arc<OutputFrame>);

    /// Drop every entry.
    fn clear(&self);

    /// Number of cached frames.
    fn len(&self) -> usize;

    /// `true` when nothing is cached.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookup counters, for caches that keep them.
    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Lookup counters of a [`FrameCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a frame.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Frames currently held.
    pub len: usize,
}

/// In-memory least-recently-used cache bounded by frame count.
#[derive(Debug)]
pub struct LruFrameCache {
    inner: Mutex<LruCache<FrameIndex, Arc<OutputFrame>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruFrameCache {
    /// Cache holding at most `capacity` frames; `capacity` must be non-zero.
    pub fn new(capacity: usize) -> TimelineResult<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| TimelineError::validation("frame cache capacity must be >= 1"))?;
        Ok(Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Maximum number of frames held.
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<FrameIndex, Arc<OutputFrame>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FrameCache for LruFrameCache {
    fn get(&self, index: FrameIndex) -> Option<Arc<OutputFrame>> {
        let found = self.lock().get(&index).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    fn add(&self, index: FrameIndex, frame: Arc<OutputFrame>) {
        self.lock().put(index, frame);
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/frame_cache.rs"]
mod tests;
