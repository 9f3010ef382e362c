//! Decode-handle bookkeeping for the clips a timeline has opened.
//!
//! Each clip is `Closed` (absent), `Open`, or `Closing`. Retirement is two-phase: a clip that
//! drops out of the required set is first marked `Closing` and only torn down if it is still
//! not required on the next sweep. A request that needs a `Closing` clip resurrects it without
//! reopening the decoder.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::clip::registry::{ClipId, RegisteredClip};
use crate::clip::source::{ClipFrame, ClipReader};
use crate::foundation::error::{TimelineError, TimelineResult};

/// Where a clip sits in the retirement cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipState {
    /// Decode handle live and required.
    Open,
    /// Handle still live, scheduled for teardown on the next sweep.
    Closing,
}

/// Counters describing decoder churn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    /// Decode handles acquired.
    pub opened: u64,
    /// Decode handles released.
    pub closed: u64,
    /// `Closing` clips brought back to `Open` without reopening.
    pub resurrected: u64,
    /// Handles currently live (`Open` plus `Closing`).
    pub live: usize,
}

/// One clip's decode handle. `None` once released.
pub struct ReaderSlot {
    name: String,
    reader: Option<Box<dyn ClipReader>>,
}

impl ReaderSlot {
    /// Decode a local frame. Fails with `ReaderClosed` after the handle was released.
    pub fn get_frame(&mut self, local_frame: u64) -> TimelineResult<ClipFrame> {
        match self.reader.as_mut() {
            Some(reader) => reader.get_frame(local_frame),
            None => Err(TimelineError::reader_closed(format!(
                "clip '{}' was closed",
                self.name
            ))),
        }
    }

    fn shutdown(&mut self) -> bool {
        match self.reader.take() {
            Some(mut reader) => {
                reader.close();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ReaderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSlot")
            .field("name", &self.name)
            .field("open", &self.reader.is_some())
            .finish()
    }
}

/// Shared handle to a reader slot; each slot has its own lock so clips decode independently.
pub type SharedReader = Arc<Mutex<ReaderSlot>>;

/// Lock a reader slot, tolerating poison left by a panicking decoder.
pub fn lock_reader(reader: &SharedReader) -> MutexGuard<'_, ReaderSlot> {
    reader.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug)]
struct ClipSlot {
    state: ClipState,
    reader: SharedReader,
}

/// Open/Closing map. At most one decode handle exists per clip.
#[derive(Debug, Default)]
pub struct ClipLifecycle {
    slots: HashMap<ClipId, ClipSlot>,
    stats: LifecycleStats,
}

impl ClipLifecycle {
    /// Nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a clip, `None` when closed.
    pub fn state(&self, id: ClipId) -> Option<ClipState> {
        self.slots.get(&id).map(|s| s.state)
    }

    /// Churn counters.
    pub fn stats(&self) -> LifecycleStats {
        LifecycleStats {
            live: self.slots.len(),
            ..self.stats
        }
    }

    /// Return the clip's live handle, opening it if needed and resurrecting it if `Closing`.
    pub fn ensure_open(&mut self, clip: &RegisteredClip) -> TimelineResult<SharedReader> {
        if let Some(slot) = self.slots.get_mut(&clip.id) {
            if slot.state == ClipState::Closing {
                slot.state = ClipState::Open;
                self.stats.resurrected += 1;
                tracing::debug!(clip = clip.source.name(), id = clip.id.as_u64(), "clip resurrected");
            }
            return Ok(Arc::clone(&slot.reader));
        }

        let reader = clip.source.open()?;
        let shared = Arc::new(Mutex::new(ReaderSlot {
            name: clip.source.name().to_owned(),
            reader: Some(reader),
        }));
        self.slots.insert(
            clip.id,
            ClipSlot {
                state: ClipState::Open,
                reader: Arc::clone(&shared),
            },
        );
        self.stats.opened += 1;
        tracing::debug!(clip = clip.source.name(), id = clip.id.as_u64(), "clip opened");
        Ok(shared)
    }

    /// `true` opens (or resurrects) the clip; `false` releases its handle immediately.
    pub fn update_open_clips(&mut self, clip: &RegisteredClip, is_open: bool) -> TimelineResult<()> {
        if is_open {
            self.ensure_open(clip).map(|_| ())
        } else {
            self.release(clip.id);
            Ok(())
        }
    }

    /// Tear down a clip's handle now. Returns `false` if it was not open.
    pub fn release(&mut self, id: ClipId) -> bool {
        let Some(slot) = self.slots.remove(&id) else {
            return false;
        };
        self.teardown(id, slot);
        true
    }

    /// Mark-then-sweep against the set of clips still needed.
    ///
    /// Required clips end up `Open`. Unrequired `Open` clips become `Closing`; unrequired
    /// clips that were already `Closing` are torn down.
    pub fn update_closed_clips(&mut self, required: &HashSet<ClipId>) {
        let mut doomed = Vec::new();
        for (id, slot) in &mut self.slots {
            match (required.contains(id), slot.state) {
                (true, ClipState::Closing) => {
                    slot.state = ClipState::Open;
                    self.stats.resurrected += 1;
                }
                (true, ClipState::Open) => {}
                (false, ClipState::Open) => slot.state = ClipState::Closing,
                (false, ClipState::Closing) => doomed.push(*id),
            }
        }

        for id in doomed {
            if let Some(slot) = self.slots.remove(&id) {
                self.teardown(id, slot);
            }
        }
    }

    /// Release every handle.
    pub fn close_all(&mut self) {
        let slots: Vec<_> = self.slots.drain().collect();
        for (id, slot) in slots {
            self.teardown(id, slot);
        }
    }

    fn teardown(&mut self, id: ClipId, slot: ClipSlot) {
        // Waits for any decode in progress on this clip.
        let mut reader = lock_reader(&slot.reader);
        if reader.shutdown() {
            self.stats.closed += 1;
            tracing::debug!(clip = reader.name.as_str(), id = id.as_u64(), "clip closed");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clip/lifecycle.rs"]
mod tests;
