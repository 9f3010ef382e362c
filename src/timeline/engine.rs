//! The timeline aggregate: clip registry, decoder lifecycle, output cache and `get_frame`.
//!
//! Lock order is `session -> in_flight` and `session -> registry`. Registry writers release
//! the registry before touching the session.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;

use crate::animation::curve::Curve;
use crate::cache::frame_cache::{CacheStats, FrameCache, LruFrameCache};
use crate::clip::lifecycle::{ClipLifecycle, ClipState, LifecycleStats, SharedReader, lock_reader};
use crate::clip::registry::{ClipId, ClipRegistry, RegisteredClip};
use crate::clip::source::{ClipFrame, ClipSource};
use crate::compose::frame::{AudioBlock, OutputFrame};
use crate::compose::layer::{CompositeTarget, LayerCompositor};
use crate::compose::viewport::ViewportSample;
use crate::foundation::core::{Fps, FrameIndex, Rgba8Premul};
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::time::reconcile::{clip_sample_window, frames_for_window, local_frame, overlaps};
use crate::timeline::settings::{TimelineOpts, TimelineSettings};

struct Decoded {
    frame: ClipFrame,
    // Audio of neighbouring local frames that fall inside the output frame's sample span.
    neighbours: Vec<(u64, AudioBlock)>,
}

struct ViewState {
    background: Rgba8Premul,
    scale: Box<dyn Curve>,
    x: Box<dyn Curve>,
    y: Box<dyn Curve>,
}

impl ViewState {
    fn sample(&self, frame: FrameIndex) -> ViewportSample {
        ViewportSample {
            scale_percent: self.scale.value_at(frame),
            x: self.x.value_at(frame),
            y: self.y.value_at(frame),
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            background: Rgba8Premul::opaque_black(),
            scale: Box::new(100.0),
            x: Box::new(0.0),
            y: Box::new(0.0),
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    open: bool,
    // Bumped by open/close; work started in an older session is discarded.
    generation: u64,
    // Bumped whenever a compositing input changes; results from an older revision are not cached.
    revision: u64,
    last_served: Option<FrameIndex>,
    clips: ClipLifecycle,
}

impl Session {
    fn admit(&self, ticket: Ticket) -> TimelineResult<()> {
        if !self.open || self.generation != ticket.generation {
            return Err(TimelineError::reader_closed("timeline is not open"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct Ticket {
    generation: u64,
    revision: u64,
}

struct InFlight<'a> {
    timeline: &'a Timeline,
    index: FrameIndex,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(&self.timeline.in_flight).remove(&self.index);
        self.timeline.flight_done.notify_all();
    }
}

/// A multi-layer timeline producing composited frames on demand.
///
/// All methods take `&self`; a `Timeline` can be shared across threads behind an `Arc` and
/// serve concurrent [`get_frame`](Self::get_frame) calls.
pub struct Timeline {
    settings: RwLock<TimelineSettings>,
    opts: TimelineOpts,
    registry: RwLock<ClipRegistry>,
    view: RwLock<ViewState>,
    session: Mutex<Session>,
    in_flight: Mutex<HashSet<FrameIndex>>,
    flight_done: Condvar,
    cache: Box<dyn FrameCache>,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clips = read(&self.registry).len();
        let open = self.is_open();
        f.debug_struct("Timeline")
            .field("settings", &self.settings())
            .field("opts", &self.opts)
            .field("clips", &clips)
            .field("open", &open)
            .finish_non_exhaustive()
    }
}

impl Timeline {
    /// A closed timeline with default options.
    pub fn new(
        width: u32,
        height: u32,
        fps: Fps,
        sample_rate: u32,
        channels: u16,
    ) -> TimelineResult<Self> {
        let settings = TimelineSettings::new(width, height, fps, sample_rate, channels)?;
        Self::with_opts(settings, TimelineOpts::default())
    }

    /// A closed timeline using an in-memory LRU cache sized by `opts`.
    pub fn with_opts(settings: TimelineSettings, opts: TimelineOpts) -> TimelineResult<Self> {
        opts.validate()?;
        let cache = LruFrameCache::new(opts.cache_capacity)?;
        Self::with_cache(settings, opts, Box::new(cache))
    }

    /// A closed timeline backed by a caller-provided output cache.
    pub fn with_cache(
        settings: TimelineSettings,
        opts: TimelineOpts,
        cache: Box<dyn FrameCache>,
    ) -> TimelineResult<Self> {
        settings.validate()?;
        opts.validate()?;
        let pool = if opts.parallel {
            Some(build_thread_pool(opts.threads)?)
        } else {
            None
        };
        cache.clear();
        Ok(Self {
            settings: RwLock::new(settings),
            opts,
            registry: RwLock::new(ClipRegistry::new()),
            view: RwLock::new(ViewState::default()),
            session: Mutex::new(Session::default()),
            in_flight: Mutex::new(HashSet::new()),
            flight_done: Condvar::new(),
            cache,
            pool,
        })
    }

    /// Place a clip on the timeline. The timeline keeps a shared handle and never drops the
    /// clip's resources beyond the decode handle it opens itself.
    pub fn add_clip(&self, clip: Arc<dyn ClipSource>) -> TimelineResult<ClipId> {
        let name = clip.name().to_owned();
        let id = write(&self.registry).add_clip(clip)?;
        tracing::debug!(clip = name.as_str(), id = id.as_u64(), "clip added");
        self.invalidate("clip added");
        Ok(id)
    }

    /// Take a clip off the timeline, closing its decode handle now. Returns `false` if the
    /// clip was not registered.
    pub fn remove_clip(&self, id: ClipId) -> bool {
        let Some(removed) = write(&self.registry).remove_clip(id) else {
            return false;
        };
        tracing::debug!(clip = removed.source.name(), id = id.as_u64(), "clip removed");

        let mut session = lock(&self.session);
        session.clips.release(id);
        session.revision += 1;
        self.cache.clear();
        true
    }

    /// Re-order clips after their position or layer changed.
    pub fn sort_clips(&self) {
        write(&self.registry).sort_clips();
        self.invalidate("clips re-sorted");
    }

    /// Registered clips in compositing order.
    pub fn clips(&self) -> Vec<RegisteredClip> {
        read(&self.registry).iter().cloned().collect()
    }

    /// Start a session. Opening an open timeline does nothing.
    pub fn open(&self) {
        let mut session = lock(&self.session);
        if session.open {
            return;
        }
        session.open = true;
        session.generation += 1;
        tracing::debug!(generation = session.generation, "timeline opened");
    }

    /// End the session: close every decode handle and drop the cache. Idempotent.
    pub fn close(&self) {
        let mut session = lock(&self.session);
        if !session.open {
            return;
        }
        session.open = false;
        session.generation += 1;
        session.last_served = None;
        session.clips.close_all();
        self.cache.clear();
        tracing::debug!(generation = session.generation, "timeline closed");
    }

    /// `true` between [`open`](Self::open) and [`close`](Self::close).
    pub fn is_open(&self) -> bool {
        lock(&self.session).open
    }

    /// Open (`true`) or immediately close (`false`) one clip's decode handle.
    pub fn update_open_clips(&self, id: ClipId, is_open: bool) -> TimelineResult<()> {
        let clip = read(&self.registry)
            .get(id)
            .cloned()
            .ok_or_else(|| TimelineError::invalid_clip(format!("no clip with id {}", id.as_u64())))?;

        let mut session = lock(&self.session);
        if !session.open {
            return Err(TimelineError::reader_closed("timeline is not open"));
        }
        session.clips.update_open_clips(&clip, is_open)
    }

    /// Retire clips no longer needed around the last served frame or by in-flight requests.
    pub fn update_closed_clips(&self) {
        let mut session = lock(&self.session);
        let around = session.last_served;
        let required = self.required_clips(around);
        session.clips.update_closed_clips(&required);
    }

    /// Lifecycle state of one clip; `None` when it has no decode handle.
    pub fn clip_state(&self, id: ClipId) -> Option<ClipState> {
        lock(&self.session).clips.state(id)
    }

    /// The composited frame at `requested_frame`.
    ///
    /// Cached frames are returned without any clip I/O. Concurrent requests for the same
    /// uncached frame are computed once; the other callers wait and reuse the result.
    #[tracing::instrument(skip(self))]
    pub fn get_frame(&self, requested_frame: FrameIndex) -> TimelineResult<Arc<OutputFrame>> {
        let _flight = loop {
            self.ticket()?;
            if let Some(frame) = self.cache.get(requested_frame) {
                tracing::trace!("cache hit");
                return Ok(frame);
            }

            let pending = lock(&self.in_flight);
            if pending.contains(&requested_frame) {
                let _pending = self
                    .flight_done
                    .wait_while(pending, |p| p.contains(&requested_frame))
                    .unwrap_or_else(|e| e.into_inner());
                continue;
            }
            let mut pending = pending;
            pending.insert(requested_frame);
            break InFlight {
                timeline: self,
                index: requested_frame,
            };
        };

        // A leader may have finished between the lookup and the claim.
        if let Some(frame) = self.cache.get(requested_frame) {
            return Ok(frame);
        }

        loop {
            let ticket = self.ticket()?;
            match self.compose(requested_frame, ticket) {
                Err(e) if e.is_reader_closed() && self.superseded(ticket) => {
                    tracing::debug!("inputs changed while composing, retrying");
                }
                other => return other,
            }
        }
    }

    fn compose(&self, index: FrameIndex, ticket: Ticket) -> TimelineResult<Arc<OutputFrame>> {
        let settings = self.settings();
        let (background, viewport) = {
            let view = read(&self.view);
            (view.background, view.sample(index))
        };
        let compositor = LayerCompositor::new(CompositeTarget {
            canvas: settings.canvas(),
            fps: settings.fps,
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            background,
        });
        let mut out = compositor.begin(index)?;

        let active: Vec<(RegisteredClip, u64)> = read(&self.registry)
            .iter()
            .filter_map(|c| {
                local_frame(index, settings.fps, &c.source.timing()).map(|l| (c.clone(), l))
            })
            .collect();

        let readers = {
            let mut session = lock(&self.session);
            session.admit(ticket)?;
            if session.revision != ticket.revision {
                return Err(TimelineError::reader_closed("clip set changed"));
            }
            active
                .iter()
                .map(|(clip, _)| session.clips.ensure_open(clip))
                .collect::<TimelineResult<Vec<_>>>()?
        };

        let decoded = self.decode_all(index, &settings, &active, &readers);

        for ((clip, local), decoded) in active.iter().zip(decoded) {
            let Decoded { frame, neighbours } = decoded?;
            let source = clip.source.as_ref();
            compositor.add_layer(&mut out, &frame, source, *local, index)?;
            for (other, audio) in &neighbours {
                compositor.add_audio(&mut out, audio, source, *other)?;
            }
        }
        let frame = Arc::new(compositor.finish(out, viewport));

        let mut session = lock(&self.session);
        session.admit(ticket)?;
        if session.revision == ticket.revision {
            self.cache.add(index, Arc::clone(&frame));
        }
        session.last_served = Some(index);
        let required = self.required_clips(Some(index));
        session.clips.update_closed_clips(&required);
        tracing::debug!(layers = active.len(), "frame composed");
        Ok(frame)
    }

    fn decode_all(
        &self,
        index: FrameIndex,
        settings: &TimelineSettings,
        active: &[(RegisteredClip, u64)],
        readers: &[SharedReader],
    ) -> Vec<TimelineResult<Decoded>> {
        let decode = |((clip, local), reader): (&(RegisteredClip, u64), &SharedReader)| {
            decode_clip(index, settings, clip, *local, reader)
        };
        match &self.pool {
            Some(pool) if active.len() > 1 => pool.install(|| {
                active
                    .par_iter()
                    .zip(readers.par_iter())
                    .map(decode)
                    .collect()
            }),
            _ => active.iter().zip(readers).map(decode).collect(),
        }
    }

    // Clips overlapping the keep window around `around` or any in-flight request.
    fn required_clips(&self, around: Option<FrameIndex>) -> HashSet<ClipId> {
        let fps = self.settings().fps;
        let mut frames: Vec<FrameIndex> = lock(&self.in_flight).iter().copied().collect();
        if let Some(FrameIndex(n)) = around {
            let k = self.opts.keep_window_frames;
            frames.extend((n.saturating_sub(k)..=n.saturating_add(k)).map(FrameIndex));
        }

        read(&self.registry)
            .iter()
            .filter(|c| {
                let timing = c.source.timing();
                frames.iter().any(|f| overlaps(*f, fps, &timing))
            })
            .map(|c| c.id)
            .collect()
    }

    fn ticket(&self) -> TimelineResult<Ticket> {
        let session = lock(&self.session);
        if !session.open {
            return Err(TimelineError::reader_closed("timeline is not open"));
        }
        Ok(Ticket {
            generation: session.generation,
            revision: session.revision,
        })
    }

    // Same session still open, but the clip set or a compositing input moved on.
    fn superseded(&self, ticket: Ticket) -> bool {
        let session = lock(&self.session);
        session.open && session.generation == ticket.generation && session.revision != ticket.revision
    }

    fn invalidate(&self, reason: &str) {
        let mut session = lock(&self.session);
        session.revision += 1;
        self.cache.clear();
        tracing::debug!(reason, "output cache invalidated");
    }

    /// Current output format.
    pub fn settings(&self) -> TimelineSettings {
        *read(&self.settings)
    }

    /// Runtime options this timeline was built with.
    pub fn opts(&self) -> &TimelineOpts {
        &self.opts
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.settings().width
    }

    /// Resize the canvas horizontally.
    pub fn set_width(&self, width: u32) -> TimelineResult<()> {
        self.update_settings(|s| s.width = width)
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.settings().height
    }

    /// Resize the canvas vertically.
    pub fn set_height(&self, height: u32) -> TimelineResult<()> {
        self.update_settings(|s| s.height = height)
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.settings().fps
    }

    /// Change the output frame rate. Frame indices are re-interpreted at the new rate.
    pub fn set_fps(&self, fps: Fps) -> TimelineResult<()> {
        self.update_settings(|s| s.fps = fps)
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.settings().sample_rate
    }

    /// Output channel count.
    pub fn channels(&self) -> u16 {
        self.settings().channels
    }

    /// Color painted beneath every layer.
    pub fn background(&self) -> Rgba8Premul {
        read(&self.view).background
    }

    /// Change the background color.
    pub fn set_background(&self, color: Rgba8Premul) {
        write(&self.view).background = color;
        self.invalidate("background changed");
    }

    /// Viewport zoom curve in percent (100 = identity).
    pub fn set_viewport_scale(&self, curve: impl Curve + 'static) {
        write(&self.view).scale = Box::new(curve);
        self.invalidate("viewport scale changed");
    }

    /// Viewport horizontal offset curve in pixels.
    pub fn set_viewport_x(&self, curve: impl Curve + 'static) {
        write(&self.view).x = Box::new(curve);
        self.invalidate("viewport x changed");
    }

    /// Viewport vertical offset curve in pixels.
    pub fn set_viewport_y(&self, curve: impl Curve + 'static) {
        write(&self.view).y = Box::new(curve);
        self.invalidate("viewport y changed");
    }

    /// Viewport sampled at `frame`.
    pub fn viewport_at(&self, frame: FrameIndex) -> ViewportSample {
        read(&self.view).sample(frame)
    }

    /// Output cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Decoder churn counters.
    pub fn lifecycle_stats(&self) -> LifecycleStats {
        lock(&self.session).clips.stats()
    }

    fn update_settings(&self, edit: impl FnOnce(&mut TimelineSettings)) -> TimelineResult<()> {
        {
            let mut settings = write(&self.settings);
            let mut next = *settings;
            edit(&mut next);
            next.validate()?;
            *settings = next;
        }
        self.invalidate("settings changed");
        Ok(())
    }
}

impl Drop for Timeline {
    fn drop(&mut self) {
        self.close();
    }
}

// Decodes a clip's local frame. When the clip has audio and its local blocks do not line up
// with the timeline frame, the neighbouring local frames are decoded for their audio too.
fn decode_clip(
    index: FrameIndex,
    settings: &TimelineSettings,
    clip: &RegisteredClip,
    local: u64,
    reader: &SharedReader,
) -> TimelineResult<Decoded> {
    let mut reader = lock_reader(reader);
    let frame = reader.get_frame(local)?;
    let mut neighbours = Vec::new();
    if frame.audio.is_some() {
        let timing = clip.source.timing();
        let window =
            clip_sample_window(index, settings.fps, settings.sample_rate, timing.position)?;
        if let Some(span) = frames_for_window(&window, &timing, settings.sample_rate)? {
            for other in span.filter(|f| *f != local) {
                if let Some(audio) = reader.get_frame(other)?.audio {
                    neighbours.push((other, audio));
                }
            }
        }
    }
    Ok(Decoded { frame, neighbours })
}

// `threads` has been checked by `TimelineOpts::validate`.
fn build_thread_pool(threads: Option<usize>) -> TimelineResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TimelineError::resource_exhaustion(format!("failed to build rayon thread pool: {e}")))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/engine.rs"]
mod tests;
