//! Mapping between the global timeline clock and clip-local frame numbers.
//!
//! Frame-to-time and frame-to-sample conversions are carried out in integer arithmetic on the
//! rational rate and divided once at the end, so nothing accumulates over long timelines.
//! Epsilon comparison is reserved for the boundary checks that follow a conversion.

use std::ops::{Range, RangeInclusive};

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{TimelineError, TimelineResult};

/// Tolerance used when comparing two time values (seconds) derived from different rates.
pub const TIME_EPSILON: f64 = 1e-6;

/// Compare two time values with [`TIME_EPSILON`] tolerance.
pub fn is_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < TIME_EPSILON
}

/// Absolute time (seconds) of `frame` under `fps`: `frame * den / num`.
pub fn calculate_time(frame: FrameIndex, fps: Fps) -> f64 {
    let scaled = u128::from(frame.0) * u128::from(fps.den);
    scaled as f64 / f64::from(fps.num)
}

/// Placement of one clip on the timeline, as seen by the reconciler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipTiming {
    /// Timeline start time in seconds.
    pub position: f64,
    /// The clip's own frame rate.
    pub fps: Fps,
    /// Intrinsic length in clip-local frames.
    pub duration_frames: u64,
}

/// Local frame of a clip for timeline frame `frame`, or `None` when the clip does not overlap.
///
/// `local = round((time(frame) - position) * clip_fps)`, overlapping iff the clip has started
/// (within [`TIME_EPSILON`]) and `local < duration_frames`.
pub fn local_frame(frame: FrameIndex, timeline_fps: Fps, clip: &ClipTiming) -> Option<u64> {
    if clip.duration_frames == 0 {
        return None;
    }
    let delta = calculate_time(frame, timeline_fps) - clip.position;
    if !delta.is_finite() {
        return None;
    }
    if delta < 0.0 && !is_equal(delta, 0.0) {
        return None;
    }

    let local = (delta.max(0.0) * f64::from(clip.fps.num) / f64::from(clip.fps.den)).round();
    if local >= clip.duration_frames as f64 {
        return None;
    }
    Some(local as u64)
}

/// `true` when the clip contributes to timeline frame `frame`.
pub fn overlaps(frame: FrameIndex, timeline_fps: Fps, clip: &ClipTiming) -> bool {
    local_frame(frame, timeline_fps, clip).is_some()
}

/// Absolute sample position at which timeline frame `frame` begins.
///
/// `round(frame * sample_rate * den / num)`, computed exactly. Fails with
/// [`TimelineError::Validation`] when the position does not fit in a `u64`.
pub fn sample_offset(frame: FrameIndex, fps: Fps, sample_rate: u32) -> TimelineResult<u64> {
    let num = u128::from(frame.0)
        .checked_mul(u128::from(sample_rate))
        .and_then(|v| v.checked_mul(u128::from(fps.den)))
        .and_then(|v| v.checked_add(u128::from(fps.num) / 2));
    num.and_then(|v| u64::try_from(v / u128::from(fps.num)).ok())
        .ok_or_else(|| {
            TimelineError::validation(format!(
                "frame {} has no representable sample position at {sample_rate} Hz",
                frame.0
            ))
        })
}

/// Number of audio samples (per channel) that belong to timeline frame `frame`.
///
/// The count varies between neighbours when `sample_rate / fps` is not integral; summing it over
/// `[0, N)` gives exactly `sample_offset(N)`.
pub fn samples_per_frame(frame: FrameIndex, fps: Fps, sample_rate: u32) -> TimelineResult<u32> {
    let next = frame
        .0
        .checked_add(1)
        .ok_or_else(|| TimelineError::validation("frame index at the end of the timeline"))?;
    let start = sample_offset(frame, fps, sample_rate)?;
    let end = sample_offset(FrameIndex(next), fps, sample_rate)?;
    u32::try_from(end - start).map_err(|_| {
        TimelineError::validation(format!(
            "frame {} spans more than {} samples",
            frame.0,
            u32::MAX
        ))
    })
}

/// Samples of a clip starting at `position` seconds that timeline frame `frame` plays, counted
/// from the clip's first sample. The range starts below zero while the clip has not begun.
pub fn clip_sample_window(
    frame: FrameIndex,
    timeline_fps: Fps,
    sample_rate: u32,
    position: f64,
) -> TimelineResult<Range<i64>> {
    let start = i64::try_from(sample_offset(frame, timeline_fps, sample_rate)?)
        .map_err(|_| TimelineError::validation(format!("frame {} is out of range", frame.0)))?;
    let len = i64::from(samples_per_frame(frame, timeline_fps, sample_rate)?);
    let clip_start = (position * f64::from(sample_rate)).round();
    if !clip_start.is_finite() || clip_start.abs() >= i64::MAX as f64 {
        return Err(TimelineError::validation(format!(
            "clip position {position} is out of range"
        )));
    }
    let start = start - clip_start as i64;
    Ok(start..start + len)
}

/// Local frame of a clip at `fps` whose audio block holds clip sample `sample`.
pub fn frame_at_sample(sample: u64, fps: Fps, sample_rate: u32) -> TimelineResult<u64> {
    if sample_rate == 0 {
        return Ok(0);
    }
    let per_second = u128::from(sample_rate) * u128::from(fps.den);
    let guess = u128::from(sample) * u128::from(fps.num) / per_second;
    let mut frame = u64::try_from(guess).unwrap_or(u64::MAX);
    // Block boundaries are rounded, so the estimate can be one off either way.
    while frame > 0 && sample_offset(FrameIndex(frame), fps, sample_rate)? > sample {
        frame -= 1;
    }
    while frame < u64::MAX && sample_offset(FrameIndex(frame + 1), fps, sample_rate)? <= sample {
        frame += 1;
    }
    Ok(frame)
}

/// Clip-local frames whose audio intersects `window`, limited to the clip's length, or `None`
/// when the window lies entirely outside the clip.
pub fn frames_for_window(
    window: &Range<i64>,
    clip: &ClipTiming,
    sample_rate: u32,
) -> TimelineResult<Option<RangeInclusive<u64>>> {
    if window.end <= 0 || window.is_empty() || clip.duration_frames == 0 {
        return Ok(None);
    }
    let first = frame_at_sample(window.start.max(0).unsigned_abs(), clip.fps, sample_rate)?;
    let last = frame_at_sample((window.end - 1).unsigned_abs(), clip.fps, sample_rate)?
        .min(clip.duration_frames - 1);
    Ok((first <= last).then_some(first..=last))
}

#[cfg(test)]
#[path = "../../tests/unit/time/reconcile.rs"]
mod tests;
