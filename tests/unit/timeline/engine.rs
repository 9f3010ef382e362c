use super::*;
use crate::test_support::CountingClip;
use std::sync::atomic::Ordering;

fn timeline(parallel: bool) -> Timeline {
    let settings = TimelineSettings::new(2, 2, Fps::new(30, 1).unwrap(), 48_000, 2).unwrap();
    let opts = TimelineOpts {
        cache_capacity: 16,
        keep_window_frames: 1,
        parallel,
        threads: Some(2),
    };
    Timeline::with_opts(settings, opts).unwrap()
}

#[test]
fn closed_timeline_refuses_frames() {
    let tl = timeline(false);
    let err = tl.get_frame(FrameIndex(0)).unwrap_err();
    assert!(err.is_reader_closed());
}

#[test]
fn open_and_close_are_idempotent() {
    let tl = timeline(false);
    tl.open();
    tl.open();
    assert!(tl.is_open());
    tl.close();
    tl.close();
    assert!(!tl.is_open());
}

#[test]
fn cache_hit_skips_clip_io() {
    let tl = timeline(false);
    let clip = CountingClip::new("a", 0.0, 0, 30);
    let counters = Arc::clone(&clip.counters);
    tl.add_clip(Arc::new(clip)).unwrap();
    tl.open();

    let first = tl.get_frame(FrameIndex(3)).unwrap();
    let second = tl.get_frame(FrameIndex(3)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(counters.decodes(), 1);
    assert_eq!(tl.cache_stats().hits, 1);
}

#[test]
fn clips_outside_the_window_are_retired_in_two_steps() {
    let tl = timeline(false);
    let early = CountingClip::new("early", 0.0, 0, 3);
    let late = CountingClip::new("late", 1.0, 0, 30);
    let early_counters = Arc::clone(&early.counters);
    let early_id = tl.add_clip(Arc::new(early)).unwrap();
    tl.add_clip(Arc::new(late)).unwrap();
    tl.open();

    tl.get_frame(FrameIndex(0)).unwrap();
    assert_eq!(tl.clip_state(early_id), Some(ClipState::Open));

    // Frame 30 is far from the early clip; first sweep marks it, second tears it down.
    tl.get_frame(FrameIndex(30)).unwrap();
    assert_eq!(tl.clip_state(early_id), Some(ClipState::Closing));
    tl.get_frame(FrameIndex(31)).unwrap();
    assert_eq!(tl.clip_state(early_id), None);
    assert_eq!(early_counters.closes(), 1);
}

#[test]
fn stepping_back_resurrects_a_closing_clip() {
    let tl = timeline(false);
    let a = CountingClip::new("a", 0.0, 0, 3);
    let counters = Arc::clone(&a.counters);
    let id = tl.add_clip(Arc::new(a)).unwrap();
    tl.open();

    tl.get_frame(FrameIndex(0)).unwrap();
    tl.get_frame(FrameIndex(10)).unwrap();
    assert_eq!(tl.clip_state(id), Some(ClipState::Closing));

    tl.get_frame(FrameIndex(1)).unwrap();
    assert_eq!(tl.clip_state(id), Some(ClipState::Open));
    assert_eq!(counters.opens(), 1);
    assert_eq!(tl.lifecycle_stats().resurrected, 1);
}

#[test]
fn update_open_clips_checks_session_and_id() {
    let tl = timeline(false);
    let id = tl.add_clip(Arc::new(CountingClip::new("a", 0.0, 0, 3))).unwrap();

    let err = tl.update_open_clips(id, true).unwrap_err();
    assert!(err.is_reader_closed());

    tl.open();
    tl.update_open_clips(id, true).unwrap();
    assert_eq!(tl.clip_state(id), Some(ClipState::Open));
    tl.update_open_clips(id, false).unwrap();
    assert_eq!(tl.clip_state(id), None);

    assert!(tl.remove_clip(id));
    let err = tl.update_open_clips(id, true).unwrap_err();
    assert!(matches!(err, TimelineError::InvalidClip(_)));
}

#[test]
fn manual_sweep_retires_idle_clips() {
    let tl = timeline(false);
    let id = tl.add_clip(Arc::new(CountingClip::new("a", 0.0, 0, 3))).unwrap();
    tl.open();
    tl.update_open_clips(id, true).unwrap();

    tl.update_closed_clips();
    assert_eq!(tl.clip_state(id), Some(ClipState::Closing));
    tl.update_closed_clips();
    assert_eq!(tl.clip_state(id), None);
}

#[test]
fn setters_invalidate_the_cache() {
    let tl = timeline(false);
    tl.add_clip(Arc::new(CountingClip::new("a", 0.0, 0, 30)))
        .unwrap();
    tl.open();

    let before = tl.get_frame(FrameIndex(0)).unwrap();
    tl.set_background(Rgba8Premul::from_straight_rgba(255, 0, 0, 255));
    let after = tl.get_frame(FrameIndex(0)).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));

    tl.set_width(4).unwrap();
    assert_eq!(tl.get_frame(FrameIndex(0)).unwrap().image.width, 4);
    assert!(tl.set_height(0).is_err());
    assert_eq!(tl.height(), 2);
}

#[test]
fn decode_failure_reaches_the_caller_and_is_not_cached() {
    let tl = timeline(true);
    let clip = CountingClip::new("a", 0.0, 0, 30);
    let counters = Arc::clone(&clip.counters);
    tl.add_clip(Arc::new(clip)).unwrap();
    tl.add_clip(Arc::new(CountingClip::new("b", 0.0, 1, 30)))
        .unwrap();
    tl.open();

    counters.fail_decode.store(true, Ordering::SeqCst);
    let err = tl.get_frame(FrameIndex(0)).unwrap_err();
    assert!(matches!(err, TimelineError::Decode(_)));
    assert_eq!(tl.cache_stats().len, 0);

    counters.fail_decode.store(false, Ordering::SeqCst);
    assert!(tl.get_frame(FrameIndex(0)).is_ok());
}

#[test]
fn open_failure_is_not_retried() {
    let tl = timeline(false);
    let clip = CountingClip::new("a", 0.0, 0, 30);
    clip.counters.fail_open.store(true, Ordering::SeqCst);
    tl.add_clip(Arc::new(clip)).unwrap();
    tl.open();

    let err = tl.get_frame(FrameIndex(0)).unwrap_err();
    assert!(matches!(err, TimelineError::ResourceExhaustion(_)));
    assert_eq!(tl.lifecycle_stats().opened, 0);
}

#[test]
fn viewport_curves_are_sampled_per_frame() {
    let tl = timeline(false);
    tl.set_viewport_x(crate::animation::curve::Keyframes::constant(3.0));
    assert_eq!(tl.viewport_at(FrameIndex(9)).x, 3.0);
    assert_eq!(tl.viewport_at(FrameIndex(9)).scale_percent, 100.0);
}

#[test]
fn frame_past_the_sample_clock_is_a_validation_error() {
    let tl = timeline(false);
    let clip = CountingClip::new("a", 0.0, 0, 30);
    let counters = Arc::clone(&clip.counters);
    tl.add_clip(Arc::new(clip)).unwrap();
    tl.open();

    let err = tl.get_frame(FrameIndex(u64::MAX)).unwrap_err();
    assert!(matches!(err, TimelineError::Validation(_)));
    assert_eq!(tl.cache_stats().len, 0);

    // The failed request leaves nothing in flight.
    assert!(tl.get_frame(FrameIndex(0)).is_ok());
    assert_eq!(counters.opens(), 1);
}

#[test]
fn zero_worker_threads_are_rejected_before_building_a_pool() {
    let settings = TimelineSettings::new(2, 2, Fps::new(30, 1).unwrap(), 48_000, 2).unwrap();
    let opts = TimelineOpts {
        threads: Some(0),
        ..TimelineOpts::default()
    };
    let err = Timeline::with_opts(settings, opts).unwrap_err();
    assert!(matches!(err, TimelineError::Validation(_)));
}
