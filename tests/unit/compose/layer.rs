use super::*;
use crate::clip::source::{BlendMode, ClipReader};
use crate::sources::color::{ColorClip, ToneSpec};

fn target() -> CompositeTarget {
    CompositeTarget {
        canvas: Canvas {
            width: 4,
            height: 2,
        },
        fps: Fps::new(30, 1).unwrap(),
        sample_rate: 48_000,
        channels: 2,
        background: Rgba8Premul::from_straight_rgba(0, 0, 255, 255),
    }
}

fn solid(r: u8, g: u8, b: u8) -> ColorClip {
    ColorClip::new(
        Rgba8Premul::from_straight_rgba(r, g, b, 255),
        4,
        2,
        Fps::new(30, 1).unwrap(),
        30,
    )
}

fn decode(clip: &ColorClip, local: u64) -> ClipFrame {
    clip.open().unwrap().get_frame(local).unwrap()
}

#[test]
fn empty_frame_is_background_and_silence() {
    let comp = LayerCompositor::new(target());
    let partial = comp.begin(FrameIndex(3)).unwrap();
    assert_eq!(partial.layers(), 0);
    let out = comp.finish(partial, ViewportSample::default());
    assert_eq!(out.index, FrameIndex(3));
    assert_eq!(out.image.pixel(0, 0), Some([0, 0, 255, 255]));
    assert_eq!(out.audio.samples(), 1600);
    assert!(out.audio.is_silent());
}

#[test]
fn later_layers_cover_earlier_ones() {
    let comp = LayerCompositor::new(target());
    let red = solid(255, 0, 0);
    let green = solid(0, 255, 0);

    let mut partial = comp.begin(FrameIndex(0)).unwrap();
    comp.add_layer(&mut partial, &decode(&red, 0), &red, 0, FrameIndex(0))
        .unwrap();
    comp.add_layer(&mut partial, &decode(&green, 0), &green, 0, FrameIndex(0))
        .unwrap();
    let out = comp.finish(partial, ViewportSample::default());
    assert_eq!(out.image.pixel(2, 1), Some([0, 255, 0, 255]));
}

#[test]
fn transparent_clip_leaves_lower_layers_visible() {
    let comp = LayerCompositor::new(target());
    let red = solid(255, 0, 0);
    let ghost = solid(0, 255, 0).with_opacity(0.0);

    let mut partial = comp.begin(FrameIndex(0)).unwrap();
    comp.add_layer(&mut partial, &decode(&red, 0), &red, 0, FrameIndex(0))
        .unwrap();
    comp.add_layer(&mut partial, &decode(&ghost, 0), &ghost, 0, FrameIndex(0))
        .unwrap();
    let out = comp.finish(partial, ViewportSample::default());
    assert_eq!(out.image.pixel(0, 0), Some([255, 0, 0, 255]));
}

#[test]
fn clip_blend_mode_is_honoured() {
    let comp = LayerCompositor::new(target());
    let base = solid(200, 0, 0);
    let add = solid(100, 0, 0).with_blend(BlendMode::Add);

    let mut partial = comp.begin(FrameIndex(0)).unwrap();
    comp.add_layer(&mut partial, &decode(&base, 0), &base, 0, FrameIndex(0))
        .unwrap();
    comp.add_layer(&mut partial, &decode(&add, 0), &add, 0, FrameIndex(0))
        .unwrap();
    let out = comp.finish(partial, ViewportSample::default());
    assert_eq!(out.image.pixel(0, 0), Some([255, 0, 0, 255]));
}

#[test]
fn audio_is_summed_scaled_and_clamped() {
    let comp = LayerCompositor::new(target());
    let tone = ToneSpec {
        level: 0.4,
        sample_rate: 48_000,
        channels: 1,
    };
    let a = solid(0, 0, 0).with_tone(tone);
    let b = solid(0, 0, 0).with_tone(tone).with_volume(0.5);
    let c = solid(0, 0, 0).with_tone(ToneSpec { level: 0.9, ..tone });

    let mut partial = comp.begin(FrameIndex(0)).unwrap();
    comp.add_layer(&mut partial, &decode(&a, 0), &a, 0, FrameIndex(0))
        .unwrap();
    comp.add_layer(&mut partial, &decode(&b, 0), &b, 0, FrameIndex(0))
        .unwrap();
    assert!((partial.audio.interleaved_f32[0] - 0.6).abs() < 1e-6);
    // Mono fans out to both output channels.
    assert!((partial.audio.interleaved_f32[1] - 0.6).abs() < 1e-6);

    comp.add_layer(&mut partial, &decode(&c, 0), &c, 0, FrameIndex(0))
        .unwrap();
    let out = comp.finish(partial, ViewportSample::default());
    assert!(out.audio.interleaved_f32.iter().all(|s| *s == 1.0));
}

#[test]
fn mismatched_sample_rate_audio_is_skipped() {
    let comp = LayerCompositor::new(target());
    let a = solid(0, 0, 0).with_tone(ToneSpec {
        level: 0.5,
        sample_rate: 44_100,
        channels: 2,
    });
    let mut partial = comp.begin(FrameIndex(0)).unwrap();
    comp.add_layer(&mut partial, &decode(&a, 0), &a, 0, FrameIndex(0))
        .unwrap();
    let out = comp.finish(partial, ViewportSample::default());
    assert!(out.audio.is_silent());
}

#[test]
fn layer_for_another_frame_is_rejected() {
    let comp = LayerCompositor::new(target());
    let red = solid(255, 0, 0);
    let mut partial = comp.begin(FrameIndex(1)).unwrap();
    let err = comp
        .add_layer(&mut partial, &decode(&red, 0), &red, 0, FrameIndex(2))
        .unwrap_err();
    assert!(matches!(err, TimelineError::Validation(_)));
}

#[test]
fn frame_without_audio_span_is_rejected() {
    let comp = LayerCompositor::new(target());
    let err = comp.begin(FrameIndex(u64::MAX)).unwrap_err();
    assert!(matches!(err, TimelineError::Validation(_)));
}

#[test]
fn clip_audio_is_placed_on_the_timeline_sample_clock() {
    let comp = LayerCompositor::new(target());
    // 24fps blocks are 2000 samples; timeline frame 1 covers samples [1600, 3200).
    let clip = ColorClip::new(Rgba8Premul::opaque_black(), 1, 1, Fps::new(24, 1).unwrap(), 48)
        .with_tone(ToneSpec {
            level: 0.5,
            sample_rate: 48_000,
            channels: 2,
        });

    let mut partial = comp.begin(FrameIndex(1)).unwrap();
    comp.add_layer(&mut partial, &decode(&clip, 1), &clip, 1, FrameIndex(1))
        .unwrap();
    let audio = &partial.audio.interleaved_f32;
    // Only [2000, 3200) comes from local frame 1.
    assert!(audio[..400 * 2].iter().all(|s| *s == 0.0));
    assert!(audio[400 * 2..].iter().all(|s| *s == 0.5));

    let earlier = decode(&clip, 0).audio.unwrap();
    comp.add_audio(&mut partial, &earlier, &clip, 0).unwrap();
    assert!(partial.audio.interleaved_f32.iter().all(|s| *s == 0.5));
}
