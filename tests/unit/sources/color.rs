use super::*;

#[test]
fn reader_yields_filled_picture_and_tone() {
    let clip = ColorClip::new(
        Rgba8Premul::from_straight_rgba(255, 0, 0, 255),
        2,
        2,
        Fps::new(25, 1).unwrap(),
        10,
    )
    .with_tone(ToneSpec {
        level: 0.25,
        sample_rate: 48_000,
        channels: 2,
    });

    let mut reader = clip.open().unwrap();
    let frame = reader.get_frame(3).unwrap();
    let image = frame.image.unwrap();
    assert_eq!(image.pixel(1, 1), Some([255, 0, 0, 255]));

    let audio = frame.audio.unwrap();
    assert_eq!(audio.samples(), 1920);
    assert!(audio.interleaved_f32.iter().all(|s| *s == 0.25));
}

#[test]
fn placement_is_mutable_through_shared_reference() {
    let clip = ColorClip::new(Rgba8Premul::opaque_black(), 1, 1, Fps::new(30, 1).unwrap(), 5)
        .at(2.0)
        .on_layer(3)
        .named("matte");
    assert_eq!(clip.name(), "matte");
    assert_eq!(clip.position(), 2.0);
    assert_eq!(clip.layer(), 3);

    clip.set_position(0.5);
    clip.set_layer(-1);
    assert_eq!(clip.timing().position, 0.5);
    assert_eq!(clip.layer(), -1);
}

#[test]
fn opacity_is_clamped() {
    let clip = ColorClip::new(Rgba8Premul::opaque_black(), 1, 1, Fps::new(30, 1).unwrap(), 5)
        .with_opacity(3.0);
    assert_eq!(clip.opacity(0), 1.0);
}
