use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_half_opacity_mixes() {
    let out = over([0, 0, 0, 255], [255, 255, 255, 255], 0.5);
    assert!(out[0] > 120 && out[0] < 135);
    assert_eq!(out[3], 255);
}

#[test]
fn add_saturates() {
    let out = blend([200, 10, 0, 255], [100, 10, 0, 255], 1.0, BlendMode::Add);
    assert_eq!(out, [255, 20, 0, 255]);
}

#[test]
fn multiply_opaque_is_channel_product() {
    let out = blend(
        [255, 128, 0, 255],
        [128, 255, 255, 255],
        1.0,
        BlendMode::Multiply,
    );
    assert_eq!(out, [128, 128, 0, 255]);
}

#[test]
fn screen_with_black_is_identity() {
    let dst = [40, 80, 120, 255];
    assert_eq!(blend(dst, [0, 0, 0, 255], 1.0, BlendMode::Screen), dst);
}

#[test]
fn centered_blend_clips_to_canvas() {
    // 2x1 canvas, 4x1 red source: the middle two source pixels land on the canvas.
    let mut dst = vec![0, 0, 0, 255, 0, 0, 0, 255];
    let mut src = Vec::new();
    for x in 0..4u8 {
        src.extend_from_slice(&[x * 60, 0, 0, 255]);
    }
    blend_centered_in_place(&mut dst, (2, 1), &src, (4, 1), 1.0, BlendMode::Normal).unwrap();
    assert_eq!(&dst[0..4], &[60, 0, 0, 255]);
    assert_eq!(&dst[4..8], &[120, 0, 0, 255]);
}

#[test]
fn centered_blend_places_small_source_in_middle() {
    let mut dst = vec![0u8; 3 * 3 * 4];
    let src = vec![9, 9, 9, 255];
    blend_centered_in_place(&mut dst, (3, 3), &src, (1, 1), 1.0, BlendMode::Normal).unwrap();
    let center = (3 + 1) * 4;
    assert_eq!(&dst[center..center + 4], &[9, 9, 9, 255]);
    assert_eq!(&dst[0..4], &[0, 0, 0, 0]);
}

#[test]
fn centered_blend_rejects_bad_lengths() {
    let mut dst = vec![0u8; 3];
    assert!(
        blend_centered_in_place(&mut dst, (1, 1), &[0; 4], (1, 1), 1.0, BlendMode::Normal)
            .is_err()
    );
}
