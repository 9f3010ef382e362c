use crate::clip::source::BlendMode;
use crate::foundation::error::{TimelineError, TimelineResult};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied RGBA8 with an extra opacity factor.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Blend one pixel with `mode`. `Normal` is exactly [`over`].
pub fn blend(dst: PremulRgba8, src: PremulRgba8, opacity: f32, mode: BlendMode) -> PremulRgba8 {
    match mode {
        BlendMode::Normal => over(dst, src, opacity),
        BlendMode::Add => {
            let opacity = opacity.clamp(0.0, 1.0);
            let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
            let mut out = [0u8; 4];
            for i in 0..4 {
                out[i] = add_sat_u8(dst[i], mul_div255(u16::from(src[i]), op));
            }
            out
        }
        BlendMode::Multiply => separable(dst, src, opacity, |cs, cd| cs * cd),
        BlendMode::Screen => separable(dst, src, opacity, |cs, cd| cs + cd - cs * cd),
    }
}

/// Separable blend in premultiplied space:
/// `co = cs*(1-ab) + cb*(1-as) + as*ab*B(Cs, Cb)`, `ao = as + ab - as*ab`.
fn separable(
    dst: PremulRgba8,
    src: PremulRgba8,
    opacity: f32,
    b: impl Fn(f32, f32) -> f32,
) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let sa = f32::from(src[3]) / 255.0 * opacity;
    let da = f32::from(dst[3]) / 255.0;

    let mut out = [0u8; 4];
    for i in 0..3 {
        let s = f32::from(src[i]) / 255.0 * opacity;
        let d = f32::from(dst[i]) / 255.0;
        let cs = if sa > 0.0 { (s / sa).min(1.0) } else { 0.0 };
        let cd = if da > 0.0 { (d / da).min(1.0) } else { 0.0 };
        let co = s * (1.0 - da) + d * (1.0 - sa) + sa * da * b(cs, cd);
        out[i] = to_u8(co);
    }
    out[3] = to_u8(sa + da - sa * da);
    out
}

/// Composite `src` (a `src_w x src_h` image) centered on `dst` (a `dst_w x dst_h` canvas).
/// Parts of `src` outside the canvas are dropped.
pub fn blend_centered_in_place(
    dst: &mut [u8],
    dst_size: (u32, u32),
    src: &[u8],
    src_size: (u32, u32),
    opacity: f32,
    mode: BlendMode,
) -> TimelineResult<()> {
    let (dw, dh) = dst_size;
    let (sw, sh) = src_size;
    if dst.len() != dw as usize * dh as usize * 4 || src.len() != sw as usize * sh as usize * 4 {
        return Err(TimelineError::validation(
            "blend_centered_in_place expects buffers matching width*height*4",
        ));
    }

    let off_x = (i64::from(dw) - i64::from(sw)) / 2;
    let off_y = (i64::from(dh) - i64::from(sh)) / 2;

    for sy in 0..i64::from(sh) {
        let dy = sy + off_y;
        if dy < 0 || dy >= i64::from(dh) {
            continue;
        }
        for sx in 0..i64::from(sw) {
            let dx = sx + off_x;
            if dx < 0 || dx >= i64::from(dw) {
                continue;
            }
            let si = ((sy as usize) * (sw as usize) + (sx as usize)) * 4;
            let di = ((dy as usize) * (dw as usize) + (dx as usize)) * 4;
            let d = [dst[di], dst[di + 1], dst[di + 2], dst[di + 3]];
            let s = [src[si], src[si + 1], src[si + 2], src[si + 3]];
            dst[di..di + 4].copy_from_slice(&blend(d, s, opacity, mode));
        }
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/compose/blend.rs"]
mod tests;
