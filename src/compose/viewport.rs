use kurbo::{Affine, Point, Vec2};

use crate::compose::frame::FrameRGBA;
use crate::foundation::core::Rgba8Premul;

/// Viewport state sampled at one timeline frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportSample {
    /// Zoom in percent; 100 is identity.
    pub scale_percent: f64,
    /// Horizontal offset in pixels.
    pub x: f64,
    /// Vertical offset in pixels.
    pub y: f64,
}

impl Default for ViewportSample {
    fn default() -> Self {
        Self {
            scale_percent: 100.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

impl ViewportSample {
    /// `true` when applying the viewport would not move any pixel.
    pub fn is_identity(self) -> bool {
        (self.scale_percent - 100.0).abs() < 1e-9 && self.x.abs() < 1e-9 && self.y.abs() < 1e-9
    }

    /// Canvas-space transform: scale about the canvas center, then translate.
    pub fn to_affine(self, width: u32, height: u32) -> Affine {
        let center = Vec2::new(f64::from(width) / 2.0, f64::from(height) / 2.0);
        let s = self.scale_percent / 100.0;
        Affine::translate(Vec2::new(self.x, self.y))
            * Affine::translate(center)
            * Affine::scale(s)
            * Affine::translate(-center)
    }
}

/// Apply the viewport to a composited canvas with nearest-pixel inverse mapping.
/// Pixels that map outside the source show `background`.
pub fn apply_viewport(
    src: &FrameRGBA,
    viewport: ViewportSample,
    background: Rgba8Premul,
) -> FrameRGBA {
    if viewport.is_identity() {
        return src.clone();
    }

    let mut out = FrameRGBA::filled(src.width, src.height, background);
    if viewport.scale_percent.is_nan()
        || viewport.scale_percent <= 0.0
        || !viewport.x.is_finite()
        || !viewport.y.is_finite()
    {
        return out;
    }

    let inv = viewport.to_affine(src.width, src.height).inverse();
    for y in 0..src.height {
        for x in 0..src.width {
            let p = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if !p.is_finite() || p.x < 0.0 || p.y < 0.0 {
                continue;
            }
            let (sx, sy) = (p.x.floor() as u32, p.y.floor() as u32);
            if let Some(px) = src.pixel(sx, sy) {
                let di = ((y as usize) * (src.width as usize) + (x as usize)) * 4;
                out.data[di..di + 4].copy_from_slice(&px);
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/compose/viewport.rs"]
mod tests;
