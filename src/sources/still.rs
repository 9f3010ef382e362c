use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::clip::source::{BlendMode, ClipFrame, ClipReader, ClipSource};
use crate::compose::frame::FrameRGBA;
use crate::foundation::core::Fps;
use crate::foundation::error::TimelineResult;
use crate::sources::Placement;

#[derive(Clone, Debug)]
enum ImageOrigin {
    Path(PathBuf),
    Bytes(Arc<Vec<u8>>),
}

/// A still image held for a fixed number of frames.
///
/// The file is decoded when the timeline opens the clip and dropped when it closes it, so a
/// long timeline of stills only keeps the overlapping ones in memory.
#[derive(Debug)]
pub struct ImageClip {
    name: String,
    origin: ImageOrigin,
    placement: Placement,
    fps: Fps,
    duration_frames: u64,
    opacity: f64,
    blend: BlendMode,
}

impl ImageClip {
    /// Still read from `path` on open.
    pub fn from_path(path: impl Into<PathBuf>, fps: Fps, duration_frames: u64) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            origin: ImageOrigin::Path(path),
            placement: Placement::new(0.0, 0),
            fps,
            duration_frames,
            opacity: 1.0,
            blend: BlendMode::Normal,
        }
    }

    /// Still decoded from in-memory encoded bytes (PNG, JPEG, ...).
    pub fn from_bytes(bytes: Vec<u8>, fps: Fps, duration_frames: u64) -> Self {
        Self {
            name: "image".to_owned(),
            origin: ImageOrigin::Bytes(Arc::new(bytes)),
            placement: Placement::new(0.0, 0),
            fps,
            duration_frames,
            opacity: 1.0,
            blend: BlendMode::Normal,
        }
    }

    /// Place the clip at `position` seconds.
    pub fn at(self, position: f64) -> Self {
        self.placement.set_position(position);
        self
    }

    /// Put the clip on `layer`.
    pub fn on_layer(self, layer: i32) -> Self {
        self.placement.set_layer(layer);
        self
    }

    /// Constant opacity, clamped to `[0, 1]`.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Blend mode.
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Move the clip. Re-sort the timeline afterwards.
    pub fn set_position(&self, position: f64) {
        self.placement.set_position(position);
    }

    /// Change the layer. Re-sort the timeline afterwards.
    pub fn set_layer(&self, layer: i32) {
        self.placement.set_layer(layer);
    }
}

impl ClipSource for ImageClip {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> f64 {
        self.placement.position()
    }

    fn layer(&self) -> i32 {
        self.placement.layer()
    }

    fn fps(&self) -> Fps {
        self.fps
    }

    fn duration_frames(&self) -> u64 {
        self.duration_frames
    }

    fn opacity(&self, _local_frame: u64) -> f64 {
        self.opacity
    }

    fn blend(&self) -> BlendMode {
        self.blend
    }

    fn open(&self) -> TimelineResult<Box<dyn ClipReader>> {
        let image = match &self.origin {
            ImageOrigin::Path(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("read image '{}'", path.display()))?;
                decode_image(&bytes)?
            }
            ImageOrigin::Bytes(bytes) => decode_image(bytes)?,
        };
        Ok(Box::new(StillReader {
            image: Some(Arc::new(image)),
        }))
    }
}

struct StillReader {
    image: Option<Arc<FrameRGBA>>,
}

impl ClipReader for StillReader {
    fn get_frame(&mut self, _local_frame: u64) -> TimelineResult<ClipFrame> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| crate::TimelineError::decode("still image reader already closed"))?;
        Ok(ClipFrame {
            image: Some(FrameRGBA::clone(image)),
            audio: None,
        })
    }

    fn close(&mut self) {
        self.image = None;
    }
}

/// Decode encoded image bytes into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> TimelineResult<FrameRGBA> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);

    FrameRGBA::from_raw(width, height, data)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sources/still.rs"]
mod tests;
