use crate::clip::source::{BlendMode, ClipFrame, ClipReader, ClipSource};
use crate::compose::frame::{AudioBlock, FrameRGBA};
use crate::foundation::core::{Fps, FrameIndex, Rgba8Premul};
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::sources::Placement;
use crate::time::reconcile::samples_per_frame;

/// Constant DC audio emitted by a [`ColorClip`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneSpec {
    /// Sample value written to every channel.
    pub level: f32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// A solid-color clip, optionally carrying a constant audio level.
///
/// Useful as a generator (title cards, mattes) and as a deterministic test source.
#[derive(Debug)]
pub struct ColorClip {
    name: String,
    placement: Placement,
    fps: Fps,
    duration_frames: u64,
    color: Rgba8Premul,
    width: u32,
    height: u32,
    opacity: f64,
    blend: BlendMode,
    volume: f32,
    tone: Option<ToneSpec>,
}

impl ColorClip {
    /// A `width x height` clip of `color` lasting `duration_frames` at `fps`, placed at 0 on
    /// layer 0.
    pub fn new(
        color: Rgba8Premul,
        width: u32,
        height: u32,
        fps: Fps,
        duration_frames: u64,
    ) -> Self {
        Self {
            name: "color".to_owned(),
            placement: Placement::new(0.0, 0),
            fps,
            duration_frames,
            color,
            width,
            height,
            opacity: 1.0,
            blend: BlendMode::Normal,
            volume: 1.0,
            tone: None,
        }
    }

    /// Set the name used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
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

    /// Audio gain.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Emit constant audio alongside the picture.
    pub fn with_tone(mut self, tone: ToneSpec) -> Self {
        self.tone = Some(tone);
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

impl ClipSource for ColorClip {
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

    fn volume(&self) -> f32 {
        self.volume
    }

    fn open(&self) -> TimelineResult<Box<dyn ClipReader>> {
        Ok(Box::new(ColorReader {
            image: FrameRGBA::filled(self.width, self.height, self.color),
            fps: self.fps,
            tone: self.tone,
        }))
    }
}

struct ColorReader {
    image: FrameRGBA,
    fps: Fps,
    tone: Option<ToneSpec>,
}

impl ClipReader for ColorReader {
    fn get_frame(&mut self, local_frame: u64) -> TimelineResult<ClipFrame> {
        let audio = self
            .tone
            .map(|tone| {
                let samples =
                    samples_per_frame(FrameIndex(local_frame), self.fps, tone.sample_rate)?;
                Ok::<_, TimelineError>(AudioBlock {
                    sample_rate: tone.sample_rate,
                    channels: tone.channels,
                    interleaved_f32: vec![
                        tone.level;
                        samples as usize * usize::from(tone.channels)
                    ],
                })
            })
            .transpose()?;
        Ok(ClipFrame {
            image: Some(self.image.clone()),
            audio,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sources/color.rs"]
mod tests;
