use crate::foundation::core::{Canvas, FrameIndex, Rgba8Premul};
use crate::foundation::error::{TimelineError, TimelineResult};

/// Premultiplied RGBA8 image, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// An image filled with a single color.
    pub fn filled(width: u32, height: u32, color: Rgba8Premul) -> Self {
        let canvas = Canvas { width, height };
        let px = color.to_array();
        let mut data = Vec::with_capacity(canvas.rgba_len());
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap existing bytes, checking the length against the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> TimelineResult<Self> {
        let expected = Canvas { width, height }.rgba_len();
        if data.len() != expected {
            return Err(TimelineError::validation(format!(
                "rgba buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }
}

/// Interleaved `f32` PCM for one frame's worth of audio.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBlock {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// `samples * channels` values in `[-1, 1]`.
    pub interleaved_f32: Vec<f32>,
}

impl AudioBlock {
    /// `samples` frames of silence.
    pub fn silence(sample_rate: u32, channels: u16, samples: u32) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved_f32: vec![0.0; samples as usize * usize::from(channels)],
        }
    }

    /// Samples per channel.
    pub fn samples(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved_f32.len() / usize::from(self.channels)
        }
    }

    /// `true` when every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.interleaved_f32.iter().all(|s| *s == 0.0)
    }
}

/// One fully composited timeline frame. Immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputFrame {
    /// Timeline frame this output belongs to.
    pub index: FrameIndex,
    /// Composited canvas.
    pub image: FrameRGBA,
    /// Mixed audio for this frame.
    pub audio: AudioBlock,
}
