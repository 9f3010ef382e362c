//! Bottom-to-top merge of per-clip frames into one output frame.
//!
//! Layers must be added in registry order. Video is blended over everything already on the
//! canvas; audio is summed into a shared block sized by the timeline's samples-per-frame.
//!
//! Clip audio is placed on the timeline's sample clock: the output block covers the samples of
//! the timeline frame, and each clip-local block covers the samples of its local frame at the
//! clip's rate. Only the overlap of the two is mixed. When the clip rate differs from the
//! timeline rate the rest of the output block comes from neighbouring local frames passed to
//! [`LayerCompositor::add_audio`]; samples outside the clip stay silent.

use crate::clip::source::{ClipFrame, ClipSource};
use crate::compose::blend::blend_centered_in_place;
use crate::compose::frame::{AudioBlock, FrameRGBA, OutputFrame};
use crate::compose::viewport::{ViewportSample, apply_viewport};
use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgba8Premul};
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::time::reconcile::{clip_sample_window, sample_offset, samples_per_frame};

/// Output format a [`LayerCompositor`] produces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositeTarget {
    /// Canvas size.
    pub canvas: Canvas,
    /// Timeline frame rate.
    pub fps: Fps,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Fill painted under all layers.
    pub background: Rgba8Premul,
}

/// Output frame under construction.
#[derive(Debug)]
pub struct PartialFrame {
    index: FrameIndex,
    image: FrameRGBA,
    audio: AudioBlock,
    layers: usize,
}

impl PartialFrame {
    /// Timeline frame being composed.
    pub fn index(&self) -> FrameIndex {
        self.index
    }

    /// Number of layers merged so far.
    pub fn layers(&self) -> usize {
        self.layers
    }
}

/// Stateless merge engine for one [`CompositeTarget`].
#[derive(Clone, Copy, Debug)]
pub struct LayerCompositor {
    target: CompositeTarget,
}

impl LayerCompositor {
    /// Compositor for `target`.
    pub fn new(target: CompositeTarget) -> Self {
        Self { target }
    }

    /// Background-filled canvas and silence for `index`.
    ///
    /// Fails when `index` has no representable audio span at the target rates.
    pub fn begin(&self, index: FrameIndex) -> TimelineResult<PartialFrame> {
        let t = self.target;
        let samples = samples_per_frame(index, t.fps, t.sample_rate)?;
        Ok(PartialFrame {
            index,
            image: FrameRGBA::filled(t.canvas.width, t.canvas.height, t.background),
            audio: AudioBlock::silence(t.sample_rate, t.channels, samples),
            layers: 0,
        })
    }

    /// Merge one clip's local frame on top of what `out` already holds.
    pub fn add_layer(
        &self,
        out: &mut PartialFrame,
        new_frame: &ClipFrame,
        source_clip: &dyn ClipSource,
        clip_frame_number: u64,
        timeline_frame_number: FrameIndex,
    ) -> TimelineResult<()> {
        if timeline_frame_number != out.index {
            return Err(TimelineError::validation(format!(
                "layer for frame {} added to output frame {}",
                timeline_frame_number.0, out.index.0
            )));
        }

        if let Some(image) = &new_frame.image {
            let opacity = source_clip.opacity(clip_frame_number).clamp(0.0, 1.0) as f32;
            blend_centered_in_place(
                &mut out.image.data,
                (out.image.width, out.image.height),
                &image.data,
                (image.width, image.height),
                opacity,
                source_clip.blend(),
            )?;
        }

        if let Some(audio) = &new_frame.audio {
            self.mix_audio(out, audio, source_clip, clip_frame_number)?;
        }

        out.layers += 1;
        Ok(())
    }

    /// Mix the audio of a neighbouring local frame of a clip already added with
    /// [`add_layer`](Self::add_layer). Only samples inside the output frame's span are used.
    pub fn add_audio(
        &self,
        out: &mut PartialFrame,
        audio: &AudioBlock,
        source_clip: &dyn ClipSource,
        clip_frame_number: u64,
    ) -> TimelineResult<()> {
        self.mix_audio(out, audio, source_clip, clip_frame_number)
    }

    /// Clamp mixed audio and apply the viewport; the frame is immutable afterwards.
    pub fn finish(&self, out: PartialFrame, viewport: ViewportSample) -> OutputFrame {
        let PartialFrame {
            index,
            image,
            mut audio,
            ..
        } = out;

        for s in &mut audio.interleaved_f32 {
            *s = s.clamp(-1.0, 1.0);
        }

        let image = if viewport.is_identity() {
            image
        } else {
            apply_viewport(&image, viewport, self.target.background)
        };

        OutputFrame {
            index,
            image,
            audio,
        }
    }

    fn mix_audio(
        &self,
        out: &mut PartialFrame,
        src: &AudioBlock,
        source_clip: &dyn ClipSource,
        clip_frame_number: u64,
    ) -> TimelineResult<()> {
        let index = out.index;
        let dst = &mut out.audio;
        if src.channels == 0 || dst.channels == 0 {
            return Ok(());
        }
        if src.sample_rate != dst.sample_rate {
            tracing::warn!(
                clip = source_clip.name(),
                clip_rate = src.sample_rate,
                timeline_rate = dst.sample_rate,
                "skipping clip audio with mismatched sample rate"
            );
            return Ok(());
        }

        let t = self.target;
        let window = clip_sample_window(index, t.fps, t.sample_rate, source_clip.position())?;
        let block_start = sample_offset(
            FrameIndex(clip_frame_number),
            source_clip.fps(),
            t.sample_rate,
        )?;
        let block_start = i64::try_from(block_start).map_err(|_| {
            TimelineError::validation(format!("clip frame {clip_frame_number} is out of range"))
        })?;
        let block_end = block_start.saturating_add(src.samples() as i64);
        let window_end = window.start.saturating_add(dst.samples() as i64);

        let lo = window.start.max(block_start);
        let hi = window_end.min(block_end);
        if lo >= hi {
            return Ok(());
        }

        let gain = source_clip.volume();
        let out_ch = usize::from(dst.channels);
        let src_ch = usize::from(src.channels);
        let dst_from = (lo - window.start) as usize;
        let src_from = (lo - block_start) as usize;

        for k in 0..(hi - lo) as usize {
            let (i, j) = (dst_from + k, src_from + k);
            for c in 0..out_ch {
                let sc = if src_ch == 1 { 0 } else { c % src_ch };
                dst.interleaved_f32[i * out_ch + c] += src.interleaved_f32[j * src_ch + sc] * gain;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/layer.rs"]
mod tests;
