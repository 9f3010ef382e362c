use crate::compose::frame::{AudioBlock, FrameRGBA};
use crate::foundation::core::Fps;
use crate::foundation::error::TimelineResult;
use crate::time::reconcile::ClipTiming;

/// How a clip's pixels combine with the layers below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Standard source-over (premultiplied alpha).
    #[default]
    Normal,
    /// Additive (linear dodge), clamped.
    Add,
    /// Channel-wise multiply.
    Multiply,
    /// Inverse multiply of the inverses.
    Screen,
}

/// A decoded clip-local frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipFrame {
    /// Picture, if the clip has video.
    pub image: Option<FrameRGBA>,
    /// Audio belonging to this local frame, if the clip has audio.
    pub audio: Option<AudioBlock>,
}

/// Open decode handle for one clip. Owned by the timeline while the clip is open.
pub trait ClipReader: Send {
    /// Decode the frame at `local_frame` (0-based, clip rate).
    fn get_frame(&mut self, local_frame: u64) -> TimelineResult<ClipFrame>;

    /// Release decode resources. Called exactly once, before the handle is dropped.
    fn close(&mut self) {}
}

/// A clip placed on the timeline.
///
/// The timeline only observes clips: it reads placement through this trait, and the only
/// resource it ever owns is the [`ClipReader`] returned by [`ClipSource::open`]. Implementations
/// that allow moving a clip use interior mutability; callers must then re-run
/// `Timeline::sort_clips` before the next frame request.
pub trait ClipSource: Send + Sync {
    /// Human-readable name, used in logs and errors.
    fn name(&self) -> &str {
        "clip"
    }

    /// Timeline start time in seconds.
    fn position(&self) -> f64;

    /// Stacking order; higher layers are drawn on top.
    fn layer(&self) -> i32;

    /// The clip's own frame rate.
    fn fps(&self) -> Fps;

    /// Intrinsic length in clip-local frames.
    fn duration_frames(&self) -> u64;

    /// Opacity in `[0, 1]` at a clip-local frame.
    fn opacity(&self, _local_frame: u64) -> f64 {
        1.0
    }

    /// Blend mode used when compositing this clip.
    fn blend(&self) -> BlendMode {
        BlendMode::Normal
    }

    /// Linear gain applied when mixing this clip's audio.
    fn volume(&self) -> f32 {
        1.0
    }

    /// Acquire a decode handle. Failure to obtain resources should be reported as
    /// [`TimelineError::ResourceExhaustion`](crate::TimelineError::ResourceExhaustion).
    fn open(&self) -> TimelineResult<Box<dyn ClipReader>>;

    /// Placement snapshot for the time reconciler.
    fn timing(&self) -> ClipTiming {
        ClipTiming {
            position: self.position(),
            fps: self.fps(),
            duration_frames: self.duration_frames(),
        }
    }
}
