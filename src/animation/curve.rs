use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TimelineError, TimelineResult};

/// A scalar value that varies over the timeline.
pub trait Curve: Send + Sync {
    /// Value at timeline frame `frame`.
    fn value_at(&self, frame: FrameIndex) -> f64;
}

impl Curve for f64 {
    fn value_at(&self, _frame: FrameIndex) -> f64 {
        *self
    }
}

/// Easing applied from one key toward the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// Constant speed.
    #[default]
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in-out.
    InOutQuad,
    /// Cubic ease-in-out.
    InOutCubic,
}

impl Ease {
    /// Map `t` in `[0, 1]` through the easing function.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
        }
    }
}

/// Interpolation between neighbouring keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpMode {
    /// Keep the previous key's value until the next key.
    Hold,
    /// Interpolate (through the key's [`Ease`]).
    #[default]
    Linear,
}

/// One key on a [`Keyframes`] curve.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    /// Timeline frame of the key.
    pub frame: FrameIndex,
    /// Value at that frame.
    pub value: f64,
    /// Ease applied toward the next key.
    #[serde(default)]
    pub ease: Ease,
}

/// Piecewise curve through sorted keys; flat before the first and after the last key.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawKeyframes")]
pub struct Keyframes {
    keys: Vec<Keyframe>,
    #[serde(default)]
    mode: InterpMode,
}

impl Keyframes {
    /// Build a curve; keys must be non-empty and sorted by frame.
    pub fn new(keys: Vec<Keyframe>, mode: InterpMode) -> TimelineResult<Self> {
        if keys.is_empty() {
            return Err(TimelineError::validation(
                "Keyframes must have at least one key",
            ));
        }
        if !keys.windows(2).all(|w| w[0].frame.0 <= w[1].frame.0) {
            return Err(TimelineError::validation(
                "Keyframes keys must be sorted by frame",
            ));
        }
        if keys.iter().any(|k| !k.value.is_finite()) {
            return Err(TimelineError::validation("Keyframes values must be finite"));
        }
        Ok(Self { keys, mode })
    }

    /// A curve that is `value` everywhere.
    pub fn constant(value: f64) -> Self {
        Self {
            keys: vec![Keyframe {
                frame: FrameIndex(0),
                value,
                ease: Ease::Linear,
            }],
            mode: InterpMode::Hold,
        }
    }

    /// The keys, sorted by frame.
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }
}

#[derive(serde::Deserialize)]
struct RawKeyframes {
    keys: Vec<Keyframe>,
    #[serde(default)]
    mode: InterpMode,
}

impl TryFrom<RawKeyframes> for Keyframes {
    type Error = TimelineError;

    fn try_from(raw: RawKeyframes) -> TimelineResult<Self> {
        Self::new(raw.keys, raw.mode)
    }
}

impl Curve for Keyframes {
    fn value_at(&self, frame: FrameIndex) -> f64 {
        let f = frame.0;
        let idx = self.keys.partition_point(|k| k.frame.0 <= f);

        if idx == 0 {
            return self.keys[0].value;
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value;
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        let denom = b.frame.0.saturating_sub(a.frame.0);
        if denom == 0 {
            return a.value;
        }

        let t = ((f - a.frame.0) as f64) / (denom as f64);
        match self.mode {
            InterpMode::Hold => a.value,
            InterpMode::Linear => a.value + (b.value - a.value) * a.ease.apply(t),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/curve.rs"]
mod tests;
