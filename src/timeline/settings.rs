use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{TimelineError, TimelineResult};

/// Output format of a timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimelineSettings {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Output audio sample rate in Hz.
    pub sample_rate: u32,
    /// Output audio channel count.
    pub channels: u16,
}

impl TimelineSettings {
    /// Validated settings.
    pub fn new(
        width: u32,
        height: u32,
        fps: Fps,
        sample_rate: u32,
        channels: u16,
    ) -> TimelineResult<Self> {
        let settings = Self {
            width,
            height,
            fps,
            sample_rate,
            channels,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject zero sizes and rates.
    pub fn validate(&self) -> TimelineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TimelineError::validation(format!(
                "timeline size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(TimelineError::validation("timeline fps must be non-zero"));
        }
        if self.sample_rate == 0 {
            return Err(TimelineError::validation("sample_rate must be > 0"));
        }
        if self.channels == 0 {
            return Err(TimelineError::validation("channels must be > 0"));
        }
        Ok(())
    }

    /// Canvas size.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// Runtime tuning for a [`Timeline`](crate::Timeline).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineOpts {
    /// Frames held by the default LRU output cache.
    pub cache_capacity: usize,
    /// Frames on either side of the last request whose clips stay open.
    pub keep_window_frames: u64,
    /// Decode overlapping clips in parallel on a dedicated thread pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for TimelineOpts {
    fn default() -> Self {
        Self {
            cache_capacity: 64,
            keep_window_frames: 2,
            parallel: true,
            threads: None,
        }
    }
}

impl TimelineOpts {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> TimelineResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| TimelineError::validation(format!("invalid timeline options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> TimelineResult<()> {
        if self.cache_capacity == 0 {
            return Err(TimelineError::validation("cache_capacity must be >= 1"));
        }
        if let Some(n) = self.threads
            && n == 0
        {
            return Err(TimelineError::validation("'threads' must be >= 1 when set"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/settings.rs"]
mod tests;
