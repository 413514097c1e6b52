/// Virtual time after which the liquid program repeats exactly. The shader
/// reads time as `fract(0.001 * u_time)`.
pub const LOOP_PERIOD_MS: f64 = 1000.0;

/// GIF players clamp very short delays, so none go below this.
pub const MIN_FRAME_DELAY_MS: u32 = 10;

/// Floor applied to the speed when stretching frame delays.
pub const MIN_SPEED: f64 = 0.01;

/// Evenly spaced samples that tile exactly one loop period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSchedule {
    total_frames: usize,
    step_ms: f64,
}

impl FrameSchedule {
    /// Duration and fps only decide the frame count, never the period.
    pub fn new(duration_sec: f64, fps: f64) -> Self {
        let requested = (duration_sec * fps).round();
        let total_frames = if requested.is_finite() && requested > 2.0 {
            requested as usize
        } else {
            2
        };
        Self {
            total_frames,
            step_ms: LOOP_PERIOD_MS / total_frames as f64,
        }
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.step_ms
    }

    /// Sample times in increasing order, covering `[0, LOOP_PERIOD_MS)`.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.total_frames).map(|index| self.time_at(index))
    }

    /// Per-frame delay so playback matches the live preview at `speed`.
    pub fn frame_delay_ms(&self, speed: f64) -> u32 {
        let speed = speed.max(MIN_SPEED);
        let delay = (self.step_ms / speed).round();
        if delay.is_finite() && delay < f64::from(u32::MAX) {
            (delay as u32).max(MIN_FRAME_DELAY_MS)
        } else {
            u32::MAX
        }
    }
}

/// Position inside the loop the shader sees at `time_ms`, in `[0, 1)`.
pub fn loop_phase(time_ms: f64) -> f64 {
    (0.001 * time_ms).rem_euclid(1.0)
}
