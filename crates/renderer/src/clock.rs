/// Whether the live clock is currently driving frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
}

/// Token for the one outstanding frame callback.
///
/// A request is honoured only while it is the clock's pending request, so a
/// callback that fires after `stop` can never draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

/// Virtual time for the live preview.
///
/// Time is the running sum of per-frame deltas scaled by the speed in effect
/// for that frame. It never depends on absolute wall-clock time and is never
/// reset, so changing speed changes the rate without a phase jump.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    state: ClockState,
    elapsed_ms: f64,
    pending: Option<FrameRequest>,
    next_token: u64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self {
            state: ClockState::Stopped,
            elapsed_ms: 0.0,
            pending: None,
            next_token: 0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    fn schedule(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_token);
        self.next_token += 1;
        self.pending = Some(request);
        request
    }

    /// `Stopped -> Running`. Starting a running clock returns the request
    /// already outstanding.
    pub fn start(&mut self) -> FrameRequest {
        match (self.state, self.pending) {
            (ClockState::Running, Some(request)) => request,
            _ => {
                self.state = ClockState::Running;
                self.schedule()
            }
        }
    }

    /// Consumes `request`, advances time and schedules the next frame.
    ///
    /// Returns the new elapsed time, or `None` when the clock is stopped or
    /// the request is stale.
    pub fn advance(&mut self, request: FrameRequest, delta_ms: f64, speed: f64) -> Option<f64> {
        if self.state != ClockState::Running || self.pending != Some(request) {
            return None;
        }
        let delta = if delta_ms.is_finite() { delta_ms.max(0.0) } else { 0.0 };
        let speed = speed.max(0.0);
        self.elapsed_ms += delta * speed;
        self.schedule();
        Some(self.elapsed_ms)
    }

    /// `Running -> Stopped`; cancels and returns the pending request.
    pub fn stop(&mut self) -> Option<FrameRequest> {
        self.state = ClockState::Stopped;
        self.pending.take()
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}
