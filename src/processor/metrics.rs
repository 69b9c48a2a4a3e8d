use std::time::Instant;

const DEFAULT_SMOOTHING: f64 = 0.2;

/// Exponentially smoothed frame rate measured from actual grab times.
///
/// Misses pull the estimate down to `1 / time since last grab` so a stalled
/// stream trends towards zero instead of freezing at its last good value.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    smoothing: f64,
    fps: f64,
    last_grab: Option<Instant>,
    samples: u64,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::with_smoothing(DEFAULT_SMOOTHING)
    }

    /// `smoothing` is the weight of the newest sample, clamped to (0, 1]
    pub fn with_smoothing(smoothing: f64) -> Self {
        Self {
            smoothing: if smoothing > 0.0 { smoothing.min(1.0) } else { DEFAULT_SMOOTHING },
            fps: 0.0,
            last_grab: None,
            samples: 0,
        }
    }

    pub fn record_grab(&mut self, now: Instant) {
        if let Some(last) = self.last_grab {
            let dt = now.saturating_duration_since(last).as_secs_f64();
            if dt > 0.0 {
                let instant_fps = 1.0 / dt;
                self.fps = if self.samples == 0 {
                    instant_fps
                } else {
                    self.smoothing * instant_fps + (1.0 - self.smoothing) * self.fps
                };
                self.samples += 1;
            }
        }
        self.last_grab = Some(now);
    }

    pub fn record_miss(&mut self, now: Instant) {
        let Some(last) = self.last_grab else {
            return;
        };
        let since = now.saturating_duration_since(last).as_secs_f64();
        if since > 0.0 {
            self.fps = self.fps.min(1.0 / since);
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn last_grab(&self) -> Option<Instant> {
        self.last_grab
    }

    /// Start over, e.g. after a reconnect
    pub fn reset(&mut self) {
        self.fps = 0.0;
        self.last_grab = None;
        self.samples = 0;
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}
