//! Fixed-cadence frame scheduler for the continuous render loop.

use web_time::{Duration, Instant};

/// Tracks when the next frame is due.
#[derive(Debug, Clone)]
pub struct RenderLoop {
    interval: Duration,
    next_frame: Instant,
    running: bool,
}

impl RenderLoop {
    /// Creates a stopped loop ticking at `frame_rate_hz`.
    pub fn new(frame_rate_hz: f32) -> Self {
        let hz = if frame_rate_hz > 0.0 { frame_rate_hz } else { 60.0 };
        Self {
            interval: Duration::from_secs_f64(1.0 / hz as f64),
            next_frame: Instant::now(),
            running: false,
        }
    }

    /// Starts the loop; the first frame is due immediately.
    pub fn start(&mut self, now: Instant) {
        self.running = true;
        self.next_frame = now;
    }

    /// Stops the loop. No frame is due afterwards.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a frame is due at `now`. A due frame is consumed: the next
    /// deadline moves one interval ahead, or to `now` plus one interval if the
    /// loop fell behind by more than a frame.
    pub fn due(&mut self, now: Instant) -> bool {
        if !self.running || now < self.next_frame {
            return false;
        }
        self.next_frame += self.interval;
        if self.next_frame <= now {
            self.next_frame = now + self.interval;
        }
        true
    }

    /// Time left until the next frame, `None` when stopped.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.running
            .then(|| self.next_frame.saturating_duration_since(now))
    }
}
