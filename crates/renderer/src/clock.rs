use std::time::{Duration, Instant};

/// Timing snapshot handed to [`Sketch::on_frame`](crate::Sketch::on_frame).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Time since the first frame.
    pub elapsed: Duration,
    /// Time since the previous frame; zero on the first frame.
    pub delta: Duration,
    /// Zero-based frame counter.
    pub index: u64,
}

impl FrameTime {
    /// Elapsed milliseconds, the unit the sketch clock counts in.
    pub fn millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Elapsed time in seconds as fed to the `time` uniform.
    pub fn seconds(&self) -> f32 {
        (self.millis() / 1000.0) as f32
    }
}

/// Monotonic clock sampled once per frame.
///
/// The origin is pinned on the first tick so the first frame always reports
/// zero elapsed time. Instants earlier than the previous tick are clamped, so
/// the reported time never decreases.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    origin: Option<Instant>,
    last: Option<Instant>,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, now: Instant) -> FrameTime {
        let origin = *self.origin.get_or_insert(now);
        let previous = self.last.unwrap_or(now);
        let now = now.max(previous);
        self.last = Some(now);

        let frame = FrameTime {
            elapsed: now.saturating_duration_since(origin),
            delta: now.saturating_duration_since(previous),
            index: self.frames,
        };
        self.frames = self.frames.saturating_add(1);
        frame
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Rolling frames-per-second counter used for the periodic stats log.
#[derive(Debug)]
pub(crate) struct FrameStats {
    window_start: Instant,
    frames: u32,
}

impl FrameStats {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Counts a frame; returns the measured rate once a second has passed.
    pub(crate) fn record(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}
