//! Time plumbing shared by the games: a fixed-step accumulator for the
//! Ice Slide loop, a cancellable one-shot used for delayed reverts and the
//! guard that keeps a host's animation-frame loop single.

use std::time::Duration;

/// Converts variable frame times into a whole number of fixed simulation steps.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: Duration,
    accumulator: Duration,
    max_steps: u32,
}

impl FixedTimestep {
    pub fn new(steps_per_second: u32, max_steps: u32) -> Self {
        let rate = steps_per_second.max(1);
        Self {
            step: Duration::from_nanos(1_000_000_000 / u64::from(rate)),
            accumulator: Duration::ZERO,
            max_steps: max_steps.max(1),
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Adds `elapsed` to the backlog and returns how many steps are due.
    ///
    /// A backlog larger than `max_steps` is dropped rather than replayed, so a
    /// long stall (a hidden tab) does not fast-forward the game.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator = self.accumulator.saturating_add(elapsed);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if self.accumulator >= self.step {
            self.accumulator = Duration::ZERO;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}

/// A single deferred payload that fires once its deadline passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred<T> {
    pending: Option<(Duration, T)>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any pending payload with one due at `now + delay`.
    pub fn schedule(&mut self, now: Duration, delay: Duration, payload: T) {
        self.pending = Some((now.saturating_add(delay), payload));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due_at(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(due, _)| *due)
    }

    /// Yields the payload when `now` has reached the deadline.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        if self.due_at().is_some_and(|due| now >= due) {
            self.cancel()
        } else {
            None
        }
    }
}

/// Tracks a self-rescheduling animation-frame loop.
///
/// Every [`start`](Self::start) issues a new generation. A frame callback
/// carrying an older generation gets `None` from [`tick`](Self::tick) and must
/// not reschedule, so stopping and restarting between two frames still leaves
/// one live loop.
#[derive(Debug, Clone, Default)]
pub struct FrameLoop {
    generation: u64,
    running: bool,
    last_frame: Option<f64>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the generation for the first frame, or `None` if a loop is
    /// already live.
    pub fn start(&mut self) -> Option<u64> {
        if self.running {
            return None;
        }
        self.running = true;
        self.generation = self.generation.wrapping_add(1);
        self.last_frame = None;
        Some(self.generation)
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_frame = None;
    }

    /// Time since the previous frame of the same loop, given millisecond
    /// timestamps. The first frame yields zero.
    pub fn tick(&mut self, generation: u64, timestamp_ms: f64) -> Option<Duration> {
        if !self.running || generation != self.generation {
            return None;
        }
        let elapsed = self
            .last_frame
            .map_or(0.0, |last| (timestamp_ms - last).max(0.0));
        self.last_frame = Some(timestamp_ms);
        let micros = (elapsed * 1000.0).round();
        if micros.is_finite() {
            Some(Duration::from_micros(micros as u64))
        } else {
            Some(Duration::ZERO)
        }
    }
}
