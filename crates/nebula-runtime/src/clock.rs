//! Frame clock with fixed-timestep accumulator

use std::time::Instant;

/// Slack allowed when comparing accumulated time against one step, so that
/// feeding exactly `step` per frame always yields exactly one step.
const STEP_EPSILON: f64 = 1e-6;

/// Accumulates variable frame time and hands it out in fixed steps
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    /// Fixed step interval in seconds (default: 1/60 second)
    pub step: f64,
    accumulator: f64,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl FixedTimestep {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            accumulator: 0.0,
        }
    }

    /// Add frame time to the accumulator
    pub fn accumulate(&mut self, dt: f64) {
        self.accumulator += dt.max(0.0);
    }

    /// Returns true if there's enough accumulated time for a fixed step
    pub fn should_step(&self) -> bool {
        self.accumulator + STEP_EPSILON >= self.step
    }

    /// Consume one fixed step from the accumulator
    pub fn consume(&mut self) {
        self.accumulator = (self.accumulator - self.step).max(0.0);
    }

    /// Get the interpolation alpha for rendering between fixed steps
    pub fn interpolation_alpha(&self) -> f64 {
        self.accumulator / self.step
    }
}

/// Tracks frame time and feeds a fixed-timestep accumulator
pub struct GameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    /// Number of frames advanced so far
    pub frame: u64,
    pub fixed: FixedTimestep,
    /// Last tick instant
    last_instant: Instant,
    /// Whether this is the first tick
    first_tick: bool,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            frame: 0,
            fixed: FixedTimestep::default(),
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl GameClock {
    /// Create a new clock with default 60Hz fixed timestep
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock with a custom fixed timestep
    pub fn with_fixed_timestep(hz: f64) -> Self {
        Self {
            fixed: FixedTimestep::new(1.0 / hz),
            ..Self::default()
        }
    }

    /// Advance from the wall clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.delta_time = 0.0;
            return;
        }

        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;

        // Clamp to avoid spiral of death (max 250ms frame time)
        self.advance(elapsed.min(0.25));
    }

    /// Advance by an explicit frame time (headless driving)
    pub fn advance(&mut self, dt: f64) {
        self.delta_time = dt;
        self.total_time += dt;
        self.frame += 1;
        self.fixed.accumulate(dt);
    }
}
