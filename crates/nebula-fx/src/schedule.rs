//! Burst scheduling: decides when meteors spawn
//!
//! A burst is a sorted list of spawn times clustered inside a short window,
//! each nudged by a small symmetric jitter. Jitter may place a spawn slightly
//! before the time the burst was generated; such spawns are simply due on
//! the next tick.

use crate::config::BurstConfig;
use crate::rand::FxRng;
use std::collections::VecDeque;

pub struct BurstScheduler {
    config: BurstConfig,
    /// Seconds since construction
    elapsed: f64,
    /// Earliest time the next schedule may be generated
    next_burst_at: f64,
    /// Pending spawn times, ascending
    schedule: VecDeque<f64>,
    schedules_generated: u32,
    total_due: u64,
}

impl BurstScheduler {
    /// Create a scheduler with its first burst already generated at time 0
    pub fn new(config: BurstConfig, rng: &mut FxRng) -> Self {
        let mut scheduler = Self {
            next_burst_at: config.interval as f64,
            config,
            elapsed: 0.0,
            schedule: VecDeque::new(),
            schedules_generated: 0,
            total_due: 0,
        };
        scheduler.regenerate(rng);
        scheduler
    }

    /// Advance the clock and return how many spawns fell due this tick
    pub fn tick(&mut self, dt: f64, rng: &mut FxRng) -> u32 {
        self.elapsed += dt;
        if self.elapsed >= self.next_burst_at && self.schedule.is_empty() {
            self.regenerate(rng);
        }

        let mut due = 0;
        while let Some(&at) = self.schedule.front() {
            if at > self.elapsed {
                break;
            }
            self.schedule.pop_front();
            due += 1;
        }
        self.total_due += due as u64;
        due
    }

    fn regenerate(&mut self, rng: &mut FxRng) {
        let now = self.elapsed;
        self.next_burst_at = now + self.config.interval as f64;

        let mut times: Vec<f64> = (0..self.config.count)
            .map(|_| {
                now + rng.range(0.0, self.config.spread) as f64
                    + rng.centered(self.config.jitter) as f64
            })
            .collect();
        times.sort_by(f64::total_cmp);

        self.schedule.clear();
        self.schedule.extend(times);
        self.schedules_generated += 1;
        log::debug!(
            "burst #{} scheduled at t={:.2}s ({} spawns, next at {:.2}s)",
            self.schedules_generated,
            now,
            self.config.count,
            self.next_burst_at
        );
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn next_burst_at(&self) -> f64 {
        self.next_burst_at
    }

    /// Spawn times not yet due, ascending
    pub fn pending(&self) -> impl Iterator<Item = f64> + '_ {
        self.schedule.iter().copied()
    }

    pub fn pending_count(&self) -> usize {
        self.schedule.len()
    }

    pub fn schedules_generated(&self) -> u32 {
        self.schedules_generated
    }

    /// Spawns handed out since construction
    pub fn total_due(&self) -> u64 {
        self.total_due
    }

    pub fn config(&self) -> &BurstConfig {
        &self.config
    }
}
