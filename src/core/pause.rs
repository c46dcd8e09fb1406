// src/core/pause.rs
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::config::DelayBounds;

/// Randomized politeness delay between upstream calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacer {
    bounds: DelayBounds,
}

impl Pacer {
    pub fn new(bounds: DelayBounds) -> Self {
        Self { bounds }
    }

    /// No sleeping at all; for tests and replays.
    pub fn none() -> Self {
        Self::new(DelayBounds::none())
    }

    /// Uniform in `[min_ms, max_ms]`.
    pub fn next_delay(&self) -> Duration {
        let DelayBounds { min_ms, max_ms } = self.bounds;
        if min_ms >= max_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }

    pub fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}
