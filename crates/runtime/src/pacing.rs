//! Humanized inter-action pacing.
//!
//! Actions are spaced by a randomly drawn "human gap" measured from the last
//! execution, so bursts of queued work come out at an irregular, plausible
//! rhythm instead of back-to-back.

use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

use crate::config::PacingConfig;

pub struct HumanizedPacer {
    config: PacingConfig,
    rng: Mutex<SmallRng>,
    last_action: Mutex<Option<Instant>>,
}

impl HumanizedPacer {
    pub fn new(config: PacingConfig) -> Self {
        let config = config.normalized();
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        Self {
            config,
            rng: Mutex::new(rng),
            last_action: Mutex::new(None),
        }
    }

    /// Delay to apply before the next execution, always within `[floor, ceiling]`.
    pub fn next_delay(&self) -> Duration {
        let gap = self.draw_gap();
        let since_last = self
            .last_action
            .lock()
            .map(|at| Instant::now().saturating_duration_since(at));

        let remaining = match since_last {
            Some(elapsed) => gap.saturating_sub(elapsed),
            None => gap,
        };

        remaining.clamp(self.config.floor, self.config.ceiling)
    }

    /// Sleeps for [`Self::next_delay`].
    pub async fn pace(&self) {
        tokio::time::sleep(self.next_delay()).await;
    }

    /// Sleeps until at least `floor` has passed since the last execution.
    pub async fn settle(&self) {
        if let Some(last) = self.last_action() {
            tokio::time::sleep_until(last + self.config.floor).await;
        }
    }

    /// Records an execution as the new pacing baseline.
    pub fn mark_executed(&self, at: Instant) {
        *self.last_action.lock() = Some(at);
    }

    pub fn last_action(&self) -> Option<Instant> {
        *self.last_action.lock()
    }

    fn draw_gap(&self) -> Duration {
        let min = self.config.min_gap.as_micros() as u64;
        let max = self.config.max_gap.as_micros() as u64;
        let mut rng = self.rng.lock();

        // Mean of two uniform draws: triangular, clustered around the middle.
        let a = rng.random_range(min..=max);
        let b = rng.random_range(min..=max);
        let mut micros = (a + b) / 2;

        if rng.random_bool(self.config.hesitation_chance) {
            micros += rng.random_range(max..=max.saturating_mul(2));
        }

        Duration::from_micros(micros)
    }
}
