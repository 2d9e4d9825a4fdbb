//! Runtime configuration structures and environment loaders.
use std::env;
use std::time::Duration;

use crate::lock::ModuleGroups;

/// Maximum number of times one action may be deferred into the blocked-retry queue.
pub const MAX_BLOCKED_RETRIES: u32 = 10;

/// Configuration of an [`crate::ActionScheduler`].
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Sleep between polls when nothing is ready.
    pub idle_interval: Duration,
    /// Bounded wait for the executor worker on `stop()`.
    pub stop_timeout: Duration,
    pub event_buffer_size: usize,
    pub pacing: PacingConfig,
    pub retry: RetryConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(10),
            stop_timeout: Duration::from_secs(2),
            event_buffer_size: 100,
            pacing: PacingConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `BOT_IDLE_INTERVAL_MS` - Executor idle poll interval (default: 10)
    /// - `BOT_STOP_TIMEOUT_MS` - Bounded wait on stop (default: 2000)
    /// - `BOT_EVENT_BUFFER` - Scheduler event channel capacity (default: 100)
    /// - `BOT_PACING_*` - See [`PacingConfig::from_env`]
    /// - `BOT_RETRY_*` - See [`RetryConfig::from_env`]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = read_env::<u64>("BOT_IDLE_INTERVAL_MS") {
            config.idle_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = read_env::<u64>("BOT_STOP_TIMEOUT_MS") {
            config.stop_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = read_env::<usize>("BOT_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }

        config.pacing = PacingConfig::from_env();
        config.retry = RetryConfig::from_env();
        config
    }
}

/// Humanized inter-action timing.
///
/// Each action waits for a randomly drawn "human gap" measured from the
/// previous execution. The remaining wait is then clamped to
/// `[floor, ceiling]`, so it is never zero and never a stall.
#[derive(Clone, Debug)]
pub struct PacingConfig {
    pub floor: Duration,
    pub ceiling: Duration,
    pub min_gap: Duration,
    pub max_gap: Duration,
    /// Probability of adding an extra hesitation on top of the gap.
    pub hesitation_chance: f64,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            floor: Duration::from_millis(25),
            ceiling: Duration::from_millis(600),
            min_gap: Duration::from_millis(80),
            max_gap: Duration::from_millis(250),
            hesitation_chance: 0.03,
            seed: None,
        }
    }
}

impl PacingConfig {
    /// Environment variables: `BOT_PACING_FLOOR_MS`, `BOT_PACING_CEILING_MS`,
    /// `BOT_PACING_MIN_GAP_MS`, `BOT_PACING_MAX_GAP_MS`,
    /// `BOT_PACING_HESITATION`, `BOT_PACING_SEED`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = read_env::<u64>("BOT_PACING_FLOOR_MS") {
            config.floor = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = read_env::<u64>("BOT_PACING_CEILING_MS") {
            config.ceiling = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BOT_PACING_MIN_GAP_MS") {
            config.min_gap = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BOT_PACING_MAX_GAP_MS") {
            config.max_gap = Duration::from_millis(ms);
        }
        if let Some(chance) = read_env::<f64>("BOT_PACING_HESITATION") {
            config.hesitation_chance = chance;
        }
        config.seed = read_env::<u64>("BOT_PACING_SEED");

        config.normalized()
    }

    /// Repairs inverted bounds so that `0 < floor <= ceiling` and `min_gap <= max_gap`.
    ///
    /// A non-finite hesitation chance disables hesitation.
    pub fn normalized(mut self) -> Self {
        if self.floor.is_zero() {
            self.floor = Duration::from_millis(1);
        }
        if self.ceiling < self.floor {
            self.ceiling = self.floor;
        }
        if self.max_gap < self.min_gap {
            std::mem::swap(&mut self.min_gap, &mut self.max_gap);
        }
        self.hesitation_chance = if self.hesitation_chance.is_finite() {
            self.hesitation_chance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

/// Blocked-retry limits. Retry count and timeout are independent guards.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_blocked_retries: u32,
    pub blocked_timeout: Duration,
    /// Capacity of the blocked-retry queue; oldest entries are dropped beyond it.
    pub max_blocked: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_blocked_retries: MAX_BLOCKED_RETRIES,
            blocked_timeout: Duration::from_secs(5),
            max_blocked: 50,
        }
    }
}

impl RetryConfig {
    /// Environment variables: `BOT_RETRY_MAX`, `BOT_RETRY_TIMEOUT_MS`,
    /// `BOT_RETRY_QUEUE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(max) = read_env::<u32>("BOT_RETRY_MAX") {
            config.max_blocked_retries = max;
        }
        if let Some(ms) = read_env::<u64>("BOT_RETRY_TIMEOUT_MS") {
            config.blocked_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = read_env::<usize>("BOT_RETRY_QUEUE") {
            config.max_blocked = capacity.max(1);
        }

        config
    }
}

/// Configuration of a [`crate::ModuleLock`].
#[derive(Clone, Debug)]
pub struct ModuleLockConfig {
    /// Minimum gap between a release and the next acquisition by an unrelated module.
    pub inter_module_delay: Duration,
    /// Poll interval while waiting for a held lock.
    pub poll_interval: Duration,
    pub groups: ModuleGroups,
}

impl Default for ModuleLockConfig {
    fn default() -> Self {
        Self {
            inter_module_delay: Duration::from_millis(300),
            poll_interval: Duration::from_millis(20),
            groups: ModuleGroups::builtin(),
        }
    }
}

impl ModuleLockConfig {
    /// Environment variables: `BOT_LOCK_DELAY_MS`, `BOT_LOCK_POLL_MS`.
    ///
    /// The group table is static and not read from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = read_env::<u64>("BOT_LOCK_DELAY_MS") {
            config.inter_module_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BOT_LOCK_POLL_MS") {
            config.poll_interval = Duration::from_millis(ms.max(1));
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
