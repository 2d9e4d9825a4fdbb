//! Harness configuration.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use bot_runtime::{ModuleLockConfig, SchedulerConfig};

/// Everything the harness needs to assemble one bot session.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// How long the simulated session runs before shutting down.
    pub session: Duration,
    /// Directory for the daily-rolling log file. Stderr only when unset.
    pub log_dir: Option<PathBuf>,
    /// Seed for the simulated world; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub scheduler: SchedulerConfig,
    pub lock: ModuleLockConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session: Duration::from_secs(30),
            log_dir: None,
            seed: None,
            scheduler: SchedulerConfig::default(),
            lock: ModuleLockConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BOT_SESSION_SECS` - Session length in seconds (default: 30)
    /// - `BOT_LOG_DIR` - Log file directory (default: unset, stderr only)
    /// - `BOT_SIM_SEED` - Simulation RNG seed (default: random)
    ///
    /// Scheduler and lock settings come from their own `from_env` loaders.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = read_env::<u64>("BOT_SESSION_SECS") {
            config.session = Duration::from_secs(secs.max(1));
        }
        config.log_dir = env::var_os("BOT_LOG_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        config.seed = read_env::<u64>("BOT_SIM_SEED");

        config.scheduler = SchedulerConfig::from_env();
        config.lock = ModuleLockConfig::from_env();
        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
