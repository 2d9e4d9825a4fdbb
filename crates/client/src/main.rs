//! Bot harness binary.
//!
//! Composition root for one bot session: loads configuration, installs
//! logging, wires one [`ActionScheduler`] and one [`ModuleLock`] into the
//! simulated producer modules, runs for the configured session length and
//! reports the scheduler statistics.
//!
//! ```bash
//! BOT_SESSION_SECS=60 RUST_LOG=bot_runtime=debug cargo run -p bot-client
//! ```

mod config;
mod logging;
mod simulation;

use std::sync::Arc;

use anyhow::Result;
use bot_runtime::{ActionScheduler, ModuleLock};
use tokio::task::JoinSet;

use config::ClientConfig;
use simulation::{Simulation, World};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env();
    let _log_guard = logging::init(config.log_dir.as_deref())?;

    tracing::info!(
        session_secs = config.session.as_secs(),
        seed = ?config.seed,
        "Starting bot session"
    );

    let world = Arc::new(World::new());
    let scheduler = ActionScheduler::new(config.scheduler.clone());
    let lock = ModuleLock::new(config.lock.clone());

    let observed = Arc::clone(&world);
    scheduler.set_movement_checker(move || observed.is_moving());
    scheduler.start()?;

    let mut tasks = JoinSet::new();
    Simulation::new(scheduler.clone(), lock.clone(), Arc::clone(&world), config.seed)
        .spawn_all(&mut tasks);

    tokio::select! {
        _ = tokio::time::sleep(config.session) => tracing::info!("Session finished"),
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
    }

    // Aborting the producers drops any lease they still hold.
    tasks.shutdown().await;
    if let Some(module) = lock.force_release() {
        tracing::warn!(module = %module, "Module lock still held at shutdown");
    }

    let pending = scheduler.get_queue_size() + scheduler.get_blocked_count();
    scheduler.stop().await?;

    let stats = scheduler.get_stats();
    tracing::info!(
        dropped = pending,
        success_rate = %format!("{:.1}%", stats.success_rate()),
        "Bot session complete"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
