//! Simulated producer modules.
//!
//! Each module is an independent task that reads the [`World`], decides what
//! it wants to do and hands actions to the shared scheduler. Modules that
//! need an uninterrupted burst (fishing, stacking, looting) take the module
//! lock around it.

mod world;

pub use world::World;

use std::sync::Arc;
use std::time::Duration;

use bot_core::{Action, ActionError, ActionResult, ActionType};
use bot_runtime::{ActionScheduler, ModuleLock, SchedulerEvent};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const LOCK_WAIT: Duration = Duration::from_secs(2);
const STEP: Duration = Duration::from_millis(150);

/// Handles shared by every simulated module.
#[derive(Clone)]
pub struct Simulation {
    scheduler: ActionScheduler,
    lock: ModuleLock,
    world: Arc<World>,
    seed: Option<u64>,
}

impl Simulation {
    pub fn new(
        scheduler: ActionScheduler,
        lock: ModuleLock,
        world: Arc<World>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            scheduler,
            lock,
            world,
            seed,
        }
    }

    /// Spawns the world ticker, every producer module and the event monitor.
    pub fn spawn_all(&self, tasks: &mut JoinSet<()>) {
        tasks.spawn(self.clone().world_ticker());
        tasks.spawn(self.clone().walker());
        tasks.spawn(self.clone().targeting());
        tasks.spawn(self.clone().healer());
        tasks.spawn(self.clone().looter());
        tasks.spawn(self.clone().fisher());
        tasks.spawn(self.clone().stacker());
        tasks.spawn(monitor(self.scheduler.subscribe()));
    }

    fn rng(&self, salt: u64) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed ^ salt),
            None => SmallRng::from_os_rng(),
        }
    }

    /// Spawns creatures and applies their damage.
    async fn world_ticker(self) {
        let mut rng = self.rng(0);
        loop {
            tokio::time::sleep(Duration::from_millis(rng.random_range(600..1_500))).await;

            if rng.random_bool(0.4) {
                self.world.spawn_creature();
            }
            let creatures = self.world.creatures();
            if creatures > 0 {
                self.world.damage(creatures * rng.random_range(2..8));
            }
        }
    }

    async fn walker(self) {
        let mut rng = self.rng(1);
        loop {
            tokio::time::sleep(Duration::from_millis(rng.random_range(800..2_000))).await;
            if self.world.creatures() > 0 {
                continue;
            }

            let steps = rng.random_range(2..6);
            let world = Arc::clone(&self.world);
            let walk = Action::new(ActionType::Walk, "walker", move || {
                world.walk(STEP * steps);
                Ok(true)
            })
            .expires_in(Duration::from_secs(1));
            self.scheduler.submit(walk).await;
        }
    }

    async fn targeting(self) {
        let mut rng = self.rng(2);
        loop {
            tokio::time::sleep(Duration::from_millis(rng.random_range(300..700))).await;
            if self.world.creatures() == 0 {
                continue;
            }

            let world = Arc::clone(&self.world);
            let view = Arc::clone(&self.world);
            let attack = Action::new(ActionType::Attack, "targeting", move || {
                Ok(world.kill_creature())
            })
            .with_validator(move || Ok(view.creatures() > 0))
            .expires_in(Duration::from_millis(1_500));
            self.scheduler.submit(attack).await;
        }
    }

    async fn healer(self) {
        loop {
            tokio::time::sleep(Duration::from_millis(250)).await;
            let hp = self.world.hp();

            if hp < 15 {
                let dropped = self.scheduler.clear_module_actions("targeting");
                let world = Arc::clone(&self.world);
                let alarm = Action::new(ActionType::AlarmResponse, "healer", move || {
                    world.flee();
                    world.heal(40);
                    Ok(true)
                });
                let handled = self.scheduler.submit(alarm).await;
                warn!(hp, dropped, handled, "Low health alarm");
            } else if hp < 60 {
                let world = Arc::clone(&self.world);
                let view = Arc::clone(&self.world);
                let heal = Action::new(ActionType::Heal, "healer", move || {
                    world.heal(30);
                    Ok(true)
                })
                .with_validator(move || Ok(view.hp() < 80))
                .expires_in(Duration::from_millis(500));
                self.scheduler.submit(heal).await;
            }
        }
    }

    /// Opens a corpse and moves its loot to the backpack as one burst.
    async fn looter(self) {
        let mut rng = self.rng(3);
        loop {
            tokio::time::sleep(Duration::from_millis(rng.random_range(400..900))).await;
            if self.world.corpses() == 0 {
                continue;
            }

            let Ok(_guard) = self.lock.lock("looter", 120, LOCK_WAIT).await else {
                debug!(module = "looter", "Module lock busy, skipping this cycle");
                continue;
            };

            let world = Arc::clone(&self.world);
            let view = Arc::clone(&self.world);
            let (open, opened) = tracked(ActionType::Loot, "looter", move || {
                if world.loot_corpse() {
                    Ok(true)
                } else {
                    Err(ActionError::unavailable("corpse"))
                }
            });
            let open = open
                .with_validator(move || Ok(view.corpses() > 0))
                .expires_in(Duration::from_secs(3));
            if !self.submit_and_wait(open, opened).await {
                continue;
            }

            let (move_loot, moved) = tracked(ActionType::MoveItem, "looter", || Ok(true));
            self.submit_and_wait(move_loot.expires_in(Duration::from_secs(3)), moved)
                .await;
        }
    }

    /// Casts the rod a few times without other modules' clicks in between.
    async fn fisher(self) {
        let mut rng = self.rng(4);
        loop {
            tokio::time::sleep(Duration::from_millis(rng.random_range(1_500..3_000))).await;
            if self.world.creatures() > 0 {
                continue;
            }

            let Ok(guard) = self.lock.lock("fisher", 150, LOCK_WAIT).await else {
                debug!(module = "fisher", "Module lock busy, skipping this cycle");
                continue;
            };

            let casts = rng.random_range(2..5);
            for _ in 0..casts {
                let world = Arc::clone(&self.world);
                let bites = rng.random_bool(0.5);
                let (cast, landed) = tracked(ActionType::UseItemOn, "fisher", move || {
                    if bites {
                        world.catch_fish();
                    }
                    Ok(true)
                });
                self.submit_and_wait(cast.expires_in(Duration::from_secs(2)), landed)
                    .await;
            }
            drop(guard);
        }
    }

    /// Stacks loose fish; borrows the fisher's lock when it runs mid-burst.
    async fn stacker(self) {
        let mut rng = self.rng(5);
        loop {
            tokio::time::sleep(Duration::from_millis(rng.random_range(700..1_200))).await;
            if self.world.loose_fish() < 2 {
                continue;
            }

            let guard = match self.lock.lock("stacker", 150, LOCK_WAIT).await {
                Ok(guard) => guard,
                Err(err) => {
                    debug!(module = "stacker", error = %err, "Skipping stack");
                    continue;
                }
            };
            if guard.is_reused() {
                debug!(module = "stacker", "Stacking inside the fishing burst");
            }

            let world = Arc::clone(&self.world);
            let (stack, stacked) = tracked(ActionType::MoveItem, "stacker", move || {
                Ok(world.stack_fish() > 0)
            });
            self.submit_and_wait(stack.expires_in(Duration::from_secs(2)), stacked)
                .await;
        }
    }

    /// Submits a [`tracked`] action and waits until it ran.
    ///
    /// Discarded or expired actions never signal; the wait timeout covers them.
    async fn submit_and_wait(&self, action: Action, done: Arc<Notify>) -> bool {
        if !self.scheduler.submit(action).await {
            return false;
        }
        tokio::time::timeout(Duration::from_secs(3), done.notified())
            .await
            .is_ok()
    }
}

/// Builds an action that signals `Notify` once its closure has run.
fn tracked<F>(kind: ActionType, module: &str, mut work: F) -> (Action, Arc<Notify>)
where
    F: FnMut() -> ActionResult<bool> + Send + 'static,
{
    let done = Arc::new(Notify::new());
    let signal = Arc::clone(&done);
    let action = Action::new(kind, module, move || {
        let outcome = work();
        signal.notify_one();
        outcome
    });
    (action, done)
}

/// Logs terminal dispositions other than routine successes.
async fn monitor(mut events: broadcast::Receiver<SchedulerEvent>) {
    loop {
        match events.recv().await {
            Ok(SchedulerEvent::Discarded { action, reason }) => info!(
                action = %action.action_type,
                module = %action.source_module,
                reason = reason.as_str(),
                "Action discarded"
            ),
            Ok(SchedulerEvent::Executed {
                action,
                success: false,
            }) => debug!(
                action = %action.action_type,
                module = %action.source_module,
                "Action reported failure"
            ),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Event monitor lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
