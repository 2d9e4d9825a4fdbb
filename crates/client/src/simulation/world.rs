//! Simulated game state shared by the producer modules.
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

pub const MAX_HP: u32 = 100;

/// Stand-in for the memory reader: just enough state for producers to
/// decide what to submit and for validators to re-check it.
#[derive(Debug)]
pub struct World {
    hp: AtomicU32,
    creatures: AtomicU32,
    corpses: AtomicU32,
    loose_fish: AtomicU32,
    moving_until: Mutex<Option<Instant>>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            hp: AtomicU32::new(MAX_HP),
            creatures: AtomicU32::new(0),
            corpses: AtomicU32::new(0),
            loose_fish: AtomicU32::new(0),
            moving_until: Mutex::new(None),
        }
    }
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a walk started by [`Self::walk`] is still in progress.
    pub fn is_moving(&self) -> bool {
        self.moving_until
            .lock()
            .is_some_and(|until| Instant::now() < until)
    }

    /// Starts (or extends) a walk lasting `duration`.
    pub fn walk(&self, duration: Duration) {
        let until = Instant::now() + duration;
        let mut moving_until = self.moving_until.lock();
        *moving_until = Some(moving_until.map_or(until, |current| current.max(until)));
    }

    pub fn hp(&self) -> u32 {
        self.hp.load(Ordering::Acquire)
    }

    pub fn damage(&self, amount: u32) {
        let _ = self
            .hp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |hp| {
                Some(hp.saturating_sub(amount))
            });
    }

    pub fn heal(&self, amount: u32) {
        let _ = self
            .hp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |hp| {
                Some((hp + amount).min(MAX_HP))
            });
    }

    pub fn creatures(&self) -> u32 {
        self.creatures.load(Ordering::Acquire)
    }

    pub fn spawn_creature(&self) {
        self.creatures.fetch_add(1, Ordering::AcqRel);
    }

    /// Kills one creature and leaves a corpse. `false` if none was left.
    pub fn kill_creature(&self) -> bool {
        if take_one(&self.creatures) {
            self.corpses.fetch_add(1, Ordering::AcqRel);
            true
        } else {
            false
        }
    }

    /// Drops every creature's aggro (the character fled).
    pub fn flee(&self) -> u32 {
        self.creatures.swap(0, Ordering::AcqRel)
    }

    pub fn corpses(&self) -> u32 {
        self.corpses.load(Ordering::Acquire)
    }

    pub fn loot_corpse(&self) -> bool {
        take_one(&self.corpses)
    }

    pub fn loose_fish(&self) -> u32 {
        self.loose_fish.load(Ordering::Acquire)
    }

    pub fn catch_fish(&self) {
        self.loose_fish.fetch_add(1, Ordering::AcqRel);
    }

    /// Merges all loose fish into one stack, returning how many were moved.
    pub fn stack_fish(&self) -> u32 {
        self.loose_fish.swap(0, Ordering::AcqRel)
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn killing_moves_creatures_to_corpses() {
        let world = World::new();
        assert!(!world.kill_creature());

        world.spawn_creature();
        world.spawn_creature();
        assert!(world.kill_creature());
        assert_eq!(world.creatures(), 1);
        assert_eq!(world.corpses(), 1);

        assert!(world.loot_corpse());
        assert!(!world.loot_corpse());
    }

    #[test]
    fn hp_stays_within_bounds() {
        let world = World::new();
        world.damage(250);
        assert_eq!(world.hp(), 0);
        world.heal(40);
        world.heal(90);
        assert_eq!(world.hp(), MAX_HP);
    }

    #[tokio::test(start_paused = true)]
    async fn walking_ends_after_its_duration() {
        let world = World::new();
        assert!(!world.is_moving());

        world.walk(Duration::from_millis(300));
        world.walk(Duration::from_millis(100));
        assert!(world.is_moving());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(world.is_moving());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!world.is_moving());
    }
}
