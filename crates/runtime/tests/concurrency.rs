mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bot_core::{Action, ActionType};
use bot_runtime::{PacingConfig, SchedulerConfig, SchedulerEvent};
use common::{started, wait_until};

/// Tracks how many execution closures run at the same time.
#[derive(Default)]
struct Occupancy {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Occupancy {
    fn action(self: &Arc<Self>, kind: ActionType, module: &str) -> Action {
        let occupancy = Arc::clone(self);
        Action::new(kind, module, move || {
            let now = occupancy.active.fetch_add(1, Ordering::SeqCst) + 1;
            occupancy.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            occupancy.active.fetch_sub(1, Ordering::SeqCst);
            Ok(true)
        })
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        pacing: PacingConfig {
            floor: Duration::from_millis(1),
            ceiling: Duration::from_millis(2),
            min_gap: Duration::from_millis(1),
            max_gap: Duration::from_millis(1),
            hesitation_chance: 0.0,
            seed: Some(1),
        },
        event_buffer_size: 1024,
        ..SchedulerConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_action_in_flight_across_queued_and_immediate_paths() {
    let scheduler = started(fast_config());
    let mut events = scheduler.subscribe();
    let occupancy = Arc::new(Occupancy::default());

    let mut producers = Vec::new();
    for producer in 0..4 {
        let scheduler = scheduler.clone();
        let occupancy = Arc::clone(&occupancy);
        producers.push(tokio::spawn(async move {
            let module = format!("module-{producer}");
            for i in 0..5 {
                let kind = if i % 2 == 0 {
                    ActionType::Say
                } else {
                    ActionType::Attack
                };
                assert!(scheduler.submit(occupancy.action(kind, &module)).await);
                tokio::task::yield_now().await;
            }
        }));
    }

    let alarm = {
        let scheduler = scheduler.clone();
        let occupancy = Arc::clone(&occupancy);
        tokio::spawn(async move {
            for _ in 0..3 {
                let stop = occupancy.action(ActionType::EmergencyStop, "alarm");
                assert!(scheduler.submit_immediate(stop).await);
                tokio::time::sleep(Duration::from_millis(3)).await;
            }
        })
    };

    for producer in producers {
        producer.await.unwrap();
    }
    alarm.await.unwrap();

    wait_until(Duration::from_secs(10), || scheduler.get_stats().executed == 23).await;
    assert_eq!(occupancy.peak(), 1);

    let stats = scheduler.get_stats();
    assert_eq!(stats.submitted, 20);
    assert_eq!(stats.immediate, 3);
    assert_eq!(stats.failed, 0);

    // Concurrent submitters still receive distinct, gap-free sequence numbers.
    let mut sequences = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SchedulerEvent::Queued { sequence, .. } = event {
            sequences.push(sequence);
        }
    }
    sequences.sort_unstable();
    assert_eq!(sequences, (0..20).collect::<Vec<u64>>());

    scheduler.stop().await.unwrap();
}
