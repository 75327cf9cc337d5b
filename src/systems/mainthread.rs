//! Main thread queue drain.
//!
//! [`drain_main_thread_queue`] is an exclusive system: it needs `&mut World`
//! because every queued action does. Run it once per tick, before systems
//! that read pool state, so results delivered by background threads are
//! visible in the same frame.

use std::panic::{AssertUnwindSafe, catch_unwind};

use bevy_ecs::prelude::*;
use log::{error, warn};

use crate::resources::mainthread::MainThreadQueue;

/// Execute every action that was queued when the drain started.
///
/// Actions are run in FIFO order. Actions queued while draining (including by
/// the actions themselves) wait for the next call. A panicking action is
/// logged and does not prevent the remaining ones from running.
///
/// Returns the number of actions executed.
pub fn drain_main_thread_queue(world: &mut World) -> usize {
    let Some(queue) = world.get_resource::<MainThreadQueue>() else {
        warn!("drain_main_thread_queue: MainThreadQueue resource missing");
        return 0;
    };
    let rx = queue.receiver();
    let present = rx.len();

    let mut executed = 0;
    for action in rx.try_iter().take(present) {
        if catch_unwind(AssertUnwindSafe(|| action(world))).is_err() {
            error!("main thread queue: action panicked");
        }
        executed += 1;
    }
    executed
}

/// Schedule-friendly wrapper around [`drain_main_thread_queue`].
pub fn main_thread_queue_system(world: &mut World) {
    drain_main_thread_queue(world);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Resource, Default)]
    struct Trace(Vec<u32>);

    fn make_world() -> World {
        let mut world = World::new();
        world.insert_resource(MainThreadQueue::new());
        world.init_resource::<Trace>();
        world
    }

    #[test]
    fn test_drain_runs_actions_in_fifo_order() {
        let mut world = make_world();
        let queue = world.resource::<MainThreadQueue>();
        for i in 0..5 {
            queue.enqueue(move |w: &mut World| w.resource_mut::<Trace>().0.push(i));
        }

        assert_eq!(drain_main_thread_queue(&mut world), 5);
        assert_eq!(world.resource::<Trace>().0, vec![0, 1, 2, 3, 4]);
        assert_eq!(world.resource::<MainThreadQueue>().pending(), 0);
    }

    #[test]
    fn test_actions_enqueued_during_drain_wait_for_next_tick() {
        let mut world = make_world();
        let sender = world.resource::<MainThreadQueue>().sender();
        let inner = sender.clone();
        sender.enqueue(move |w: &mut World| {
            w.resource_mut::<Trace>().0.push(1);
            inner.enqueue(|w: &mut World| w.resource_mut::<Trace>().0.push(2));
        });

        assert_eq!(drain_main_thread_queue(&mut world), 1);
        assert_eq!(world.resource::<Trace>().0, vec![1]);

        assert_eq!(drain_main_thread_queue(&mut world), 1);
        assert_eq!(world.resource::<Trace>().0, vec![1, 2]);
    }

    fn exploding_action(_world: &mut World) {
        panic!("boom");
    }

    #[test]
    fn test_panicking_action_does_not_block_later_ones() {
        let mut world = make_world();
        let queue = world.resource::<MainThreadQueue>();
        queue.enqueue(|w: &mut World| w.resource_mut::<Trace>().0.push(1));
        queue.enqueue(exploding_action);
        queue.enqueue(|w: &mut World| w.resource_mut::<Trace>().0.push(3));

        assert_eq!(drain_main_thread_queue(&mut world), 3);
        assert_eq!(world.resource::<Trace>().0, vec![1, 3]);
    }

    #[test]
    fn test_actions_from_many_threads_run_exactly_once_on_owner() {
        let mut world = make_world();
        let owner = std::thread::current().id();
        let wrong_thread = Arc::new(Mutex::new(false));
        let sender = world.resource::<MainThreadQueue>().sender();

        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let sender = sender.clone();
                let wrong_thread = wrong_thread.clone();
                std::thread::spawn(move || {
                    for i in 0..25u32 {
                        let wrong_thread = wrong_thread.clone();
                        sender.enqueue(move |w: &mut World| {
                            if std::thread::current().id() != owner {
                                *wrong_thread.lock().unwrap() = true;
                            }
                            w.resource_mut::<Trace>().0.push(t * 100 + i);
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(drain_main_thread_queue(&mut world), 100);
        let mut trace = world.resource::<Trace>().0.clone();
        // Per-thread submission order is preserved.
        for t in 0..4u32 {
            let from_t: Vec<u32> = trace.iter().copied().filter(|v| v / 100 == t).collect();
            assert_eq!(from_t, (0..25).map(|i| t * 100 + i).collect::<Vec<_>>());
        }
        trace.sort_unstable();
        trace.dedup();
        assert_eq!(trace.len(), 100);
        assert!(!*wrong_thread.lock().unwrap());
    }

    #[test]
    fn test_drain_without_queue_is_harmless() {
        let mut world = World::new();
        assert_eq!(drain_main_thread_queue(&mut world), 0);
    }
}
