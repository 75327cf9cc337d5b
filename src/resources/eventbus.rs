//! Publish/subscribe event bus.
//!
//! The [`EventBus`] resource maps each [`GameEvent`] to an ordered list of
//! [`Listener`]s. Every operation (add, remove, invoke, clear) is turned into a
//! [`BusCmd`] and pushed onto one FIFO queue; the queue is then drained by
//! whichever caller wins the drain guard. Listener tables are therefore only
//! ever mutated by the drainer, never while a dispatch is walking them.
//!
//! # Reentrancy
//!
//! A listener may call back into the bus (subscribe, unsubscribe, publish).
//! The call is queued behind the command currently being processed and runs
//! once that command finishes, so a listener added during a dispatch is not
//! called by that same dispatch.
//!
//! # Threads
//!
//! The bus is `Send + Sync` and cheap to clone (all clones share state). The
//! drain guard is an atomic compare-and-swap, so producers on several threads
//! may publish concurrently. A command enqueued while another thread is
//! draining is executed by that other thread, and the enqueuing call returns
//! immediately. Commands always execute in queue order.
//!
//! # Failure isolation
//!
//! A panicking listener is caught and logged; the remaining listeners for the
//! same invocation still run.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bevy_ecs::prelude::Resource;
use log::{debug, error};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::events::gameevent::{GameEvent, Payload};

/// Callback signature for bus listeners.
pub type ListenerFn = dyn Fn(Option<&Payload>) + Send + Sync;

/// Shareable handle to a listener callback.
///
/// Two handles are equal when they are clones of the same [`Listener::new`]
/// call. Keep a clone around to unsubscribe later.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    /// Wrap a closure as a listener.
    pub fn new(callback: impl Fn(Option<&Payload>) + Send + Sync + 'static) -> Self {
        Listener(Arc::new(callback))
    }

    fn call(&self, payload: Option<&Payload>) {
        (self.0)(payload)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Deferred bus operation.
enum BusCmd {
    Add(GameEvent, Listener),
    Remove(GameEvent, Listener),
    Invoke(GameEvent, Option<Payload>),
    Clear,
}

type SubscriptionTable = FxHashMap<GameEvent, Vec<Listener>>;

#[derive(Default)]
struct BusShared {
    queue: Mutex<VecDeque<BusCmd>>,
    table: Mutex<SubscriptionTable>,
    draining: AtomicBool,
}

/// Event bus resource. Clones share the same subscriptions and queue.
#[derive(Resource, Clone, Default)]
pub struct EventBus {
    shared: Arc<BusShared>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to `event`.
    ///
    /// Duplicates are stored and invoked once per registration.
    pub fn add_listener(&self, event: GameEvent, listener: Listener) {
        self.enqueue(BusCmd::Add(event, listener));
    }

    /// Remove one registration of `listener` for `event`.
    ///
    /// Unknown pairs are ignored.
    pub fn remove_listener(&self, event: GameEvent, listener: Listener) {
        self.enqueue(BusCmd::Remove(event, listener));
    }

    /// Call every listener registered for `event`, in registration order.
    pub fn invoke_event(&self, event: GameEvent, payload: Option<Payload>) {
        self.enqueue(BusCmd::Invoke(event, payload));
    }

    /// Drop every subscription once the commands queued before it have run.
    pub fn clear(&self) {
        self.enqueue(BusCmd::Clear);
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: GameEvent) -> usize {
        self.shared.table.lock().get(&event).map_or(0, Vec::len)
    }

    /// Whether `event` has at least one listener.
    pub fn has_listeners(&self, event: GameEvent) -> bool {
        self.shared.table.lock().contains_key(&event)
    }

    /// Number of commands waiting to be drained.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Queue a subscription without draining. Pair with [`EventBus::flush`].
    pub(crate) fn queue_add(&self, event: GameEvent, listener: Listener) {
        self.shared.queue.lock().push_back(BusCmd::Add(event, listener));
    }

    /// Queue an unsubscription without draining. Pair with [`EventBus::flush`].
    pub(crate) fn queue_remove(&self, event: GameEvent, listener: Listener) {
        self.shared.queue.lock().push_back(BusCmd::Remove(event, listener));
    }

    /// Drain whatever is queued, unless another caller already is.
    pub(crate) fn flush(&self) {
        self.try_drain();
    }

    fn enqueue(&self, cmd: BusCmd) {
        self.shared.queue.lock().push_back(cmd);
        self.try_drain();
    }

    fn next_cmd(&self) -> Option<BusCmd> {
        self.shared.queue.lock().pop_front()
    }

    fn try_drain(&self) {
        loop {
            if self
                .shared
                .draining
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                // The current drainer will pick our command up.
                return;
            }
            while let Some(cmd) = self.next_cmd() {
                self.execute(cmd);
            }
            self.shared.draining.store(false, Ordering::Release);

            // A producer may have pushed after our last pop but before the
            // guard was released; it saw the guard held and left.
            if self.shared.queue.lock().is_empty() {
                return;
            }
        }
    }

    fn execute(&self, cmd: BusCmd) {
        match cmd {
            BusCmd::Add(event, listener) => {
                debug!("eventbus: add {} {:?}", event, listener);
                self.shared
                    .table
                    .lock()
                    .entry(event)
                    .or_default()
                    .push(listener);
            }
            BusCmd::Remove(event, listener) => {
                let mut table = self.shared.table.lock();
                if let Some(listeners) = table.get_mut(&event) {
                    if let Some(pos) = listeners.iter().position(|l| *l == listener) {
                        listeners.remove(pos);
                        debug!("eventbus: removed {} {:?}", event, listener);
                    }
                    if listeners.is_empty() {
                        table.remove(&event);
                    }
                }
            }
            BusCmd::Invoke(event, payload) => {
                let snapshot: Vec<Listener> = self
                    .shared
                    .table
                    .lock()
                    .get(&event)
                    .cloned()
                    .unwrap_or_default();
                // Table lock released: listeners may touch the bus.
                for listener in snapshot {
                    let result = catch_unwind(AssertUnwindSafe(|| listener.call(payload.as_ref())));
                    if result.is_err() {
                        error!("eventbus: listener {:?} panicked handling {}", listener, event);
                    }
                }
            }
            BusCmd::Clear => {
                self.shared.table.lock().clear();
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.shared.table.lock().len())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::gameevent::payload;
    use std::sync::atomic::AtomicUsize;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = log.clone();
        Listener::new(move |_| log.lock().push(tag))
    }

    #[test]
    fn test_invoke_calls_listeners_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.add_listener(GameEvent::ScoreChanged, recorder(&log, "a"));
        bus.add_listener(GameEvent::ScoreChanged, recorder(&log, "b"));
        bus.add_listener(GameEvent::PlayerDied, recorder(&log, "x"));

        bus.invoke_event(GameEvent::ScoreChanged, None);

        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_duplicates_are_invoked_twice_and_removed_one_at_a_time() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let listener = Listener::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.add_listener(GameEvent::CoinCollected, listener.clone());
        bus.add_listener(GameEvent::CoinCollected, listener.clone());

        bus.invoke_event(GameEvent::CoinCollected, None);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        bus.remove_listener(GameEvent::CoinCollected, listener.clone());
        assert_eq!(bus.listener_count(GameEvent::CoinCollected), 1);
        bus.invoke_event(GameEvent::CoinCollected, None);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_removing_last_listener_drops_the_key() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = recorder(&log, "a");
        bus.add_listener(GameEvent::GamePaused, listener.clone());
        assert!(bus.has_listeners(GameEvent::GamePaused));

        bus.remove_listener(GameEvent::GamePaused, listener);
        assert!(!bus.has_listeners(GameEvent::GamePaused));
        assert!(!bus.shared.table.lock().contains_key(&GameEvent::GamePaused));
    }

    #[test]
    fn test_removing_unknown_listener_is_a_no_op() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.add_listener(GameEvent::GamePaused, recorder(&log, "kept"));

        bus.remove_listener(GameEvent::GamePaused, recorder(&log, "other"));
        bus.remove_listener(GameEvent::GameOver, recorder(&log, "other"));

        assert_eq!(bus.listener_count(GameEvent::GamePaused), 1);
        assert!(!bus.has_listeners(GameEvent::GameOver));
    }

    #[test]
    fn test_listener_added_during_dispatch_misses_that_dispatch() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = recorder(&log, "late");
        let bus_clone = bus.clone();
        let log_clone = log.clone();
        bus.add_listener(
            GameEvent::LevelLoaded,
            Listener::new(move |_| {
                log_clone.lock().push("first");
                bus_clone.add_listener(GameEvent::LevelLoaded, late.clone());
            }),
        );

        bus.invoke_event(GameEvent::LevelLoaded, None);
        assert_eq!(*log.lock(), vec!["first"]);
        assert_eq!(bus.listener_count(GameEvent::LevelLoaded), 2);
    }

    #[test]
    fn test_event_published_from_listener_runs_after_current_dispatch() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus_clone = bus.clone();
        let log_clone = log.clone();
        bus.add_listener(
            GameEvent::PlayerDied,
            Listener::new(move |_| {
                log_clone.lock().push("died");
                bus_clone.invoke_event(GameEvent::GameOver, None);
            }),
        );
        bus.add_listener(GameEvent::PlayerDied, recorder(&log, "died-2"));
        bus.add_listener(GameEvent::GameOver, recorder(&log, "over"));

        bus.invoke_event(GameEvent::PlayerDied, None);
        assert_eq!(*log.lock(), vec!["died", "died-2", "over"]);
    }

    fn exploding_listener(_payload: Option<&Payload>) {
        panic!("listener failure");
    }

    #[test]
    fn test_panicking_listener_does_not_stop_others() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.add_listener(GameEvent::EnemyDefeated, recorder(&log, "before"));
        bus.add_listener(GameEvent::EnemyDefeated, Listener::new(exploding_listener));
        bus.add_listener(GameEvent::EnemyDefeated, recorder(&log, "after"));

        bus.invoke_event(GameEvent::EnemyDefeated, None);
        assert_eq!(*log.lock(), vec!["before", "after"]);

        // The bus is still usable afterwards.
        bus.invoke_event(GameEvent::EnemyDefeated, None);
        assert_eq!(log.lock().len(), 4);
    }

    #[test]
    fn test_payload_is_passed_through() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        bus.add_listener(
            GameEvent::ScoreChanged,
            Listener::new(move |p| {
                s.lock().push(p.and_then(|p| p.downcast_ref::<u32>().copied()));
            }),
        );
        bus.invoke_event(GameEvent::ScoreChanged, Some(payload(7u32)));
        bus.invoke_event(GameEvent::ScoreChanged, None);
        assert_eq!(*seen.lock(), vec![Some(7), None]);
    }

    #[test]
    fn test_clear_removes_everything() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.add_listener(GameEvent::GameStarted, recorder(&log, "a"));
        bus.add_listener(GameEvent::GameOver, recorder(&log, "b"));
        bus.clear();
        bus.invoke_event(GameEvent::GameStarted, None);
        bus.invoke_event(GameEvent::GameOver, None);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_concurrent_publishers_all_delivered() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.add_listener(
            GameEvent::CoinCollected,
            Listener::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        bus.invoke_event(GameEvent::CoinCollected, None);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 800);
        assert_eq!(bus.pending(), 0);
    }
}
