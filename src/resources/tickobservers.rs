//! Per-phase tick observers.
//!
//! A [`TickDispatcher`] calls every registered [`TickObserver`] once per tick
//! of its [`TickPhase`]. There is one dispatcher resource per phase
//! ([`Update`], [`FixedUpdate`], [`LateUpdate`]); all three share the same
//! iteration-safe list, [`ObserverSet`].
//!
//! # Mid-tick changes
//!
//! Observers run with the dispatcher unlocked, so they may register or
//! unregister observers (themselves included) while a tick is in progress:
//!
//! - Unregistering takes effect immediately. The tick walks the active list
//!   from last to first and shifts its cursor when an entry below it is
//!   removed, so every remaining observer still runs exactly once.
//! - Registering goes to a pending buffer that is merged after the tick, so a
//!   new observer first runs on the following tick.

use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use log::{debug, error, warn};
use parking_lot::Mutex;

/// Active/pending observer list with a removal-tolerant iteration cursor.
///
/// An item is never in both lists at once. Iterate with
/// [`begin`](ObserverSet::begin), [`advance`](ObserverSet::advance) until `None`,
/// then [`finish`](ObserverSet::finish).
#[derive(Debug, Clone)]
pub struct ObserverSet<T> {
    active: Vec<T>,
    pending: Vec<T>,
    // Entries below `cursor` have not been visited in the current pass.
    cursor: usize,
    iterating: bool,
}

impl<T> Default for ObserverSet<T> {
    fn default() -> Self {
        ObserverSet {
            active: Vec::new(),
            pending: Vec::new(),
            cursor: 0,
            iterating: false,
        }
    }
}

impl<T: PartialEq + Clone> ObserverSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `item` for the next pass. Returns `false` if already present.
    pub fn register(&mut self, item: T) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.pending.push(item);
        true
    }

    /// Remove `item` from the active list (or from pending if not active yet).
    ///
    /// Returns `false` if it was not registered.
    pub fn unregister(&mut self, item: &T) -> bool {
        if let Some(index) = self.active.iter().position(|a| a == item) {
            self.active.remove(index);
            if self.iterating && index < self.cursor {
                self.cursor -= 1;
            }
            return true;
        }
        if let Some(index) = self.pending.iter().position(|p| p == item) {
            self.pending.remove(index);
            return true;
        }
        false
    }

    pub fn contains(&self, item: &T) -> bool {
        self.active.contains(item) || self.pending.contains(item)
    }

    /// Start a pass over the active list.
    pub fn begin(&mut self) {
        self.cursor = self.active.len();
        self.iterating = true;
    }

    /// Next entry of the current pass, walking from last to first.
    pub fn advance(&mut self) -> Option<T> {
        if !self.iterating || self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.active[self.cursor].clone())
    }

    /// End the pass and promote pending registrations.
    pub fn finish(&mut self) {
        self.iterating = false;
        self.cursor = 0;
        self.active.append(&mut self.pending);
    }

    pub fn is_iterating(&self) -> bool {
        self.iterating
    }

    pub fn active(&self) -> &[T] {
        &self.active
    }

    pub fn pending(&self) -> &[T] {
        &self.pending
    }
}

/// Something that wants a callback every tick of a phase.
pub trait TickObserver: Send + Sync {
    /// Called once per tick with the phase's delta in seconds.
    fn on_tick(&self, delta: f32);
}

impl<F> TickObserver for F
where
    F: Fn(f32) + Send + Sync,
{
    fn on_tick(&self, delta: f32) {
        self(delta)
    }
}

/// Shareable observer handle; equal when cloned from the same allocation.
#[derive(Clone)]
pub struct TickObserverRef(Arc<dyn TickObserver>);

impl TickObserverRef {
    pub fn new(observer: impl TickObserver + 'static) -> Self {
        TickObserverRef(Arc::new(observer))
    }

    pub fn from_arc(observer: Arc<dyn TickObserver>) -> Self {
        TickObserverRef(observer)
    }
}

impl PartialEq for TickObserverRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TickObserverRef {}

impl fmt::Debug for TickObserverRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TickObserver({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Marker for a tick phase.
pub trait TickPhase: Send + Sync + 'static {
    const NAME: &'static str;
}

/// Variable-rate per-frame phase.
pub struct Update;
/// Fixed-step simulation phase.
pub struct FixedUpdate;
/// Per-frame phase run after everything else.
pub struct LateUpdate;

impl TickPhase for Update {
    const NAME: &'static str = "update";
}

impl TickPhase for FixedUpdate {
    const NAME: &'static str = "fixed_update";
}

impl TickPhase for LateUpdate {
    const NAME: &'static str = "late_update";
}

/// Observer dispatcher for phase `P`. Clones share the same observers.
#[derive(Resource)]
pub struct TickDispatcher<P: TickPhase> {
    set: Arc<Mutex<ObserverSet<TickObserverRef>>>,
    _phase: PhantomData<fn() -> P>,
}

impl<P: TickPhase> Default for TickDispatcher<P> {
    fn default() -> Self {
        TickDispatcher {
            set: Arc::new(Mutex::new(ObserverSet::new())),
            _phase: PhantomData,
        }
    }
}

impl<P: TickPhase> Clone for TickDispatcher<P> {
    fn clone(&self) -> Self {
        TickDispatcher {
            set: self.set.clone(),
            _phase: PhantomData,
        }
    }
}

impl<P: TickPhase> TickDispatcher<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer`; it first runs on the next tick.
    ///
    /// Registering an observer twice logs a warning and does nothing.
    pub fn register_observer(&self, observer: TickObserverRef) {
        let added = self.set.lock().register(observer.clone());
        if added {
            debug!("{}: registered {:?}", P::NAME, observer);
        } else {
            warn!("{}: {:?} is already registered", P::NAME, observer);
        }
    }

    /// Unregister `observer` immediately, even mid-tick.
    pub fn unregister_observer(&self, observer: &TickObserverRef) {
        if self.set.lock().unregister(observer) {
            debug!("{}: unregistered {:?}", P::NAME, observer);
        }
    }

    /// Run every active observer once, then promote pending registrations.
    pub fn tick(&self, delta: f32) {
        {
            let mut set = self.set.lock();
            if set.is_iterating() {
                warn!("{}: nested tick ignored", P::NAME);
                return;
            }
            set.begin();
        }
        loop {
            let next = self.set.lock().advance();
            let Some(observer) = next else {
                break;
            };
            if catch_unwind(AssertUnwindSafe(|| observer.0.on_tick(delta))).is_err() {
                error!("{}: observer {:?} panicked", P::NAME, observer);
            }
        }
        self.set.lock().finish();
    }

    /// Number of observers that will run on the next tick.
    pub fn active_count(&self) -> usize {
        self.set.lock().active().len()
    }

    /// Number of observers waiting for the current tick to end.
    pub fn pending_count(&self) -> usize {
        self.set.lock().pending().len()
    }

    pub fn contains(&self, observer: &TickObserverRef) -> bool {
        self.set.lock().contains(observer)
    }
}
