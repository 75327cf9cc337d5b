//! Queue of deferred actions executed on the thread that owns the `World`.
//!
//! Background threads cannot touch the ECS world. Instead they send a
//! [`MainThreadAction`] through a [`MainThreadSender`]; the owning thread runs
//! every queued action once per tick via
//! [`drain_main_thread_queue`](crate::systems::mainthread::drain_main_thread_queue).
//! Because an action receives `&mut World`, its type alone guarantees it can
//! only run where the world lives.
//!
//! The queue is an unbounded crossbeam channel: enqueueing never blocks and
//! preserves per-sender FIFO order.

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::warn;

/// Work item that must run with exclusive world access.
pub type MainThreadAction = Box<dyn FnOnce(&mut World) + Send + 'static>;

/// Cloneable producer handle, usable from any thread.
#[derive(Clone)]
pub struct MainThreadSender {
    tx: Sender<MainThreadAction>,
}

impl MainThreadSender {
    /// Queue `action` for the next drain. Returns immediately.
    pub fn enqueue(&self, action: impl FnOnce(&mut World) + Send + 'static) {
        if self.tx.send(Box::new(action)).is_err() {
            warn!("main thread queue: dropped action, queue no longer exists");
        }
    }
}

/// Resource owning both ends of the main thread queue.
#[derive(Resource)]
pub struct MainThreadQueue {
    tx: Sender<MainThreadAction>,
    rx: Receiver<MainThreadAction>,
}

impl Default for MainThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MainThreadQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = unbounded::<MainThreadAction>();
        MainThreadQueue { tx, rx }
    }

    /// A producer handle for other threads.
    pub fn sender(&self) -> MainThreadSender {
        MainThreadSender {
            tx: self.tx.clone(),
        }
    }

    /// Queue `action` from the owning thread itself.
    pub fn enqueue(&self, action: impl FnOnce(&mut World) + Send + 'static) {
        // Both ends live in self, so the channel cannot be disconnected here.
        let _ = self.tx.send(Box::new(action));
    }

    /// Number of actions waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Receiver clone used by the drain system so the world can be borrowed
    /// mutably while actions run.
    pub(crate) fn receiver(&self) -> Receiver<MainThreadAction> {
        self.rx.clone()
    }
}
