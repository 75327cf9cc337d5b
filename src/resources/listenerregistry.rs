//! Owner-scoped bookkeeping for event bus subscriptions.
//!
//! The [`ListenerRegistry`] subscribes listeners on the [`EventBus`] on behalf
//! of an owning entity and remembers which `(event, listener)` pairs each owner
//! registered. When the owner goes away, [`ListenerRegistry::remove_all_for_owner`]
//! unsubscribes everything it left behind, so no callback keeps referring to
//! state that no longer exists.
//!
//! The registry is only an index. It never changes dispatch order or payloads;
//! the bus alone decides what runs and when.
//!
//! Entities tagged with
//! [`ListenerOwner`](crate::components::listenerowner::ListenerOwner) are cleaned
//! up automatically by
//! [`release_despawned_listener_owners`](crate::systems::listeners::release_despawned_listener_owners).

use std::sync::Arc;

use bevy_ecs::prelude::*;
use log::debug;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::events::gameevent::GameEvent;
use crate::resources::eventbus::{EventBus, Listener};

/// One subscription made on behalf of an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEntry {
    pub event: GameEvent,
    pub listener: Listener,
}

type OwnerEntries = SmallVec<[ListenerEntry; 4]>;

/// Owner → subscriptions index wrapped around an [`EventBus`].
#[derive(Resource, Clone)]
pub struct ListenerRegistry {
    bus: EventBus,
    owners: Arc<Mutex<FxHashMap<Entity, OwnerEntries>>>,
}

impl FromWorld for ListenerRegistry {
    fn from_world(world: &mut World) -> Self {
        world.init_resource::<EventBus>();
        ListenerRegistry::new(world.resource::<EventBus>().clone())
    }
}

impl ListenerRegistry {
    /// Create a registry that subscribes on `bus`.
    pub fn new(bus: EventBus) -> Self {
        ListenerRegistry {
            bus,
            owners: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// The bus this registry subscribes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Subscribe `listener` to `event` and record it under `owner`.
    pub fn add_listener(&self, owner: Entity, event: GameEvent, listener: Listener) {
        {
            // Record and queue under one lock so a concurrent owner cleanup
            // either sees both or neither.
            let mut owners = self.owners.lock();
            self.bus.queue_add(event, listener.clone());
            owners
                .entry(owner)
                .or_default()
                .push(ListenerEntry { event, listener });
        }
        self.bus.flush();
    }

    /// Unsubscribe one `(event, listener)` pair and forget it for `owner`.
    ///
    /// The owner's record is dropped once it holds no entries.
    pub fn remove_listener(&self, owner: Entity, event: GameEvent, listener: Listener) {
        {
            let mut owners = self.owners.lock();
            if let Some(entries) = owners.get_mut(&owner) {
                if let Some(pos) = entries
                    .iter()
                    .position(|e| e.event == event && e.listener == listener)
                {
                    entries.remove(pos);
                }
                if entries.is_empty() {
                    owners.remove(&owner);
                }
            }
            self.bus.queue_remove(event, listener);
        }
        self.bus.flush();
    }

    /// Unsubscribe everything `owner` registered and drop its record.
    pub fn remove_all_for_owner(&self, owner: Entity) {
        {
            let mut owners = self.owners.lock();
            let Some(entries) = owners.remove(&owner) else {
                return;
            };
            debug!(
                "listener registry: releasing {} listener(s) of {:?}",
                entries.len(),
                owner
            );
            for entry in entries {
                self.bus.queue_remove(entry.event, entry.listener);
            }
        }
        self.bus.flush();
    }

    /// Unsubscribe every tracked entry of every owner.
    pub fn remove_all(&self) {
        {
            let mut owners = self.owners.lock();
            for (_, entries) in owners.drain() {
                for entry in entries {
                    self.bus.queue_remove(entry.event, entry.listener);
                }
            }
        }
        self.bus.flush();
    }

    /// Number of owners with at least one tracked entry.
    pub fn owner_count(&self) -> usize {
        self.owners.lock().len()
    }

    /// Number of entries tracked for `owner`.
    pub fn listener_count_for(&self, owner: Entity) -> usize {
        self.owners.lock().get(&owner).map_or(0, |e| e.len())
    }
}
