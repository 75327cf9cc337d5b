//! Object factory collaborator and the bridge to its worker thread.
//!
//! Creating pooled objects can be expensive (asset decoding, procedural
//! generation), so it happens on a dedicated worker thread. The worker calls a
//! [`PoolFactory`] and hands the resulting [`Prefab`]s back to the owning
//! thread through the [`MainThreadQueue`], where they are spawned as entities.
//!
//! Use [`setup_pool_factory`] once during initialization and
//! [`shutdown_pool_factory`] during teardown.

use std::sync::Arc;
use std::thread::JoinHandle;

use bevy_ecs::prelude::*;
use bevy_ecs::world::EntityWorldMut;
use crossbeam_channel::{Sender, unbounded};
use log::info;

use crate::resources::mainthread::MainThreadQueue;
use crate::systems::poolfactory::factory_worker;

/// Deferred set of components applied to a freshly spawned pool member.
///
/// Prefabs are built off-thread and applied on the owning thread.
pub type Prefab = Box<dyn FnOnce(&mut EntityWorldMut<'_>) + Send + 'static>;

/// Build a [`Prefab`] that inserts `bundle`.
pub fn prefab<B: Bundle>(bundle: B) -> Prefab {
    Box::new(move |entity: &mut EntityWorldMut<'_>| {
        entity.insert(bundle);
    })
}

/// Source of new pool members.
///
/// Implementations run on the factory worker thread. Returning `None` (or
/// fewer prefabs than requested) signals a creation failure; the pool logs it
/// and never retries on its own.
pub trait PoolFactory: Send + Sync + 'static {
    /// Create one object for `key`.
    fn create(&self, key: &str) -> Option<Prefab>;

    /// Create up to `count` objects for `key`. Best effort.
    fn create_many(&self, key: &str, count: usize) -> Vec<Prefab> {
        (0..count).filter_map(|_| self.create(key)).collect()
    }
}

impl<F> PoolFactory for F
where
    F: Fn(&str) -> Option<Prefab> + Send + Sync + 'static,
{
    fn create(&self, key: &str) -> Option<Prefab> {
        self(key)
    }
}

/// Continuation run on the owning thread with the created prefabs.
pub type FactoryDelivery = Box<dyn FnOnce(&mut World, Vec<Prefab>) + Send + 'static>;

/// Commands understood by the factory worker.
pub enum FactoryCmd {
    Create {
        key: String,
        count: usize,
        deliver: FactoryDelivery,
    },
    Shutdown,
}

/// Bridge between the world and the factory worker thread.
#[derive(Resource)]
pub struct FactoryBridge {
    /// Sender for [`FactoryCmd`] messages (world -> worker).
    pub tx_cmd: Sender<FactoryCmd>,
    /// Join handle for the worker thread.
    pub handle: JoinHandle<()>,
}

/// Spawn the factory worker and insert the [`FactoryBridge`] resource.
///
/// Inserts a [`MainThreadQueue`] first if the world does not have one yet.
pub fn setup_pool_factory(world: &mut World, factory: impl PoolFactory) {
    world.init_resource::<MainThreadQueue>();
    let main = world.resource::<MainThreadQueue>().sender();
    let (tx_cmd, rx_cmd) = unbounded::<FactoryCmd>();
    let factory: Arc<dyn PoolFactory> = Arc::new(factory);

    let handle = std::thread::spawn(move || factory_worker(factory, rx_cmd, main));

    info!("pool factory worker started");
    world.insert_resource(FactoryBridge { tx_cmd, handle });
}

/// Ask the factory worker to stop and join it.
///
/// Requests already queued ahead of the shutdown are still processed; their
/// results land in the main thread queue.
pub fn shutdown_pool_factory(world: &mut World) {
    if let Some(bridge) = world.remove_resource::<FactoryBridge>() {
        let _ = bridge.tx_cmd.send(FactoryCmd::Shutdown);
        let _ = bridge.handle.join();
        info!("pool factory worker stopped");
    }
}
