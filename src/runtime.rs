//! Runtime setup, per-frame schedule, and teardown.
//!
//! Everything the coordination layer needs lives as resources of one
//! [`World`]; there is no global state. A host typically does:
//!
//! ```ignore
//! let mut world = World::new();
//! setup_runtime(&mut world, RuntimeConfig::new(), my_factory);
//! let mut frame = build_frame_schedule();
//! loop {
//!     run_frame(&mut world, &mut frame, dt);
//! }
//! shutdown_runtime(&mut world);
//! ```
//!
//! # Frame order
//!
//! 1. Drain the main thread queue (factory deliveries, cross-thread actions)
//! 2. Fixed-update observers (zero or more steps)
//! 3. Update observers
//! 4. Late-update observers
//! 5. Release listeners of despawned owners
//!
//! The schedule uses the single-threaded executor so every step runs on the
//! thread that calls [`run_frame`].

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use log::{error, info};

use crate::resources::eventbus::EventBus;
use crate::resources::listenerregistry::ListenerRegistry;
use crate::resources::mainthread::MainThreadQueue;
use crate::resources::objectpool::ObjectPools;
use crate::resources::poolfactory::{PoolFactory, setup_pool_factory, shutdown_pool_factory};
use crate::resources::poolmanifest::PoolManifest;
use crate::resources::runtimeconfig::RuntimeConfig;
use crate::resources::tickobservers::{FixedUpdate, LateUpdate, TickDispatcher, Update};
use crate::resources::worldtime::{FixedTime, WorldTime};
use crate::systems::listeners::release_despawned_listener_owners;
use crate::systems::mainthread::main_thread_queue_system;
use crate::systems::objectpool::prewarm_pools;
use crate::systems::tickobservers::{tick_fixed_observers, tick_observers};
use crate::systems::time::update_world_time;

/// Insert every runtime resource and start the pool factory worker.
///
/// If the config names a pool manifest it is loaded and its pools are
/// requested; a manifest that cannot be loaded is logged and skipped.
pub fn setup_runtime(world: &mut World, config: RuntimeConfig, factory: impl PoolFactory) {
    world.insert_resource(WorldTime::default());
    world.insert_resource(FixedTime::new(config.fixed_delta, config.max_fixed_steps));
    world.insert_resource(MainThreadQueue::new());
    world.insert_resource(EventBus::new());
    world.init_resource::<ListenerRegistry>();
    world.insert_resource(ObjectPools::new());
    world.insert_resource(TickDispatcher::<Update>::new());
    world.insert_resource(TickDispatcher::<FixedUpdate>::new());
    world.insert_resource(TickDispatcher::<LateUpdate>::new());

    setup_pool_factory(world, factory);

    if let Some(path) = config.pool_manifest.clone() {
        match PoolManifest::load(&path) {
            Ok(manifest) => {
                prewarm_pools(world, &manifest);
                world.insert_resource(manifest);
            }
            Err(e) => error!("{}", e),
        }
    }

    world.insert_resource(config);
    info!("runtime ready");
}

/// Build the per-frame schedule described in the module docs.
pub fn build_frame_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            main_thread_queue_system,
            tick_fixed_observers,
            tick_observers::<Update>,
            tick_observers::<LateUpdate>,
            release_despawned_listener_owners,
        )
            .chain(),
    );
    schedule
}

/// Advance time by `dt` seconds and run one frame.
pub fn run_frame(world: &mut World, schedule: &mut Schedule, dt: f32) {
    update_world_time(world, dt);
    schedule.run(world);
    world.clear_trackers();
}

/// Stop the factory worker and drop every tracked subscription.
///
/// The main thread queue is removed, so factory results and actions still in
/// flight are discarded without running.
pub fn shutdown_runtime(world: &mut World) {
    shutdown_pool_factory(world);
    if let Some(queue) = world.remove_resource::<MainThreadQueue>() {
        let pending = queue.pending();
        if pending > 0 {
            info!("discarding {} pending main thread action(s)", pending);
        }
    }
    if let Some(registry) = world.get_resource::<ListenerRegistry>() {
        registry.remove_all();
    }
    if let Some(bus) = world.get_resource::<EventBus>() {
        bus.clear();
    }
    info!("runtime shut down");
}
