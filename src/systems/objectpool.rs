//! Object pool operations.
//!
//! These functions need exclusive world access: they spawn members, toggle
//! the [`Inactive`] marker, and re-parent entities. Call them from the owning
//! thread (exclusive systems, main thread actions, or setup code).
//!
//! # Flow
//!
//! 1. [`init_pool`] asks the factory worker for `count` objects. When they
//!    arrive (through the main thread queue) they are spawned inactive under
//!    the pool's holder entity and the pool record is created.
//! 2. [`get_from_pool`] hands out an idle member immediately. When the pool is
//!    exhausted it requests exactly one more object from the factory, adds it
//!    to the pool on arrival, and hands that one out.
//! 3. [`return_to_pool`] deactivates a member and makes it available again.
//!
//! Lookup and creation failures are logged and reported to the caller as
//! `None`; nothing is retried.

use bevy_ecs::hierarchy::ChildOf;
use bevy_ecs::prelude::*;
use crossbeam_channel::bounded;
use log::{debug, error, info, warn};

use crate::components::pooled::{Inactive, PoolHolder, PooledObject};
use crate::resources::objectpool::{ObjectPools, PoolError, PoolRecord, PoolTicket};
use crate::resources::poolfactory::{FactoryBridge, FactoryCmd, Prefab};
use crate::resources::poolmanifest::PoolManifest;

/// Request `count` objects for `key` and create the pool when they arrive.
///
/// Members must carry component `T`; use [`PooledObject`] to accept anything
/// the factory builds. If the factory yields nothing usable the failure is
/// logged and no pool exists for `key`. If a pool for `key` already exists
/// when the objects arrive, they are added to it.
///
/// # Panics
///
/// Panics if `count` is zero.
pub fn init_pool<T: Component>(world: &mut World, key: impl Into<String>, count: usize) {
    assert!(count > 0, "init_pool: count must be greater than zero");
    let key = key.into();
    debug!("init_pool: requesting {} x '{}'", count, key);

    let pool_key = key.clone();
    request_objects(world, key, count, move |world: &mut World, prefabs| {
        let members = spawn_members::<T>(world, &pool_key, prefabs);
        if members.is_empty() {
            error!("init_pool: {}", PoolError::CreationFailed(pool_key));
            return;
        }
        let added = members.len();
        match add_new_to_pool::<T>(world, &pool_key, members) {
            Ok(()) => info!("pool '{}' ready with {} object(s)", pool_key, added),
            Err(e) => error!("init_pool: {}", e),
        }
    });
}

/// Check out one member of `key`, activated under `parent`.
///
/// `on_ready` runs on the owning thread with the entity, or with `None` if the
/// pool does not exist, holds another type, or creation failed. It runs
/// immediately when an idle member is available, otherwise after the factory
/// delivers a new object.
pub fn get_from_pool<T: Component>(
    world: &mut World,
    key: &str,
    parent: Option<Entity>,
    on_ready: impl FnOnce(&mut World, Option<Entity>) + Send + 'static,
) {
    match checkout_live::<T>(world, key) {
        Ok(Some(entity)) => {
            activate(world, entity, parent);
            on_ready(world, Some(entity));
        }
        Ok(None) => {
            debug!("get_from_pool: '{}' exhausted, creating one more", key);
            let pool_key = key.to_string();
            request_objects(world, key.to_string(), 1, move |world: &mut World, prefabs| {
                let members = spawn_members::<T>(world, &pool_key, prefabs);
                if members.is_empty() {
                    error!("get_from_pool: {}", PoolError::CreationFailed(pool_key));
                    on_ready(world, None);
                    return;
                }
                if let Err(e) = add_new_to_pool::<T>(world, &pool_key, members) {
                    error!("get_from_pool: {}", e);
                    on_ready(world, None);
                    return;
                }
                match checkout_live::<T>(world, &pool_key) {
                    Ok(Some(entity)) => {
                        activate(world, entity, parent);
                        on_ready(world, Some(entity));
                    }
                    Ok(None) => {
                        error!("get_from_pool: '{}' empty right after growing", pool_key);
                        on_ready(world, None);
                    }
                    Err(e) => {
                        warn!("get_from_pool: {}", e);
                        on_ready(world, None);
                    }
                }
            });
        }
        Err(e) => {
            warn!("get_from_pool: {}", e);
            on_ready(world, None);
        }
    }
}

/// Ticket-returning variant of [`get_from_pool`].
pub fn get_from_pool_async<T: Component>(
    world: &mut World,
    key: &str,
    parent: Option<Entity>,
) -> PoolTicket {
    let (tx, rx) = bounded::<Option<Entity>>(1);
    get_from_pool::<T>(world, key, parent, move |_: &mut World, entity| {
        let _ = tx.send(entity);
    });
    PoolTicket::new(rx)
}

/// Deactivate `entity` and make it available in `key` again.
///
/// Fails without touching the entity if `key` is unknown or `entity` is not
/// currently checked out from it.
pub fn return_to_pool(world: &mut World, key: &str, entity: Entity) -> Result<(), PoolError> {
    let holder = match world.resource_mut::<ObjectPools>().release(key, entity) {
        Ok(holder) => holder,
        Err(e) => {
            warn!("return_to_pool: {}", e);
            return Err(e);
        }
    };
    match world.get_entity_mut(entity) {
        Ok(mut e) => {
            e.insert((Inactive, ChildOf(holder)));
        }
        Err(_) => {
            warn!("return_to_pool: {:?} no longer exists, dropping it from '{}'", entity, key);
            world.resource_mut::<ObjectPools>().purge(key, entity);
        }
    }
    Ok(())
}

/// Add already spawned `members` to `key`, creating the pool if needed.
///
/// Members are parented under the pool holder and left inactive. Entities
/// that were already despawned are skipped.
pub fn add_new_to_pool<T: Component>(
    world: &mut World,
    key: &str,
    members: Vec<Entity>,
) -> Result<(), PoolError> {
    let members: Vec<Entity> = members
        .into_iter()
        .filter(|&entity| {
            let alive = world.get_entity(entity).is_ok();
            if !alive {
                warn!("add_new_to_pool: {:?} no longer exists, skipping it for '{}'", entity, key);
            }
            alive
        })
        .collect();
    let existing = world
        .resource::<ObjectPools>()
        .record(key)
        .map(PoolRecord::holder);
    let holder = match existing {
        Some(holder) => holder,
        None => {
            let holder = world
                .spawn(PoolHolder {
                    key: key.to_string(),
                })
                .id();
            world
                .resource_mut::<ObjectPools>()
                .insert_record(key, PoolRecord::new::<T>(holder));
            holder
        }
    };

    if let Err(e) = world
        .resource_mut::<ObjectPools>()
        .add_members::<T>(key, &members)
    {
        for entity in members {
            world.despawn(entity);
        }
        return Err(e);
    }
    for entity in members {
        world.entity_mut(entity).insert((Inactive, ChildOf(holder)));
    }
    Ok(())
}

/// Issue [`init_pool`] for every entry of `manifest`.
pub fn prewarm_pools(world: &mut World, manifest: &PoolManifest) {
    for entry in &manifest.pools {
        if entry.count == 0 {
            warn!("prewarm_pools: skipping '{}' with count 0", entry.key);
            continue;
        }
        init_pool::<PooledObject>(world, entry.key.clone(), entry.count);
    }
}

/// Send a creation request to the factory worker.
///
/// Without a running factory the delivery runs at once with no prefabs.
fn request_objects(
    world: &mut World,
    key: String,
    count: usize,
    deliver: impl FnOnce(&mut World, Vec<Prefab>) + Send + 'static,
) {
    let Some(tx_cmd) = world
        .get_resource::<FactoryBridge>()
        .map(|bridge| bridge.tx_cmd.clone())
    else {
        error!("pool factory is not running; cannot create '{}'", key);
        deliver(world, Vec::new());
        return;
    };
    let cmd = FactoryCmd::Create {
        key,
        count,
        deliver: Box::new(deliver),
    };
    if let Err(err) = tx_cmd.send(cmd) {
        if let FactoryCmd::Create { key, deliver, .. } = err.0 {
            error!("pool factory worker is gone; cannot create '{}'", key);
            deliver(world, Vec::new());
        }
    }
}

/// Spawn inactive entities from `prefabs`, keeping only those carrying `T`.
fn spawn_members<T: Component>(world: &mut World, key: &str, prefabs: Vec<Prefab>) -> Vec<Entity> {
    let mut members = Vec::with_capacity(prefabs.len());
    for prefab in prefabs {
        let mut entity = world.spawn((
            PooledObject {
                key: key.to_string(),
            },
            Inactive,
        ));
        prefab(&mut entity);
        if entity.contains::<T>() {
            members.push(entity.id());
        } else {
            let err = PoolError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
                requested: "factory output",
            };
            warn!("pool: discarding created object: {}", err);
            entity.despawn();
        }
    }
    members
}

/// Check out a member, skipping any that were despawned while idle.
fn checkout_live<T: Component>(world: &mut World, key: &str) -> Result<Option<Entity>, PoolError> {
    loop {
        let Some(entity) = world.resource_mut::<ObjectPools>().checkout::<T>(key)? else {
            return Ok(None);
        };
        if world.get_entity(entity).is_ok() {
            return Ok(Some(entity));
        }
        warn!("pool '{}': member {:?} was despawned while idle", key, entity);
        world.resource_mut::<ObjectPools>().purge(key, entity);
    }
}

fn activate(world: &mut World, entity: Entity, parent: Option<Entity>) {
    let mut e = world.entity_mut(entity);
    e.remove::<Inactive>();
    match parent {
        Some(parent) => {
            e.insert(ChildOf(parent));
        }
        None => {
            e.remove::<ChildOf>();
        }
    }
}
