//! Components attached to pooled entities and their holders.
//!
//! Every entity created for an object pool carries [`PooledObject`]. While it
//! sits unused in the pool it also carries [`Inactive`] and is parented under
//! the pool's [`PoolHolder`] entity. Checking it out removes [`Inactive`] and
//! moves it under the caller's parent.

use bevy_ecs::prelude::Component;

/// Marks an entity as owned by the object pool registered under `key`.
#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct PooledObject {
    pub key: String,
}

/// Present while a pooled entity is waiting in its pool.
///
/// Systems that simulate or render gameplay objects should filter with
/// `Without<Inactive>`.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Inactive;

/// Grouping entity that parents the idle members of one pool.
#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct PoolHolder {
    pub key: String,
}
