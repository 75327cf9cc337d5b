//! Object pool bookkeeping.
//!
//! [`ObjectPools`] keeps one [`PoolRecord`] per pool key. A record tracks the
//! pool's member entities split into `available` and `in_use`, plus the
//! holder entity that parents idle members. This module only maintains the
//! partitions; the operations that spawn, activate, and deactivate entities
//! live in [`crate::systems::objectpool`] because they need `&mut World`.
//!
//! # Invariants
//!
//! - `available` and `in_use` are disjoint and together equal `total`.
//! - An entity leaves `available` only by checkout and re-enters it only by
//!   a return of that same checkout, so no entity is ever handed out twice.

use std::any::{TypeId, type_name};

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, TryRecvError};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Failures reported by pool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("no pool registered for key '{0}'")]
    UnknownPool(String),
    #[error("entity {entity:?} is not checked out from pool '{key}'")]
    NotCheckedOut { key: String, entity: Entity },
    #[error("pool '{key}' holds {expected}, requested {requested}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        requested: &'static str,
    },
    #[error("factory produced no usable object for pool '{0}'")]
    CreationFailed(String),
}

/// Counts describing one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
}

/// State of a single pool.
#[derive(Debug, Clone)]
pub struct PoolRecord {
    holder: Entity,
    item_type: TypeId,
    item_type_name: &'static str,
    total: Vec<Entity>,
    available: Vec<Entity>,
    in_use: FxHashSet<Entity>,
}

impl PoolRecord {
    /// Create an empty record whose members are required to carry `T`.
    pub fn new<T: 'static>(holder: Entity) -> Self {
        PoolRecord {
            holder,
            item_type: TypeId::of::<T>(),
            item_type_name: type_name::<T>(),
            total: Vec::new(),
            available: Vec::new(),
            in_use: FxHashSet::default(),
        }
    }

    /// Entity parenting this pool's idle members.
    pub fn holder(&self) -> Entity {
        self.holder
    }

    /// Type name members were created for.
    pub fn item_type_name(&self) -> &'static str {
        self.item_type_name
    }

    pub fn total(&self) -> &[Entity] {
        &self.total
    }

    pub fn available(&self) -> &[Entity] {
        &self.available
    }

    pub fn is_in_use(&self, entity: Entity) -> bool {
        self.in_use.contains(&entity)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total: self.total.len(),
            available: self.available.len(),
            in_use: self.in_use.len(),
        }
    }

    fn check_type<T: 'static>(&self, key: &str) -> Result<(), PoolError> {
        if self.item_type == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(PoolError::TypeMismatch {
                key: key.to_string(),
                expected: self.item_type_name,
                requested: type_name::<T>(),
            })
        }
    }
}

/// All pools of one world, keyed by name.
#[derive(Resource, Debug, Default)]
pub struct ObjectPools {
    records: FxHashMap<String, PoolRecord>,
}

impl ObjectPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a pool exists for `key`.
    pub fn has_pool(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Registered pool keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn record(&self, key: &str) -> Option<&PoolRecord> {
        self.records.get(key)
    }

    /// Counts for `key`, if the pool exists.
    pub fn stats(&self, key: &str) -> Option<PoolStats> {
        self.records.get(key).map(PoolRecord::stats)
    }

    /// Create the record for `key`. Returns `false` if one already exists.
    pub fn insert_record(&mut self, key: impl Into<String>, record: PoolRecord) -> bool {
        let key = key.into();
        if self.records.contains_key(&key) {
            return false;
        }
        self.records.insert(key, record);
        true
    }

    /// Add freshly created members to `key` as available.
    pub fn add_members<T: 'static>(
        &mut self,
        key: &str,
        members: &[Entity],
    ) -> Result<(), PoolError> {
        let record = self
            .records
            .get_mut(key)
            .ok_or_else(|| PoolError::UnknownPool(key.to_string()))?;
        record.check_type::<T>(key)?;
        record.total.extend_from_slice(members);
        record.available.extend_from_slice(members);
        Ok(())
    }

    /// Move one member from `available` to `in_use`.
    ///
    /// `Ok(None)` means the pool exists but is exhausted.
    pub fn checkout<T: 'static>(&mut self, key: &str) -> Result<Option<Entity>, PoolError> {
        let record = self
            .records
            .get_mut(key)
            .ok_or_else(|| PoolError::UnknownPool(key.to_string()))?;
        record.check_type::<T>(key)?;
        let Some(entity) = record.available.pop() else {
            return Ok(None);
        };
        record.in_use.insert(entity);
        Ok(Some(entity))
    }

    /// Move `entity` from `in_use` back to `available`.
    ///
    /// Returns the pool holder so the caller can re-parent the entity.
    pub fn release(&mut self, key: &str, entity: Entity) -> Result<Entity, PoolError> {
        let record = self
            .records
            .get_mut(key)
            .ok_or_else(|| PoolError::UnknownPool(key.to_string()))?;
        if !record.in_use.remove(&entity) {
            return Err(PoolError::NotCheckedOut {
                key: key.to_string(),
                entity,
            });
        }
        record.available.push(entity);
        Ok(record.holder)
    }

    /// Forget a member that no longer exists in the world.
    pub fn purge(&mut self, key: &str, entity: Entity) {
        if let Some(record) = self.records.get_mut(key) {
            record.total.retain(|e| *e != entity);
            record.available.retain(|e| *e != entity);
            record.in_use.remove(&entity);
        }
    }
}

/// What a [`PoolTicket`] currently knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    /// The object is still being created.
    Pending,
    /// The object was checked out and activated.
    Ready(Entity),
    /// The pool does not exist, or creation failed.
    Failed,
}

/// Handle to an asynchronous checkout.
///
/// Resolved on the owning thread when the checkout completes; poll it from
/// any system after the main thread queue has been drained.
#[derive(Debug)]
pub struct PoolTicket {
    rx: Receiver<Option<Entity>>,
    resolved: Option<Option<Entity>>,
}

impl PoolTicket {
    pub(crate) fn new(rx: Receiver<Option<Entity>>) -> Self {
        PoolTicket { rx, resolved: None }
    }

    /// Check for completion without blocking.
    pub fn poll(&mut self) -> TicketState {
        if self.resolved.is_none() {
            match self.rx.try_recv() {
                Ok(result) => self.resolved = Some(result),
                Err(TryRecvError::Empty) => return TicketState::Pending,
                // The continuation was dropped without answering.
                Err(TryRecvError::Disconnected) => self.resolved = Some(None),
            }
        }
        match self.resolved {
            Some(Some(entity)) => TicketState::Ready(entity),
            _ => TicketState::Failed,
        }
    }

    /// The checked-out entity, once ready.
    pub fn entity(&mut self) -> Option<Entity> {
        match self.poll() {
            TicketState::Ready(entity) => Some(entity),
            _ => None,
        }
    }
}
