//! ECS components for runtime-managed entities.
//!
//! Submodules overview:
//! - [`listenerowner`] – marker for entities whose bus subscriptions are released on despawn
//! - [`pooled`] – pool membership, idle marker, and per-pool holder entity

pub mod listenerowner;
pub mod pooled;
