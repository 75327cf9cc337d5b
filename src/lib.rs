//! gamewire library.
//!
//! Coordination layer for a game runtime: a typed event bus with per-owner
//! listener tracking, a main thread action queue, keyed object pools filled
//! by a background factory, and per-phase tick observers. Everything lives as
//! components and resources of a `bevy_ecs` [`World`](bevy_ecs::world::World).

pub mod components;
pub mod events;
pub mod resources;
pub mod runtime;
pub mod systems;
