//! ECS resources made available to systems.
//!
//! This module groups the long-lived state injected into the ECS world by
//! [`crate::runtime::setup_runtime`]. Each submodule documents the semantics
//! and intended usage of its resource(s).
//!
//! Overview
//! - `eventbus` – thread-safe publish/subscribe keyed by [`crate::events::gameevent::GameEvent`]
//! - `listenerregistry` – per-owner bookkeeping of bus subscriptions
//! - `mainthread` – queue of actions that must run on the world's thread
//! - `objectpool` – keyed pools of reusable entities and async checkout tickets
//! - `poolfactory` – bridge and channels for the background factory thread
//! - `poolmanifest` – JSON list of pools to prewarm at startup
//! - `runtimeconfig` – tick and pool settings loaded from INI
//! - `tickobservers` – per-phase observer dispatchers
//! - `worldtime` – simulation time, delta, and fixed-step accumulator
pub mod eventbus;
pub mod listenerregistry;
pub mod mainthread;
pub mod objectpool;
pub mod poolfactory;
pub mod poolmanifest;
pub mod runtimeconfig;
pub mod tickobservers;
pub mod worldtime;
