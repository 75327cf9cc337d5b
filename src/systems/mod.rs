//! Runtime systems.
//!
//! This module groups the systems and world-level operations that advance
//! the runtime each frame.
//!
//! Submodules overview
//! - [`listeners`] – release subscriptions of despawned listener owners
//! - [`mainthread`] – drain the main thread queue
//! - [`objectpool`] – create, check out, and return pooled entities
//! - [`poolfactory`] – background worker that builds pool members
//! - [`tickobservers`] – run per-phase tick observers
//! - [`time`] – update simulation time and delta

pub mod listeners;
pub mod mainthread;
pub mod objectpool;
pub mod poolfactory;
pub mod tickobservers;
pub mod time;
