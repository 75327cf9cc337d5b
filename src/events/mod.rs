//! Event identifiers carried by the event bus.
//!
//! Submodules:
//! - [`gameevent`] – the closed set of game events and their optional payload
pub mod gameevent;
