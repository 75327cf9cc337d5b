//! Marker for entities that own event bus subscriptions.
//!
//! Subscriptions registered through
//! [`ListenerRegistry`](crate::resources::listenerregistry::ListenerRegistry)
//! with an owner tagged [`ListenerOwner`] are released automatically when the
//! entity is despawned or the marker is removed.

use bevy_ecs::prelude::Component;

/// Tag component: release this entity's listeners when it goes away.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct ListenerOwner;
