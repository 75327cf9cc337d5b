//! Automatic release of listeners owned by despawned entities.

use bevy_ecs::prelude::*;

use crate::components::listenerowner::ListenerOwner;
use crate::resources::listenerregistry::ListenerRegistry;

/// Release the subscriptions of every [`ListenerOwner`] that was despawned (or
/// lost the marker) since this system last ran.
pub fn release_despawned_listener_owners(
    mut removed: RemovedComponents<ListenerOwner>,
    registry: Res<ListenerRegistry>,
) {
    for owner in removed.read() {
        registry.remove_all_for_owner(owner);
    }
}
