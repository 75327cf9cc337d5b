//! Frame clock.
//!
//! [`run_frame`](crate::runtime::run_frame) calls [`update_world_time`] before
//! the frame schedule so every phase of the frame reads the same clock.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Advance [`WorldTime`] by one frame of `dt` raw seconds.
///
/// `delta` becomes `dt` scaled by `time_scale`, `elapsed` grows by that
/// scaled amount and `frame_count` goes up by one.
pub fn update_world_time(world: &mut World, dt: f32) {
    let mut clock = world.resource_mut::<WorldTime>();
    let step = dt * clock.time_scale;
    clock.delta = step;
    clock.elapsed += step;
    clock.frame_count += 1;
}
