//! Systems that drive the per-phase tick dispatchers.
//!
//! - [`tick_observers`] runs one pass of a variable-rate phase
//!   ([`Update`](crate::resources::tickobservers::Update) or
//!   [`LateUpdate`](crate::resources::tickobservers::LateUpdate)) with the
//!   frame delta.
//! - [`tick_fixed_observers`] runs as many
//!   [`FixedUpdate`](crate::resources::tickobservers::FixedUpdate) passes as
//!   the [`FixedTime`] accumulator says are due, each with the fixed step.

use bevy_ecs::prelude::*;

use crate::resources::tickobservers::{FixedUpdate, TickDispatcher, TickPhase};
use crate::resources::worldtime::{FixedTime, WorldTime};

/// Tick every observer of phase `P` once with the scaled frame delta.
pub fn tick_observers<P: TickPhase>(dispatcher: Res<TickDispatcher<P>>, time: Res<WorldTime>) {
    dispatcher.tick(time.delta);
}

/// Tick fixed-update observers once per due fixed step.
pub fn tick_fixed_observers(
    dispatcher: Res<TickDispatcher<FixedUpdate>>,
    time: Res<WorldTime>,
    mut fixed: ResMut<FixedTime>,
) {
    let steps = fixed.accumulate(time.delta);
    let step = fixed.step;
    for _ in 0..steps {
        dispatcher.tick(step);
    }
}
