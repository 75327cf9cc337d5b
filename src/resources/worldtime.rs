//! Frame and fixed-step timing resources.
//!
//! [`WorldTime`] is updated once per frame by
//! [`update_world_time`](crate::systems::time::update_world_time).
//! [`FixedTime`] accumulates scaled frame time and hands out whole fixed steps
//! to the fixed-update observers.

use bevy_ecs::prelude::Resource;

#[derive(Resource, Clone, Copy, Debug)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub time_scale: f32,
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }
}

/// Fixed timestep accumulator.
#[derive(Resource, Clone, Copy, Debug)]
pub struct FixedTime {
    /// Seconds per fixed step.
    pub step: f32,
    /// Upper bound on steps run in one frame; the rest of the backlog is dropped.
    pub max_steps: u32,
    /// Scaled time not yet consumed by fixed steps.
    pub accumulator: f32,
}

impl FixedTime {
    /// # Panics
    ///
    /// Panics if `step` is not strictly positive.
    pub fn new(step: f32, max_steps: u32) -> Self {
        assert!(step > 0.0, "FixedTime: step must be positive, got {}", step);
        FixedTime {
            step,
            max_steps,
            accumulator: 0.0,
        }
    }

    /// Add `delta` seconds and return how many fixed steps are due.
    pub fn accumulate(&mut self, delta: f32) -> u32 {
        self.accumulator += delta;
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.step {
            // Spiral-of-death guard.
            self.accumulator %= self.step;
        }
        steps
    }
}

impl Default for FixedTime {
    fn default() -> Self {
        FixedTime::new(1.0 / 50.0, 5)
    }
}
