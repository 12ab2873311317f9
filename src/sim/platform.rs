//! Cyclic platform: a rectangle of terrain that rides up and down
//!
//! The phase runs through four segments per cycle: hold low, rise, hold
//! high, fall. While the platform rises it lifts any ball resting on the old
//! surface by exactly the height delta; while it falls, bodies simply lose
//! support and drop under normal integration. The asymmetry is deliberate: a
//! lowering platform must never crush a ball it passes through.

use glam::Vec3;

use super::hooks::{GameHook, HookOutcome, HookRole};
use super::spatial::Aabb;
use super::world::WorldState;

#[derive(Debug, Clone)]
pub struct CyclicPlatform {
    on: bool,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    low: f32,
    high: f32,
    phase: f32,
    /// Time dilation: phase advances by `dt / speed`
    speed: f32,
    pub time_low: f32,
    pub time_rise: f32,
    pub time_high: f32,
    pub time_fall: f32,
}

impl CyclicPlatform {
    /// Rectangle corners are normalized; `offset` is the starting phase.
    pub fn new(
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        low: f32,
        high: f32,
        offset: f32,
        speed: f32,
    ) -> Self {
        Self {
            on: true,
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
            low,
            high,
            phase: offset,
            speed: if speed > 0.0 { speed } else { 1.0 },
            time_low: 2.0,
            time_rise: 3.0,
            time_high: 2.0,
            time_fall: 3.0,
        }
    }

    fn cycle_time(&self) -> f32 {
        self.time_low + self.time_rise + self.time_high + self.time_fall
    }

    /// Elevation for a given phase value
    fn elevation(&self, phase: f32) -> f32 {
        let t = phase.rem_euclid(self.cycle_time());
        if t < self.time_low {
            self.low
        } else if t < self.time_low + self.time_rise {
            self.low + (self.high - self.low) * (t - self.time_low) / self.time_rise
        } else if t < self.time_low + self.time_rise + self.time_high {
            self.high
        } else {
            self.high
                + (self.low - self.high) * (t - self.time_low - self.time_rise - self.time_high)
                    / self.time_fall
        }
    }
}

impl GameHook for CyclicPlatform {
    fn is_on(&self) -> bool {
        self.on
    }

    fn set_on(&mut self, on: bool) {
        // Disabling freezes the platform at its current elevation
        self.on = on;
    }

    fn role(&self) -> HookRole {
        HookRole::Terrain
    }

    fn tick(&mut self, dt: f32, world: &mut WorldState) -> HookOutcome {
        self.phase += dt / self.speed;

        let Some(map) = world.map.as_mut() else {
            return HookOutcome::Keep; // terrain not loaded yet
        };

        let old_height = map.cell(self.x1, self.y1).heights[0];
        let h = self.elevation(self.phase);
        map.set_region_heights(self.x1, self.y1, self.x2, self.y2, |_, _, heights| {
            *heights = [h; 5];
        });

        if h > old_height {
            // The surface moved up under whatever was resting on it; lift
            // those bodies so they ride the platform instead of clipping.
            let bounds = Aabb::new(
                Vec3::new(self.x1 as f32, self.y1 as f32, old_height - 1.0),
                Vec3::new(
                    (self.x2 + 1) as f32,
                    (self.y2 + 1) as f32,
                    old_height + 0.1,
                ),
            );
            for id in world.index.query_overlap(&bounds) {
                let Some(body) = world.bodies.get_mut(id) else {
                    continue;
                };
                if !body.is_on {
                    continue;
                }
                let inside = body.position.x >= self.x1 as f32
                    && body.position.x < (self.x2 + 1) as f32
                    && body.position.y >= self.y1 as f32
                    && body.position.y < (self.y2 + 1) as f32;
                let resting = body.position.z - body.radius <= old_height + 0.1;
                if inside && resting {
                    body.position.z += h - old_height;
                    let aabb = body.aabb();
                    world.index.update(id, aabb);
                }
            }
        }

        HookOutcome::Keep
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
