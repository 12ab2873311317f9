//! Color cycler: pulses one color channel of one cell
//!
//! Purely cosmetic terrain animation. The cycle is driven off the world
//! clock so it stays in phase after save/restore, and every change goes
//! through the cells-updated notification like any other cell mutation.

use std::f32::consts::TAU;

use super::hooks::{GameHook, HookOutcome, HookRole};
use super::world::WorldState;

#[derive(Debug, Clone)]
pub struct ColorCycler {
    on: bool,
    x: i32,
    y: i32,
    /// Index into the cell's RGBA color
    channel: usize,
    min: f32,
    max: f32,
    /// Cycles per second
    frequency: f32,
    phase: f32,
}

impl ColorCycler {
    pub fn new(x: i32, y: i32, channel: usize, min: f32, max: f32, frequency: f32, phase: f32) -> Self {
        Self {
            on: true,
            x,
            y,
            channel: channel.min(3),
            min: min.min(max),
            max: min.max(max),
            frequency,
            phase,
        }
    }
}

impl GameHook for ColorCycler {
    fn is_on(&self) -> bool {
        self.on
    }

    fn set_on(&mut self, on: bool) {
        self.on = on;
    }

    fn role(&self) -> HookRole {
        HookRole::Terrain
    }

    fn tick(&mut self, _dt: f32, world: &mut WorldState) -> HookOutcome {
        let time = world.time as f32;
        let Some(map) = world.map.as_mut() else {
            return HookOutcome::Keep;
        };
        let wave = 0.5 + 0.5 * (TAU * (self.frequency * time + self.phase)).sin();
        let value = self.min + (self.max - self.min) * wave;
        map.cell_mut(self.x, self.y).colors[self.channel] = value;
        map.mark_cells_updated(self.x, self.y, self.x, self.y, false);
        HookOutcome::Keep
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
