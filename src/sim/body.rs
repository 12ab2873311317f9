//! Ball-family bodies: physics state, the integration step, and the arena
//!
//! Everything that rolls is a [`Body`]: the player marble, hostile balls,
//! and the debris shed on death. Bodies live in a generation-checked arena so
//! a stale [`BodyId`] held across a death fails lookups instead of dangling.

use glam::{Vec2, Vec3};

use crate::consts::*;
use super::map::{Map, cell_flags};
use super::spatial::Aabb;

/// Generation-checked handle into the body arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId {
    index: u32,
    generation: u32,
}

impl BodyId {
    pub(crate) fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// What kind of ball this is. Debris never sheds further debris.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Marble,
    Hostile,
    Debris,
}

/// Temporary status effects. A modifier is active while its countdown timer
/// is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mod {
    /// Doubled drive acceleration and top speed
    Speed,
    /// Dampened gravity, lets a ball drift over chasms
    Float,
    /// Drive input is ignored
    Frozen,
    /// Half effective radius
    Small,
    /// Half-again effective radius
    Large,
    /// Fragile: crash tolerance halved
    Glass,
}

impl Mod {
    pub const COUNT: usize = 6;

    pub const ALL: [Mod; Mod::COUNT] = [
        Mod::Speed,
        Mod::Float,
        Mod::Frozen,
        Mod::Small,
        Mod::Large,
        Mod::Glass,
    ];
}

/// Why a body died. Picks the death presentation (effect sound, debris
/// pattern); cleanup is identical for all causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// Impact above crash tolerance
    Crash,
    /// Footprint entered an acid cell
    Acid,
    /// Footprint entered a kill cell
    Kill,
    /// Debris lifetime ran out
    Expired,
}

/// Result of one integration step, consumed by the hazard phase
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutcome {
    /// Vertical impact speed this tick (0 when airborne or rolling)
    pub impact_speed: f32,
    /// Whether the body ended the tick supported by terrain
    pub grounded: bool,
}

/// A moving sphere simulated against the terrain
#[derive(Debug, Clone)]
pub struct Body {
    pub kind: BodyKind,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Effective collision radius, recomputed from size modifiers each tick
    pub radius: f32,
    /// Radius with no size modifiers active
    pub real_radius: f32,
    /// Restitution coefficient on vertical impact
    pub bounce_factor: f32,
    /// Impact speed above which the body dies with a crash
    pub crash_tolerance: f32,
    /// Remaining duration per modifier kind, indexed by [`Mod`]
    pub mod_time_left: [f32; Mod::COUNT],
    /// Inside a scripted transport segment; AI edge avoidance stands down
    pub in_pipe: bool,
    /// Disabled bodies keep existing but do not tick
    pub is_on: bool,
    /// Horizontal drive set by the behavior phase, consumed on integration
    pub drive: Vec2,
    /// Remaining lifetime for debris bodies
    pub ttl: Option<f32>,
    /// Credited to the player when this body dies
    pub score_on_death: i32,
    pub time_on_death: i32,
}

impl Body {
    pub fn new(kind: BodyKind, position: Vec3, radius: f32) -> Self {
        Self {
            kind,
            position,
            velocity: Vec3::ZERO,
            radius,
            real_radius: radius,
            bounce_factor: 0.8,
            crash_tolerance: 7.0,
            mod_time_left: [0.0; Mod::COUNT],
            in_pipe: false,
            is_on: true,
            drive: Vec2::ZERO,
            ttl: None,
            score_on_death: 0,
            time_on_death: 0,
        }
    }

    /// Debris fragment with a bounded lifetime
    pub fn debris(position: Vec3, velocity: Vec3, lifetime: f32) -> Self {
        let mut body = Body::new(BodyKind::Debris, position, DEBRIS_RADIUS);
        body.velocity = velocity;
        body.bounce_factor = 0.4;
        body.crash_tolerance = f32::INFINITY;
        body.ttl = Some(lifetime);
        body
    }

    pub fn mod_active(&self, m: Mod) -> bool {
        self.mod_time_left[m as usize] > 0.0
    }

    /// Grant or extend a modifier
    pub fn apply_mod(&mut self, m: Mod, seconds: f32) {
        let t = &mut self.mod_time_left[m as usize];
        *t = t.max(seconds);
    }

    /// Crash tolerance with the glass modifier applied
    pub fn effective_crash_tolerance(&self) -> f32 {
        if self.mod_active(Mod::Glass) {
            self.crash_tolerance * GLASS_FRAGILITY
        } else {
            self.crash_tolerance
        }
    }

    /// Grid cell currently under the body's center
    pub fn footprint(&self) -> (i32, i32) {
        (
            self.position.x.floor() as i32,
            self.position.y.floor() as i32,
        )
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::around(self.position, self.radius)
    }

    /// Advance position and velocity against the terrain for one tick.
    ///
    /// Order within the step: drive, gravity, surface effects (conveyor,
    /// friction, water drag), position integration, boundary clamp, then
    /// vertical collision against the interpolated terrain height.
    pub fn integrate(&mut self, map: &Map, dt: f32) -> StepOutcome {
        self.radius = self.real_radius
            * if self.mod_active(Mod::Small) {
                SMALL_RADIUS_SCALE
            } else if self.mod_active(Mod::Large) {
                LARGE_RADIUS_SCALE
            } else {
                1.0
            };

        // Drive phase: horizontal acceleration from the behavior phase
        if !self.mod_active(Mod::Frozen) {
            let boost = if self.mod_active(Mod::Speed) {
                SPEED_MOD_SCALE
            } else {
                1.0
            };
            self.velocity.x += self.drive.x * DRIVE_ACCELERATION * boost * dt;
            self.velocity.y += self.drive.y * DRIVE_ACCELERATION * boost * dt;
            let horizontal = Vec2::new(self.velocity.x, self.velocity.y);
            let cap = MAX_HORIZONTAL_SPEED * boost;
            if horizontal.length() > cap {
                let capped = horizontal.normalize() * cap;
                self.velocity.x = capped.x;
                self.velocity.y = capped.y;
            }
        }

        // Gravity, dampened while floating
        let gravity = if self.mod_active(Mod::Float) {
            GRAVITY * FLOAT_GRAVITY_SCALE
        } else {
            GRAVITY
        };
        self.velocity.z -= gravity * dt;

        // Surface effects while supported
        let support = map.height_at(self.position.x, self.position.y);
        if self.position.z - self.radius <= support + GROUND_EPSILON {
            let (ix, iy) = self.footprint();
            let cell = map.cell(ix, iy);

            // Conveyor cells push resting bodies
            self.velocity.x += cell.velocity.x * dt;
            self.velocity.y += cell.velocity.y * dt;

            let friction = if cell.flags & cell_flags::ICE != 0 {
                0.0
            } else if cell.flags & cell_flags::SAND != 0 {
                SAND_DRAG
            } else {
                GROUND_FRICTION
            };
            let decay = (1.0 - friction * dt).max(0.0);
            self.velocity.x *= decay;
            self.velocity.y *= decay;
        }

        // Water drag applies to the whole velocity while submerged
        if let Some(water) = map.water_at(self.position.x, self.position.y)
            && self.position.z - self.radius < water
        {
            self.velocity *= (1.0 - WATER_DRAG * dt).max(0.0);
        }

        self.position += self.velocity * dt;

        // The map boundary is impassable
        let max_x = map.width() as f32;
        let max_y = map.height() as f32;
        if self.position.x < 0.0 || self.position.x > max_x {
            self.position.x = self.position.x.clamp(0.0, max_x);
            self.velocity.x = 0.0;
        }
        if self.position.y < 0.0 || self.position.y > max_y {
            self.position.y = self.position.y.clamp(0.0, max_y);
            self.velocity.y = 0.0;
        }

        // Vertical collision against the (possibly just-mutated) terrain
        let ground = map.height_at(self.position.x, self.position.y);
        let mut impact = 0.0;
        if self.position.z - self.radius < ground {
            impact = (-self.velocity.z).max(0.0);
            self.position.z = ground + self.radius;

            let (ix, iy) = self.footprint();
            let restitution = if map.cell(ix, iy).flags & cell_flags::TRAMPOLINE != 0 {
                self.bounce_factor * TRAMPOLINE_BOOST
            } else {
                self.bounce_factor
            };
            if impact > BOUNCE_THRESHOLD {
                self.velocity.z = impact * restitution;
            } else {
                self.velocity.z = 0.0;
            }
        }

        // Drive is recomputed by the behavior phase every tick
        self.drive = Vec2::ZERO;

        StepOutcome {
            impact_speed: impact,
            grounded: self.position.z - self.radius <= ground + GROUND_EPSILON,
        }
    }

    /// Status-effect phase: count every timer down, floored at zero
    pub fn tick_modifiers(&mut self, dt: f32) {
        for t in &mut self.mod_time_left {
            *t = (*t - dt).max(0.0);
        }
        if let Some(ttl) = &mut self.ttl {
            *ttl = (*ttl - dt).max(0.0);
        }
    }

    /// Whether a debris lifetime has run out
    pub fn expired(&self) -> bool {
        self.ttl.is_some_and(|t| t <= 0.0)
    }
}

struct BodySlot {
    generation: u32,
    body: Option<Body>,
}

/// Arena of live bodies. The world owns all bodies exclusively; ids handed
/// out to hooks or queries are non-owning views checked on every access.
#[derive(Default)]
pub struct Bodies {
    slots: Vec<BodySlot>,
    free: Vec<u32>,
}

impl Bodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: Body) -> BodyId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            BodyId::from_raw(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(BodySlot {
                generation: 0,
                body: Some(body),
            });
            BodyId::from_raw(index, 0)
        }
    }

    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.body.is_none() {
            return None;
        }
        let body = slot.body.take();
        slot.generation += 1;
        self.free.push(id.index);
        body
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.body.as_ref()
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.body.as_mut()
    }

    pub fn is_alive(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    /// Snapshot of live ids, in slot order. Bodies spawned after the snapshot
    /// are not included, which is what keeps newly shed debris from
    /// integrating in the frame it was created.
    pub fn ids(&self) -> Vec<BodyId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.body.is_some())
            .map(|(i, s)| BodyId::from_raw(i as u32, s.generation))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.body
                .as_ref()
                .map(|b| (BodyId::from_raw(i as u32, s.generation), b))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.body.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
