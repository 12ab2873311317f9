//! Deterministic simulation core
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable tick order (hooks in registration order, then body integration)
//! - No rendering or platform dependencies

pub mod body;
pub mod color_cycle;
pub mod hooks;
pub mod hostile;
pub mod map;
pub mod platform;
pub mod sign;
pub mod spatial;
pub mod world;

pub use body::{Bodies, Body, BodyId, BodyKind, DeathCause, Mod, StepOutcome};
pub use color_cycle::ColorCycler;
pub use hooks::{GameHook, HookId, HookOutcome, HookRole};
pub use hostile::HostileBall;
pub use map::{Cell, Map, MapDefect, Region, cell_flags};
pub use platform::CyclicPlatform;
pub use sign::{BonusKind, ScoreSign};
pub use spatial::{Aabb, SpatialIndex};
pub use world::{Player, SoundEvent, World, WorldState};
