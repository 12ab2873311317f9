//! Trackroll - a 3D marble-rolling game core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (heightfield terrain, ball physics,
//!   the per-frame hook scheduler, dynamic terrain features)
//! - `level`: Level file loading and validation
//!
//! Rendering, audio playback, and profile persistence are external
//! collaborators: the core exposes cell and body state for a renderer,
//! raises named effect events for a sound system, and reads/writes a single
//! primary player's session state.

pub mod level;
pub mod sim;

pub use sim::{World, WorldState};

/// Game configuration constants. World units: one terrain cell is 1x1.
pub mod consts {
    /// Fixed simulation timestep (100 Hz)
    pub const SIM_DT: f32 = 1.0 / 100.0;

    /// Downward acceleration, world units per second squared
    pub const GRAVITY: f32 = 8.0;
    /// Gravity multiplier while the float modifier is active
    pub const FLOAT_GRAVITY_SCALE: f32 = 0.2;

    /// Horizontal acceleration per unit of drive
    pub const DRIVE_ACCELERATION: f32 = 4.0;
    /// Horizontal speed cap for driven balls
    pub const MAX_HORIZONTAL_SPEED: f32 = 8.0;
    /// Drive and speed-cap multiplier for the speed modifier
    pub const SPEED_MOD_SCALE: f32 = 2.0;

    /// Rolling friction on ordinary ground (velocity decay per second)
    pub const GROUND_FRICTION: f32 = 2.0;
    /// Friction on sand cells
    pub const SAND_DRAG: f32 = 6.0;
    /// Velocity decay per second while submerged
    pub const WATER_DRAG: f32 = 1.5;
    /// Vertical impact speed below which a ball comes to rest
    pub const BOUNCE_THRESHOLD: f32 = 0.5;
    /// Restitution multiplier on trampoline cells
    pub const TRAMPOLINE_BOOST: f32 = 1.6;
    /// Slack when deciding whether a ball is supported by terrain
    pub const GROUND_EPSILON: f32 = 0.05;

    /// Effective radius scale for the small/large modifiers
    pub const SMALL_RADIUS_SCALE: f32 = 0.5;
    pub const LARGE_RADIUS_SCALE: f32 = 1.5;
    /// Crash tolerance multiplier while the glass modifier is active
    pub const GLASS_FRAGILITY: f32 = 0.5;

    /// Hostile AI: look-ahead distance along current velocity, in units
    pub const AI_LOOKAHEAD: f32 = 1.0;
    /// Hostile AI: predicted drop that counts as a cliff
    pub const AI_DROP_THRESHOLD: f32 = 1.0;
    /// Player credit for destroying a hostile ball
    pub const HOSTILE_SCORE_ON_DEATH: i32 = 100;
    pub const HOSTILE_TIME_ON_DEATH: i32 = 0;

    /// Debris shell: fixed angular grid around the death position
    pub const DEBRIS_AZIMUTH_STEPS: usize = 4;
    pub const DEBRIS_ELEVATION_STEPS: usize = 4;
    pub const DEBRIS_SHELL_RADIUS: f32 = 0.25;
    pub const DEBRIS_RADIUS: f32 = 0.05;
    /// Debris lifetime is MIN + SPREAD * random
    pub const DEBRIS_MIN_LIFETIME: f32 = 2.0;
    pub const DEBRIS_LIFETIME_SPREAD: f32 = 8.0;
}
