//! The world: owns map, bodies, hooks, and runs the simulation tick
//!
//! One tick is: every enabled hook in registration order, then the
//! integration/status/hazard phases for every enabled body, then deferred
//! spawn commits. Body integration runs strictly after the terrain-mutating
//! hooks so a lifted ball sees the already-updated surface in the same frame.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::consts::*;
use super::body::{Bodies, Body, BodyId, BodyKind, DeathCause};
use super::hooks::{GameHook, HookId, HookOutcome, HookRegistry};
use super::map::Map;
use super::spatial::SpatialIndex;

/// The primary player's session state, read by AI each tick and credited by
/// scoring features. Profile persistence lives outside the core.
#[derive(Debug, Clone)]
pub struct Player {
    pub position: Vec3,
    /// Alive and in control; AI ignores a non-playing player
    pub playing: bool,
    pub score: i32,
    /// Seconds left on the level clock
    pub time_left: i32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            playing: false,
            score: 0,
            time_left: 0,
        }
    }
}

/// Named effect events raised by the core. A sound subsystem maps these to
/// playback; the core never blocks on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEvent {
    /// A ball shattered on impact
    CrashDeath,
    /// A ball dissolved in acid or hit a kill cell
    HazardDeath,
}

/// Deferred hook operations queued during a tick pass
enum HookCommand {
    Remove(HookId),
    SetOn(HookId, bool),
}

/// Everything hooks may touch during their tick call. Split from the hook
/// registry itself so a hook can mutate the world without aliasing the
/// registry it is stored in.
pub struct WorldState {
    pub map: Option<Map>,
    pub bodies: Bodies,
    pub index: SpatialIndex,
    pub player: Player,
    /// Seeded generator; all randomness in the core flows through here so
    /// death effects replay deterministically
    pub rng: Pcg32,
    /// Simulation clock in seconds
    pub time: f64,
    events: Vec<SoundEvent>,
    spawned_hooks: Vec<Box<dyn GameHook>>,
    hook_commands: Vec<HookCommand>,
    pending_bodies: Vec<Body>,
}

impl WorldState {
    fn new(seed: u64) -> Self {
        Self {
            map: None,
            bodies: Bodies::new(),
            index: SpatialIndex::new(),
            player: Player::default(),
            rng: Pcg32::seed_from_u64(seed),
            time: 0.0,
            events: Vec::new(),
            spawned_hooks: Vec::new(),
            hook_commands: Vec::new(),
            pending_bodies: Vec::new(),
        }
    }

    /// Queue a hook for registration; it first ticks next frame
    pub fn spawn_hook(&mut self, hook: Box<dyn GameHook>) {
        self.spawned_hooks.push(hook);
    }

    /// Queue removal of another hook; takes effect before the next hook in
    /// this frame's pass runs
    pub fn remove_hook(&mut self, id: HookId) {
        self.hook_commands.push(HookCommand::Remove(id));
    }

    pub fn set_hook_on(&mut self, id: HookId, on: bool) {
        self.hook_commands.push(HookCommand::SetOn(id, on));
    }

    /// Queue a body for spawning; it first integrates next frame
    pub fn queue_body(&mut self, body: Body) {
        self.pending_bodies.push(body);
    }

    pub fn push_event(&mut self, event: SoundEvent) {
        self.events.push(event);
    }

    /// Drain effect events raised since the last call
    pub fn drain_events(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.events)
    }

    /// Terminal transition for a body: credit the player, shed debris,
    /// raise the cause-keyed effect event, and unlink from arena and index
    /// immediately so no later query this tick can observe the corpse.
    pub fn kill_body(&mut self, id: BodyId, cause: DeathCause) {
        let Some(body) = self.bodies.remove(id) else {
            return; // stale id, already gone
        };
        self.index.remove(id);
        log::debug!("body died at {:?}: {:?}", body.position, cause);

        if cause == DeathCause::Expired {
            return;
        }

        if body.score_on_death != 0 || body.time_on_death != 0 {
            self.player.score += body.score_on_death;
            self.player.time_left += body.time_on_death;
        }

        if body.kind != BodyKind::Debris {
            self.shed_debris(&body);
        }

        self.events.push(match cause {
            DeathCause::Crash => SoundEvent::CrashDeath,
            DeathCause::Acid | DeathCause::Kill => SoundEvent::HazardDeath,
            DeathCause::Expired => unreachable!(),
        });
    }

    /// Deterministic shell of debris around the death position: a fixed
    /// azimuth/elevation grid, with velocity and lifetime drawn from the
    /// seeded generator.
    fn shed_debris(&mut self, body: &Body) {
        for i in 0..DEBRIS_AZIMUTH_STEPS {
            for j in 0..DEBRIS_ELEVATION_STEPS {
                let azimuth = i as f32 / DEBRIS_AZIMUTH_STEPS as f32 * TAU;
                let elevation = (j as f32 + 0.5) / DEBRIS_ELEVATION_STEPS as f32 * PI;
                let offset = Vec3::new(
                    azimuth.cos() * DEBRIS_SHELL_RADIUS * elevation.sin(),
                    azimuth.sin() * DEBRIS_SHELL_RADIUS * elevation.sin(),
                    DEBRIS_SHELL_RADIUS * elevation.cos() + 0.5,
                );
                let jitter = Vec3::new(
                    self.rng.random::<f32>() - 0.5,
                    self.rng.random::<f32>() - 0.5,
                    self.rng.random::<f32>() - 0.5,
                );
                let lifetime =
                    DEBRIS_MIN_LIFETIME + DEBRIS_LIFETIME_SPREAD * self.rng.random::<f32>();
                self.pending_bodies.push(Body::debris(
                    body.position + offset,
                    body.velocity + jitter,
                    lifetime,
                ));
            }
        }
    }
}

/// Top-level simulation. Exclusively owns all bodies and hooks.
pub struct World {
    pub state: WorldState,
    hooks: HookRegistry,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            state: WorldState::new(seed),
            hooks: HookRegistry::new(),
        }
    }

    pub fn load_map(&mut self, map: Map) {
        log::info!(
            "loading level '{}' ({}x{})",
            map.name,
            map.width(),
            map.height()
        );
        self.state.map = Some(map);
    }

    /// Register a hook immediately (setup path; mid-tick spawns go through
    /// [`WorldState::spawn_hook`])
    pub fn add_hook(&mut self, hook: Box<dyn GameHook>) -> HookId {
        self.hooks.register(hook)
    }

    pub fn remove_hook(&mut self, id: HookId) {
        self.hooks.remove(id);
    }

    pub fn hook_is_alive(&self, id: HookId) -> bool {
        self.hooks.is_alive(id)
    }

    pub fn set_hook_on(&mut self, id: HookId, on: bool) {
        self.hooks.set_on(id, on);
    }

    pub fn hook_mut(&mut self, id: HookId) -> Option<&mut dyn GameHook> {
        self.hooks.get_mut(id)
    }

    /// Add a body immediately and link it into the spatial index
    pub fn add_body(&mut self, body: Body) -> BodyId {
        let aabb = body.aabb();
        let id = self.state.bodies.insert(body);
        self.state.index.insert(id, aabb);
        id
    }

    /// Advance the whole world one frame
    pub fn tick(&mut self, dt: f32) {
        self.state.time += dt as f64;
        self.tick_hooks(dt);
        self.integrate_bodies(dt);
        self.commit_pending();
    }

    /// Hook phase: every enabled hook, registration order, exactly once.
    /// Hooks registered during the pass are appended after the snapshot
    /// length and therefore first tick next frame.
    fn tick_hooks(&mut self, dt: f32) {
        let pass_len = self.hooks.order_len();
        for pos in 0..pass_len {
            let Some((id, mut hook)) = self.hooks.take_at(pos) else {
                continue; // removed earlier this frame
            };
            if !hook.is_on() {
                self.hooks.put_back(id, hook);
                continue;
            }
            match hook.tick(dt, &mut self.state) {
                HookOutcome::Keep => self.hooks.put_back(id, hook),
                HookOutcome::Remove => self.hooks.free_taken(id),
            }
            self.apply_hook_commands();
        }
    }

    fn apply_hook_commands(&mut self) {
        for command in self.state.hook_commands.drain(..) {
            match command {
                HookCommand::Remove(id) => self.hooks.remove(id),
                HookCommand::SetOn(id, on) => {
                    if let Some(hook) = self.hooks.get_mut(id) {
                        hook.set_on(on);
                    }
                }
            }
        }
    }

    /// Integration, status-effect, and hazard phases for every enabled body.
    /// No map loaded means bodies no-op for the frame.
    fn integrate_bodies(&mut self, dt: f32) {
        let mut deaths: Vec<(BodyId, DeathCause)> = Vec::new();

        {
            let Some(map) = self.state.map.as_ref() else {
                return;
            };
            for id in self.state.bodies.ids() {
                let Some(body) = self.state.bodies.get_mut(id) else {
                    continue;
                };
                if !body.is_on {
                    continue;
                }

                let outcome = body.integrate(map, dt);
                body.tick_modifiers(dt);

                // Hazard phase on the post-integration footprint
                let (ix, iy) = body.footprint();
                let flags = map.cell(ix, iy).flags;
                let cause = if flags & super::map::cell_flags::ACID != 0 {
                    Some(DeathCause::Acid)
                } else if flags & super::map::cell_flags::KILL != 0 {
                    Some(DeathCause::Kill)
                } else if outcome.impact_speed > body.effective_crash_tolerance() {
                    Some(DeathCause::Crash)
                } else if body.expired() {
                    Some(DeathCause::Expired)
                } else {
                    None
                };

                if let Some(cause) = cause {
                    deaths.push((id, cause));
                } else {
                    let aabb = body.aabb();
                    self.state.index.update(id, aabb);
                }
            }
        }

        for (id, cause) in deaths {
            self.state.kill_body(id, cause);
        }
    }

    /// Commit deferred spawns; they first tick next frame
    fn commit_pending(&mut self) {
        for body in std::mem::take(&mut self.state.pending_bodies) {
            let aabb = body.aabb();
            let id = self.state.bodies.insert(body);
            self.state.index.insert(id, aabb);
        }
        for hook in std::mem::take(&mut self.state.spawned_hooks) {
            self.hooks.register(hook);
        }
        self.apply_hook_commands();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell as StdCell;
    use std::rc::Rc;

    use glam::Vec2;

    use crate::consts::SIM_DT;
    use crate::sim::map::cell_flags;
    use crate::sim::spatial::Aabb;

    /// Hook that counts its ticks and can spawn a sibling or remove itself
    struct Probe {
        on: bool,
        ticks: Rc<StdCell<u32>>,
        spawn_sibling: bool,
        remove_after: Option<u32>,
    }

    impl Probe {
        fn new(ticks: Rc<StdCell<u32>>) -> Self {
            Self {
                on: true,
                ticks,
                spawn_sibling: false,
                remove_after: None,
            }
        }
    }

    impl GameHook for Probe {
        fn is_on(&self) -> bool {
            self.on
        }
        fn set_on(&mut self, on: bool) {
            self.on = on;
        }
        fn tick(&mut self, _dt: f32, world: &mut WorldState) -> HookOutcome {
            self.ticks.set(self.ticks.get() + 1);
            if self.spawn_sibling {
                self.spawn_sibling = false;
                let sibling = Probe::new(Rc::clone(&self.ticks));
                world.spawn_hook(Box::new(sibling));
            }
            if let Some(after) = self.remove_after
                && self.ticks.get() >= after
            {
                return HookOutcome::Remove;
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

    #[test]
    fn test_enabled_hook_ticks_once_per_frame() {
        let mut world = World::new(1);
        let ticks = Rc::new(StdCell::new(0));
        world.add_hook(Box::new(Probe::new(Rc::clone(&ticks))));
        world.tick(SIM_DT);
        world.tick(SIM_DT);
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn test_disabled_hook_skipped_and_reenabled() {
        let mut world = World::new(1);
        let ticks = Rc::new(StdCell::new(0));
        let id = world.add_hook(Box::new(Probe::new(Rc::clone(&ticks))));
        world.set_hook_on(id, false);
        world.tick(SIM_DT);
        assert_eq!(ticks.get(), 0);
        world.set_hook_on(id, true);
        world.tick(SIM_DT);
        assert_eq!(ticks.get(), 1);
    }

    #[test]
    fn test_spawned_hook_first_ticks_next_frame() {
        let mut world = World::new(1);
        let ticks = Rc::new(StdCell::new(0));
        let mut probe = Probe::new(Rc::clone(&ticks));
        probe.spawn_sibling = true;
        world.add_hook(Box::new(probe));

        world.tick(SIM_DT);
        // Only the original ran this frame
        assert_eq!(ticks.get(), 1);
        world.tick(SIM_DT);
        // Both run from the next frame on
        assert_eq!(ticks.get(), 3);
    }

    #[test]
    fn test_removed_hook_never_ticks_again() {
        let mut world = World::new(1);
        let ticks = Rc::new(StdCell::new(0));
        let mut probe = Probe::new(Rc::clone(&ticks));
        probe.remove_after = Some(1);
        let id = world.add_hook(Box::new(probe));

        world.tick(SIM_DT);
        assert_eq!(ticks.get(), 1);
        assert!(!world.hook_is_alive(id));
        world.tick(SIM_DT);
        assert_eq!(ticks.get(), 1);
        // Stale handle operations are safe no-ops
        world.set_hook_on(id, true);
        world.remove_hook(id);
    }

    #[test]
    fn test_bodies_noop_without_map() {
        let mut world = World::new(1);
        let body = Body::new(BodyKind::Marble, Vec3::new(1.0, 1.0, 5.0), 0.3);
        let id = world.add_body(body);
        world.tick(SIM_DT);
        // No map: no gravity, no movement
        let body = world.state.bodies.get(id).unwrap();
        assert_eq!(body.position.z, 5.0);
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_acid_cell_kills_same_tick_with_debris_shell() {
        let mut world = World::new(7);
        let mut map = Map::new(4, 4);
        map.cell_mut(2, 2).flags |= cell_flags::ACID;
        world.load_map(map);

        let mut body = Body::new(BodyKind::Marble, Vec3::new(2.5, 2.5, 0.3), 0.3);
        body.velocity = Vec2::new(3.0, 0.0).extend(0.0);
        let id = world.add_body(body);

        world.tick(SIM_DT);

        assert!(!world.state.bodies.is_alive(id));
        // 4x4 debris shell committed at end of tick
        assert_eq!(world.state.bodies.len(), 16);
        assert!(
            world
                .state
                .bodies
                .iter()
                .all(|(_, b)| b.kind == BodyKind::Debris)
        );
        assert_eq!(world.state.drain_events(), vec![SoundEvent::HazardDeath]);
    }

    #[test]
    fn test_dead_body_leaves_spatial_index() {
        let mut world = World::new(7);
        let mut map = Map::new(4, 4);
        map.cell_mut(2, 2).flags |= cell_flags::KILL;
        world.load_map(map);

        let body = Body::new(BodyKind::Marble, Vec3::new(2.5, 2.5, 0.3), 0.3);
        let id = world.add_body(body);
        assert_eq!(world.state.index.len(), 1);

        world.tick(SIM_DT);

        let hits = world
            .state
            .index
            .query_overlap(&Aabb::around(Vec3::new(2.5, 2.5, 0.3), 1.0));
        assert!(!hits.contains(&id));
    }

    #[test]
    fn test_crash_death_on_hard_impact() {
        let mut world = World::new(3);
        world.load_map(Map::new(4, 4));
        let mut body = Body::new(BodyKind::Marble, Vec3::new(2.0, 2.0, 0.35), 0.3);
        body.crash_tolerance = 5.0;
        body.velocity.z = -10.0;
        let id = world.add_body(body);

        world.tick(SIM_DT);

        assert!(!world.state.bodies.is_alive(id));
        assert_eq!(world.state.drain_events(), vec![SoundEvent::CrashDeath]);
    }

    #[test]
    fn test_debris_expires_silently() {
        let mut world = World::new(3);
        world.load_map(Map::new(4, 4));
        let debris = Body::debris(Vec3::new(2.0, 2.0, 1.0), Vec3::ZERO, 0.015);
        let id = world.add_body(debris);

        world.tick(SIM_DT);
        world.tick(SIM_DT);

        assert!(!world.state.bodies.is_alive(id));
        assert_eq!(world.state.bodies.len(), 0, "debris sheds no debris");
        assert!(world.state.drain_events().is_empty());
    }

    #[test]
    fn test_hostile_death_credits_player() {
        let mut world = World::new(3);
        let mut map = Map::new(4, 4);
        map.cell_mut(1, 1).flags |= cell_flags::ACID;
        world.load_map(map);

        let mut body = Body::new(BodyKind::Hostile, Vec3::new(1.5, 1.5, 0.4), 0.4);
        body.score_on_death = 100;
        body.time_on_death = 10;
        world.add_body(body);

        world.tick(SIM_DT);

        assert_eq!(world.state.player.score, 100);
        assert_eq!(world.state.player.time_left, 10);
    }

    #[test]
    fn test_disabled_body_does_not_integrate() {
        let mut world = World::new(3);
        world.load_map(Map::new(4, 4));
        let mut body = Body::new(BodyKind::Marble, Vec3::new(2.0, 2.0, 3.0), 0.3);
        body.is_on = false;
        let id = world.add_body(body);

        world.tick(SIM_DT);

        assert_eq!(world.state.bodies.get(id).unwrap().position.z, 3.0);
    }
}
