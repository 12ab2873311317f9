//! Score and time bonus signs
//!
//! A sign pays its points out gradually over its lifetime rather than all at
//! once; the player watches the number count up while the sign fades. Only
//! whole points are ever credited, and the running total lands exactly on
//! the configured amount when the sign expires (negative bonuses included).

use glam::Vec3;

use super::hooks::{GameHook, HookOutcome, HookRole};
use super::world::WorldState;

/// Which player counter the sign feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusKind {
    Score,
    Time,
}

#[derive(Debug, Clone)]
pub struct ScoreSign {
    on: bool,
    kind: BonusKind,
    /// Display anchor (rendering reads this; the core only stores it)
    pub position: Vec3,
    total: i32,
    lifetime: f32,
    life_left: f32,
    granted: i32,
}

impl ScoreSign {
    pub fn new(kind: BonusKind, total: i32, position: Vec3) -> Self {
        Self {
            on: true,
            kind,
            position,
            total,
            lifetime: 4.0,
            life_left: 4.0,
            granted: 0,
        }
    }

    pub fn kind(&self) -> BonusKind {
        self.kind
    }

    /// Points credited so far
    pub fn granted(&self) -> i32 {
        self.granted
    }
}

impl GameHook for ScoreSign {
    fn is_on(&self) -> bool {
        self.on
    }

    fn set_on(&mut self, on: bool) {
        self.on = on;
    }

    fn role(&self) -> HookRole {
        HookRole::Sign
    }

    fn tick(&mut self, dt: f32, world: &mut WorldState) -> HookOutcome {
        self.life_left = (self.life_left - dt).max(0.0);

        // Whole points owed by now; truncation keeps negative totals exact
        let elapsed = self.lifetime - self.life_left;
        let target = if self.life_left <= 0.0 {
            self.total
        } else {
            (self.total as f32 * elapsed / self.lifetime) as i32
        };
        let delta = target - self.granted;
        if delta != 0 {
            self.granted = target;
            match self.kind {
                BonusKind::Score => world.player.score += delta,
                BonusKind::Time => world.player.time_left += delta,
            }
            log::trace!("sign paid {} ({:?}), {} total", delta, self.kind, target);
        }

        if self.life_left <= 0.0 {
            HookOutcome::Remove
        } else {
            HookOutcome::Keep
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::world::World;

    #[test]
    fn test_score_paid_out_gradually_and_exactly() {
        let mut world = World::new(5);
        world.add_hook(Box::new(ScoreSign::new(
            BonusKind::Score,
            250,
            Vec3::new(2.0, 2.0, 1.0),
        )));

        // Half the lifetime: roughly half the points, never more than owed
        for _ in 0..200 {
            world.tick(SIM_DT);
        }
        assert!((120..=125).contains(&world.state.player.score));

        // Run past expiry: exact total, sign gone
        for _ in 0..300 {
            world.tick(SIM_DT);
        }
        assert_eq!(world.state.player.score, 250);
    }

    #[test]
    fn test_time_bonus_feeds_clock() {
        let mut world = World::new(5);
        world.add_hook(Box::new(ScoreSign::new(BonusKind::Time, 30, Vec3::ZERO)));
        for _ in 0..500 {
            world.tick(SIM_DT);
        }
        assert_eq!(world.state.player.time_left, 30);
        assert_eq!(world.state.player.score, 0);
    }

    #[test]
    fn test_negative_penalty_lands_exactly() {
        let mut world = World::new(5);
        world.add_hook(Box::new(ScoreSign::new(BonusKind::Score, -100, Vec3::ZERO)));
        for _ in 0..500 {
            world.tick(SIM_DT);
        }
        assert_eq!(world.state.player.score, -100);
    }

    #[test]
    fn test_sign_removes_itself() {
        let mut world = World::new(5);
        let id = world.add_hook(Box::new(ScoreSign::new(BonusKind::Score, 10, Vec3::ZERO)));
        for _ in 0..401 {
            world.tick(SIM_DT);
        }
        assert!(!world.hook_is_alive(id));
    }
}
