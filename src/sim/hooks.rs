//! GameHook protocol: every dynamic world object ticked once per frame
//!
//! Platforms, signs, color cyclers, and AI drivers all implement [`GameHook`]
//! and live in a slot arena. Handles are generation-checked, so a hook that
//! keeps a reference to a removed peer gets a failed liveness check rather
//! than a dangling pointer. The tick pass runs in registration order; hooks
//! spawned during a tick first run next frame.

use std::any::Any;

use super::world::WorldState;

/// Generation-checked handle to a registered hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId {
    index: u32,
    generation: u32,
}

/// What a hook asks the scheduler to do after its tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Keep,
    /// Permanently detach; the hook is never ticked again
    Remove,
}

/// Broad role tag, used by consumers (editor, renderer) to pick hooks out of
/// the registry before downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRole {
    Terrain,
    Sign,
    Ai,
    Generic,
}

/// A tick participant. One `tick` call per frame while registered and
/// enabled; disabled hooks keep existing and can be re-enabled.
///
/// A hook must no-op safely when the world has no map loaded.
pub trait GameHook: Any {
    fn is_on(&self) -> bool;

    fn set_on(&mut self, on: bool);

    fn role(&self) -> HookRole {
        HookRole::Generic
    }

    /// Advance one frame. Hooks may mutate the map, query the spatial index,
    /// reposition bodies, queue new hooks, or request their own removal.
    fn tick(&mut self, dt: f32, world: &mut WorldState) -> HookOutcome;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct HookSlot {
    generation: u32,
    hook: Option<Box<dyn GameHook>>,
}

/// Ordered registry of hooks. Registration order is tick order.
#[derive(Default)]
pub struct HookRegistry {
    slots: Vec<HookSlot>,
    /// Slot indices in registration order; entries whose slot died are
    /// skipped and purged when the slot is reused
    order: Vec<u32>,
    free: Vec<u32>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Box<dyn GameHook>) -> HookId {
        let index = if let Some(index) = self.free.pop() {
            // Reused slot: drop the stale order entry before re-appending
            self.order.retain(|&i| i != index);
            self.slots[index as usize].hook = Some(hook);
            index
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HookSlot {
                generation: 0,
                hook: Some(hook),
            });
            index
        };
        self.order.push(index);
        let id = HookId {
            index,
            generation: self.slots[index as usize].generation,
        };
        log::debug!("hook {:?} registered", id);
        id
    }

    /// Detach a hook. Safe on stale ids.
    pub fn remove(&mut self, id: HookId) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation || slot.hook.is_none() {
            return;
        }
        slot.hook = None;
        slot.generation += 1;
        self.free.push(id.index);
        log::debug!("hook {:?} removed", id);
    }

    pub fn is_alive(&self, id: HookId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|s| s.generation == id.generation && s.hook.is_some())
    }

    pub fn get_mut(&mut self, id: HookId) -> Option<&mut dyn GameHook> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.hook.as_deref_mut()
    }

    pub fn set_on(&mut self, id: HookId, on: bool) {
        if let Some(hook) = self.get_mut(id) {
            hook.set_on(on);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.hook.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of scheduling positions; stable across one tick pass
    pub(crate) fn order_len(&self) -> usize {
        self.order.len()
    }

    /// Take the hook at scheduling position `pos` out of its slot for the
    /// duration of its tick call. Returns `None` for dead positions.
    pub(crate) fn take_at(&mut self, pos: usize) -> Option<(HookId, Box<dyn GameHook>)> {
        let index = *self.order.get(pos)?;
        let slot = &mut self.slots[index as usize];
        let hook = slot.hook.take()?;
        Some((
            HookId {
                index,
                generation: slot.generation,
            },
            hook,
        ))
    }

    /// Put a ticked hook back into its slot
    pub(crate) fn put_back(&mut self, id: HookId, hook: Box<dyn GameHook>) {
        let slot = &mut self.slots[id.index as usize];
        debug_assert!(slot.generation == id.generation && slot.hook.is_none());
        slot.hook = Some(hook);
    }

    /// Free the slot of a hook that removed itself mid-tick
    pub(crate) fn free_taken(&mut self, id: HookId) {
        let slot = &mut self.slots[id.index as usize];
        debug_assert!(slot.hook.is_none());
        slot.generation += 1;
        self.free.push(id.index);
        log::debug!("hook {:?} removed itself", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::sim::platform::CyclicPlatform;
    use crate::sim::sign::{BonusKind, ScoreSign};

    #[test]
    fn test_role_and_downcast_recover_concrete_hook() {
        let mut registry = HookRegistry::new();
        let platform = registry.register(Box::new(CyclicPlatform::new(
            0, 0, 1, 1, 0.0, 1.0, 0.0, 1.0,
        )));
        let sign = registry.register(Box::new(ScoreSign::new(BonusKind::Score, 10, Vec3::ZERO)));

        let hook = registry.get_mut(platform).unwrap();
        assert_eq!(hook.role(), HookRole::Terrain);
        assert!(hook.as_any().downcast_ref::<CyclicPlatform>().is_some());
        assert!(hook.as_any().downcast_ref::<ScoreSign>().is_none());

        // Mutation through the seam reaches the concrete hook
        let hook = registry.get_mut(sign).unwrap();
        assert_eq!(hook.role(), HookRole::Sign);
        let sign = hook.as_any_mut().downcast_mut::<ScoreSign>().unwrap();
        assert_eq!(sign.granted(), 0);
    }
}
