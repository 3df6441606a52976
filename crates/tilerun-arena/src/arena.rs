//! Slot arena with generational handles.
//!
//! [`Arena`] owns its values and hands out [`EntityId`]s. Removal bumps the
//! slot's generation, so stale handles simply stop resolving instead of
//! pointing at whatever moved into the slot afterwards. Freed slots are reused
//! in FIFO order so generations spread across slots rather than piling onto
//! one hot index.
//!
//! Iteration is always in slot-index order, which keeps update passes
//! deterministic.

use std::collections::VecDeque;

use crate::handle::EntityId;
use crate::ArenaError;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational slot storage.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: VecDeque<u32>,
    len: usize,
}

impl<T> Arena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: VecDeque::new(),
            len: 0,
        }
    }

    /// Insert a value and return its handle.
    pub fn insert(&mut self, value: T) -> EntityId {
        self.insert_with(|_| value)
    }

    /// Insert a value built from its own handle.
    ///
    /// Useful when the value must know its handle at construction time, e.g.
    /// to tag physics fixtures with their owner.
    pub fn insert_with(&mut self, build: impl FnOnce(EntityId) -> T) -> EntityId {
        let id = match self.free.pop_front() {
            Some(index) => EntityId::new(index, self.slots[index as usize].generation),
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                EntityId::new(index, 0)
            }
        };
        self.slots[id.index() as usize].value = Some(build(id));
        self.len += 1;
        id
    }

    /// Remove the value behind `id`.
    ///
    /// Returns `None` for stale or unknown handles; removing twice is a no-op.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let slot = self.live_slot_mut(id)?;
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push_back(id.index());
        self.len -= 1;
        value
    }

    /// Shared access to a live value.
    pub fn get(&self, id: EntityId) -> Option<&T> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutable access to a live value.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.live_slot_mut(id)?.value.as_mut()
    }

    /// Mutable access to two distinct live values at once.
    pub fn get_pair_mut(&mut self, a: EntityId, b: EntityId) -> Result<(&mut T, &mut T), ArenaError> {
        if a.index() == b.index() {
            return Err(ArenaError::Aliased { entity: a });
        }
        for id in [a, b] {
            if !self.contains(id) {
                return Err(ArenaError::StaleEntity { entity: id });
            }
        }

        let (ia, ib) = (a.index() as usize, b.index() as usize);
        let (lo, hi) = (ia.min(ib), ia.max(ib));
        let (head, tail) = self.slots.split_at_mut(hi);
        let lo_value = head[lo].value.as_mut();
        let hi_value = tail[0].value.as_mut();
        match (lo_value, hi_value) {
            (Some(lo_ref), Some(hi_ref)) if ia < ib => Ok((lo_ref, hi_ref)),
            (Some(lo_ref), Some(hi_ref)) => Ok((hi_ref, lo_ref)),
            _ => Err(ArenaError::StaleEntity { entity: a }),
        }
    }

    /// Whether `id` refers to a live value.
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no live values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handles of all live values, in slot order.
    ///
    /// Returns an owned list so callers can mutate the arena while walking it.
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Iterate live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (EntityId::new(index as u32, slot.generation), value))
        })
    }

    /// Iterate live values mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|value| (EntityId::new(index as u32, generation), value))
        })
    }

    fn live_slot_mut(&mut self, id: EntityId) -> Option<&mut Slot<T>> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() || slot.value.is_none() {
            return None;
        }
        Some(slot)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
