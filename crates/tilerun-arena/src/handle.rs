//! Handles naming a slot in an [`Arena`](crate::arena::Arena) at a point in
//! its history.
//!
//! A handle remembers which slot it points at and how many times that slot had
//! been vacated when the handle was issued. The arena bumps the count on every
//! removal, so an old handle stops resolving instead of reaching whatever moved
//! in afterwards. Physics fixtures store handles as plain integers, which is
//! why the packed form is public.

use serde::{Deserialize, Serialize};
use std::fmt;

const GENERATION_SHIFT: u32 = 32;

/// Slot plus generation, packed as `generation << 32 | slot`.
///
/// Ordering compares the packed value: generation first, then slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self(u64::from(generation) << GENERATION_SHIFT | u64::from(index))
    }

    /// Slot in the arena.
    #[inline]
    pub fn index(self) -> u32 {
        (self.0 & u64::from(u32::MAX)) as u32
    }

    /// Times the slot had been vacated when this handle was issued.
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> GENERATION_SHIFT) as u32
    }

    /// The packed form stored in collider user data.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Inverse of [`to_raw`](Self::to_raw). Any `u64` is a valid handle;
    /// whether it resolves is up to the arena.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityId").field(&format_args!("{self}")).finish()
    }
}

impl fmt::Display for EntityId {
    /// `slot:generation`, e.g. `3:2`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index(), self.generation())
    }
}
