//! Tilerun Arena -- generational handle storage for gameplay entities.
//!
//! Physics fixtures refer back to the entity that owns them. Storing a raw
//! owning reference there would dangle once the entity is removed, so the
//! fixture stores an [`EntityId`](handle::EntityId) instead and resolves it
//! through an [`Arena`](arena::Arena). A removed entity's handle stops
//! resolving immediately, even if its slot is reused.
//!
//! # Quick Start
//!
//! ```
//! use tilerun_arena::prelude::*;
//!
//! let mut arena = Arena::new();
//! let goomba = arena.insert("goomba");
//! assert_eq!(arena.get(goomba), Some(&"goomba"));
//!
//! arena.remove(goomba);
//! assert!(arena.get(goomba).is_none());
//! ```

#![deny(unsafe_code)]

pub mod arena;
pub mod handle;

/// Errors produced by arena operations.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// The handle does not refer to a live value (stale or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: handle::EntityId },

    /// Two handles passed to a pair accessor refer to the same slot.
    #[error("entity {entity:?} requested twice in a pair borrow")]
    Aliased { entity: handle::EntityId },
}

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::arena::Arena;
    pub use crate::handle::EntityId;
    pub use crate::ArenaError;
}
