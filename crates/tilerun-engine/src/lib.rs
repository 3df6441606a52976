//! Tilerun Engine -- contact-driven gameplay core for a 2D tile platformer.
//!
//! A player traverses a tile level, stomps and kicks enemies, breaks bricks and
//! collects power-ups. Movement is simulated by rapier2d; gameplay is a set of
//! small state machines driven by the contacts rapier reports.
//!
//! The pieces, in dependency order:
//!
//! - [`category`]: fixture categories and the collision-filter matrix.
//! - [`physics`]: the rapier wrapper, contact collection and the state-only
//!   [`BodyControl`](physics::BodyControl) handed to reactions.
//! - [`level`] and [`builder`]: level data and world construction.
//! - [`entity`]: player, enemy, item and tile state machines.
//! - [`dispatch`]: routing contacts to reactions.
//! - [`spawn`], [`services`], [`tiles`]: deferred spawns, scoring and sound,
//!   the graphic tile map.
//! - [`tick`]: the fixed-timestep driver. [`view`]: what a renderer reads.
//!
//! # Quick Start
//!
//! ```
//! use tilerun_engine::prelude::*;
//!
//! let mut level = LevelDescriptor::empty();
//! level.push("ground", MapObject::rect(0.0, 0.0, 640.0, 16.0));
//! level.push("walkers", MapObject::rect(240.0, 16.0, 16.0, 16.0));
//!
//! let recorder = EventRecorder::new();
//! let world = WorldBuilder::new(Services::recording(&recorder)).build(&level)?;
//! let mut sim = Simulation::new(world, TickConfig::default());
//!
//! sim.set_input(PlayerInput { right: true, ..Default::default() });
//! sim.run_ticks(10);
//! assert_eq!(sim.views().len(), 2);
//! # Ok::<(), BuildError>(())
//! ```

#![deny(unsafe_code)]

pub mod builder;
pub mod category;
pub mod dispatch;
pub mod entity;
pub mod level;
pub mod physics;
pub mod services;
pub mod spawn;
pub mod tick;
pub mod tiles;
pub mod view;
pub mod world;

/// Re-export the arena crate for convenience.
pub use tilerun_arena;

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tilerun_arena::prelude::*;

    pub use crate::builder::{BuildError, WorldBuilder};
    pub use crate::category::{Categories, Category};
    pub use crate::dispatch::{classify, DispatchError, DispatchSummary, Reaction};
    pub use crate::entity::{
        AnimState, BrickState, CoinState, EnemyState, Entity, EntityKind, PlayerInput,
        PlayerState, ShelledState, TileKind, WalkerState,
    };
    pub use crate::level::{LevelDescriptor, LevelError, MapObject, MapShape};
    pub use crate::physics::{Contact, FixtureRef, PhysicsWorld, Position, Velocity};
    pub use crate::services::{EventRecorder, ScoreSink, Services, SoundEvent, SoundSink};
    pub use crate::spawn::{ItemKind, SpawnRequest};
    pub use crate::tick::{Simulation, TickConfig, TickReport};
    pub use crate::view::EntityView;
    pub use crate::world::GameWorld;
}
