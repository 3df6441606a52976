//! Gameplay entities and their state machines.
//!
//! [`Entity`] is a closed sum over the four families. Each family keeps its
//! own logical state, a timer for how long it has been in that state, and the
//! handle of the body it owns. Reactions and updates receive a [`Context`]
//! whose physics access is state-only; anything structural (destroying or
//! rebuilding a body, leaving the store) is flagged and resolved later by
//! [`Entity::resolve_structural`].

pub mod enemy;
pub mod item;
pub mod player;
pub mod tile;

use serde::{Deserialize, Serialize};
use tilerun_arena::handle::EntityId;

use crate::physics::{BodyControl, BodyId, PhysicsWorld, Position};
use crate::services::Services;
use crate::spawn::SpawnQueue;
use crate::tiles::TileMap;

pub use enemy::{Enemy, EnemySnapshot, EnemyState, ShelledState, WalkerState};
pub use item::Item;
pub use player::{Player, PlayerInput, PlayerState};
pub use tile::{BrickState, CoinState, Tile, TileKind};

/// Timers accumulate `dt` in `f32`; thresholds allow for rounding.
const TIMER_SLACK: f32 = 1e-4;

/// Whether a state timer has reached `secs`.
pub(crate) fn has_elapsed(timer: f32, secs: f32) -> bool {
    timer + TIMER_SLACK >= secs
}

/// Everything a reaction or update may touch besides the entities.
pub struct Context<'a, 'w> {
    pub bodies: &'a mut BodyControl<'w>,
    pub services: &'a mut Services,
    pub spawns: &'a mut SpawnQueue,
    pub tiles: &'a mut TileMap,
}

/// What an entity is, for rendering and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Walker,
    Shelled,
    Mushroom,
    Brick,
    Coin,
}

/// Logical state exposed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", content = "state")]
pub enum AnimState {
    Player(PlayerState),
    Walker(WalkerState),
    Shelled(ShelledState),
    Item,
    Brick(BrickState),
    Coin(CoinState),
}

/// A gameplay entity.
#[derive(Debug)]
pub enum Entity {
    Player(Player),
    Enemy(Enemy),
    Item(Item),
    Tile(Tile),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Player(_) => EntityKind::Player,
            Entity::Enemy(e) => e.kind(),
            Entity::Item(_) => EntityKind::Mushroom,
            Entity::Tile(t) => t.kind(),
        }
    }

    /// The body this entity currently owns.
    pub fn body(&self) -> Option<BodyId> {
        match self {
            Entity::Player(p) => Some(p.body()),
            Entity::Enemy(e) => e.body(),
            Entity::Item(i) => i.body(),
            Entity::Tile(t) => Some(t.body()),
        }
    }

    /// Last position synchronised from physics.
    pub fn position(&self) -> Position {
        match self {
            Entity::Player(p) => p.position(),
            Entity::Enemy(e) => e.position(),
            Entity::Item(i) => i.position(),
            Entity::Tile(t) => t.position(),
        }
    }

    pub fn as_player(&self) -> Option<&Player> {
        match self {
            Entity::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_enemy(&self) -> Option<&Enemy> {
        match self {
            Entity::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Entity::Item(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_tile(&self) -> Option<&Tile> {
        match self {
            Entity::Tile(t) => Some(t),
            _ => None,
        }
    }

    /// Per-tick logical update. Runs after the structural pass.
    pub fn update(&mut self, dt: f32, ctx: &mut Context<'_, '_>) {
        match self {
            Entity::Player(p) => p.update(dt, ctx),
            Entity::Enemy(e) => e.update(dt, ctx),
            Entity::Item(i) => i.update(ctx),
            Entity::Tile(_) => {}
        }
    }

    /// Carry out flagged body changes. Only called between steps.
    pub fn resolve_structural(&mut self, id: EntityId, physics: &mut PhysicsWorld) {
        match self {
            Entity::Player(p) => p.resolve_structural(id, physics),
            Entity::Enemy(e) => e.resolve_structural(physics),
            Entity::Item(i) => i.resolve_structural(physics),
            Entity::Tile(_) => {}
        }
    }

    /// Whether the entity should leave the store in the next structural pass.
    pub fn is_removable(&self) -> bool {
        match self {
            Entity::Player(_) | Entity::Tile(_) => false,
            Entity::Enemy(e) => e.is_removable(),
            Entity::Item(i) => i.is_removable(),
        }
    }
}
