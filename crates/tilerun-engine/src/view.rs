//! Read-only per-entity views for a renderer.

use serde::{Deserialize, Serialize};
use tilerun_arena::handle::EntityId;

use crate::entity::{
    AnimState, BrickState, EnemyState, Entity, EntityKind, TileKind,
};
use crate::physics::Position;

/// What a renderer needs to draw one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Body centre in metres.
    pub position: Position,
    pub facing_right: bool,
    pub anim: AnimState,
    /// Seconds in the current logical state, for picking animation frames.
    pub state_time: f32,
    pub visible: bool,
    pub rotation_degrees: f32,
    /// Whether the player is in its tall form. Always false for others.
    pub grown: bool,
}

impl EntityView {
    pub fn of(id: EntityId, entity: &Entity) -> Self {
        let base = Self {
            id,
            kind: entity.kind(),
            position: entity.position(),
            facing_right: false,
            anim: AnimState::Item,
            state_time: 0.0,
            visible: true,
            rotation_degrees: 0.0,
            grown: false,
        };
        match entity {
            Entity::Player(p) => Self {
                facing_right: p.facing_right(),
                anim: AnimState::Player(p.state()),
                state_time: p.state_time(),
                grown: p.is_grown(),
                ..base
            },
            Entity::Enemy(e) => Self {
                facing_right: e.facing_right(),
                anim: match e.state() {
                    EnemyState::Walker(s) => AnimState::Walker(s),
                    EnemyState::Shelled(s) => AnimState::Shelled(s),
                },
                state_time: e.state_time(),
                rotation_degrees: e.rotation_degrees(),
                ..base
            },
            Entity::Item(i) => Self {
                facing_right: i.velocity().dx > 0.0,
                visible: !i.is_destroyed(),
                ..base
            },
            Entity::Tile(t) => match t.tile_kind() {
                TileKind::Brick(state) => Self {
                    anim: AnimState::Brick(state),
                    visible: state == BrickState::Intact,
                    ..base
                },
                TileKind::Coin { state, .. } => Self {
                    anim: AnimState::Coin(state),
                    ..base
                },
            },
        }
    }
}
