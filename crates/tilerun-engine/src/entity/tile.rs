//! Interactive tiles: bricks and coin blocks.

use serde::{Deserialize, Serialize};
use tilerun_arena::handle::EntityId;
use tracing::debug;

use super::player::Player;
use super::{Context, EntityKind};
use crate::category::Category;
use crate::physics::{px, BodyDef, BodyId, FixtureDef, FixtureShape, PhysicsWorld, Position};
use crate::services::SoundEvent;
use crate::spawn::{ItemKind, SpawnRequest};
use crate::tiles::{Cell, BLANK_COIN_TILE, TILE_SIZE};

/// Awarded for breaking a brick.
pub const BRICK_SCORE: u32 = 200;
/// Awarded for emptying a coin block.
pub const COIN_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrickState {
    /// Solid; bumps a small player.
    Intact,
    /// Broken; its fixture no longer collides.
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinState {
    /// Not yet hit.
    Full,
    /// Emptied; only bumps from now on.
    Blank,
}

/// Which block a tile is and where it stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Brick(BrickState),
    Coin {
        state: CoinState,
        /// Item released by the first hit instead of a plain coin.
        contains: Option<ItemKind>,
    },
}

/// A brick or coin block with a static body.
#[derive(Debug)]
pub struct Tile {
    body: BodyId,
    position: Position,
    cell: Cell,
    kind: TileKind,
}

fn tile_body(position: Position, half_width: f32, half_height: f32, category: Category) -> BodyDef {
    BodyDef::fixed(position).with_fixture(FixtureDef::new(
        FixtureShape::Box {
            half_width,
            half_height,
        },
        category,
    ))
}

impl Tile {
    /// A brick centred on `position` with the given half extents (metres).
    pub fn spawn_brick(
        physics: &mut PhysicsWorld,
        id: EntityId,
        position: Position,
        half_width: f32,
        half_height: f32,
    ) -> Self {
        let def = tile_body(position, half_width, half_height, Category::Brick);
        Self {
            body: physics.create_body(&def, Some(id)),
            position,
            cell: Cell::containing(position),
            kind: TileKind::Brick(BrickState::Intact),
        }
    }

    /// A coin block, optionally holding an item.
    pub fn spawn_coin(
        physics: &mut PhysicsWorld,
        id: EntityId,
        position: Position,
        half_width: f32,
        half_height: f32,
        contains: Option<ItemKind>,
    ) -> Self {
        let def = tile_body(position, half_width, half_height, Category::Coin);
        Self {
            body: physics.create_body(&def, Some(id)),
            position,
            cell: Cell::containing(position),
            kind: TileKind::Coin {
                state: CoinState::Full,
                contains,
            },
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self.kind {
            TileKind::Brick(_) => EntityKind::Brick,
            TileKind::Coin { .. } => EntityKind::Coin,
        }
    }

    pub fn tile_kind(&self) -> TileKind {
        self.kind
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Map cell whose graphic this tile controls.
    pub fn cell(&self) -> Cell {
        self.cell
    }

    /// The player's head struck this tile from below.
    pub fn on_head_hit(&mut self, player: &Player, ctx: &mut Context<'_, '_>) {
        match &mut self.kind {
            TileKind::Brick(state @ BrickState::Intact) => {
                if player.is_grown() {
                    *state = BrickState::Destroyed;
                    ctx.bodies
                        .set_fixture_category(self.body, Category::Brick, Category::Destroyed);
                    ctx.tiles.clear(self.cell);
                    ctx.services.add_score(BRICK_SCORE);
                    ctx.services.play(SoundEvent::BreakBlock);
                    debug!(cell = ?self.cell, "brick broken");
                } else {
                    ctx.services.play(SoundEvent::Bump);
                }
            }
            TileKind::Brick(BrickState::Destroyed) => {}
            TileKind::Coin {
                state: state @ CoinState::Full,
                contains,
            } => {
                match contains {
                    Some(item) => {
                        ctx.spawns.push(SpawnRequest {
                            position: Position::new(
                                self.position.x,
                                self.position.y + px(TILE_SIZE),
                            ),
                            item: *item,
                        });
                        ctx.services.play(SoundEvent::PowerUpAppear);
                    }
                    None => ctx.services.play(SoundEvent::Coin),
                }
                ctx.services.add_score(COIN_SCORE);
                *state = CoinState::Blank;
                ctx.tiles.set_tile(self.cell, BLANK_COIN_TILE);
                debug!(cell = ?self.cell, "coin emptied");
            }
            TileKind::Coin {
                state: CoinState::Blank,
                ..
            } => ctx.services.play(SoundEvent::Bump),
        }
    }
}
