//! Populate a [`GameWorld`] from a [`LevelDescriptor`].
//!
//! Ground and solid objects become owner-less static bodies. Bricks, coin
//! blocks and enemies become entities wrapping their body. Any malformed
//! object aborts the build with a [`BuildError`]; nothing is retried.

use tilerun_arena::prelude::*;
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::entity::{Enemy, Entity, Player, Tile};
use crate::level::{
    LevelDescriptor, MapObject, MapShape, BRICKS_LAYER, COINS_LAYER, GROUND_LAYER, OBJECTS_LAYER,
    REQUIRED_LAYERS, SHELLED_LAYER, WALKERS_LAYER,
};
use crate::physics::{px, BodyDef, FixtureDef, FixtureShape, PhysicsWorld, Position, GRAVITY};
use crate::services::Services;
use crate::spawn::ItemKind;
use crate::tiles::TileMap;
use crate::world::GameWorld;

/// Property naming the item a coin block holds.
pub const CONTAINS_PROPERTY: &str = "contains";
/// Older maps flag mushroom blocks with a bare key.
pub const LEGACY_MUSHROOM_PROPERTY: &str = "mushroom";

/// Fatal level configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("level is missing required layer `{layer}`")]
    MissingLayer { layer: String },

    #[error("object {index} on layer `{layer}` has shape `{shape}`, expected a rectangle")]
    UnsupportedShape {
        layer: String,
        index: usize,
        shape: &'static str,
    },

    #[error("object {index} on layer `{layer}` has invalid size {width}x{height}")]
    InvalidSize {
        layer: String,
        index: usize,
        width: f32,
        height: f32,
    },

    #[error("object {index} on layer `{layer}` contains unknown item `{value}`")]
    UnknownItem {
        layer: String,
        index: usize,
        value: String,
    },
}

/// A validated rectangle, in metres.
#[derive(Debug, Clone, Copy)]
struct Rect {
    centre: Position,
    half_width: f32,
    half_height: f32,
}

fn rect_of(layer: &str, index: usize, object: &MapObject) -> Result<Rect, BuildError> {
    let MapShape::Rectangle {
        x,
        y,
        width,
        height,
    } = object.shape
    else {
        return Err(BuildError::UnsupportedShape {
            layer: layer.to_owned(),
            index,
            shape: object.shape.kind_name(),
        });
    };
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if !valid(width) || !valid(height) || !x.is_finite() || !y.is_finite() {
        return Err(BuildError::InvalidSize {
            layer: layer.to_owned(),
            index,
            width,
            height,
        });
    }
    Ok(Rect {
        centre: Position::new(px(x + width / 2.0), px(y + height / 2.0)),
        half_width: px(width / 2.0),
        half_height: px(height / 2.0),
    })
}

fn contained_item(layer: &str, index: usize, object: &MapObject) -> Result<Option<ItemKind>, BuildError> {
    if let Some(value) = object.property(CONTAINS_PROPERTY) {
        return ItemKind::from_property(value)
            .map(Some)
            .ok_or_else(|| BuildError::UnknownItem {
                layer: layer.to_owned(),
                index,
                value: value.to_owned(),
            });
    }
    if object.property(LEGACY_MUSHROOM_PROPERTY).is_some() {
        return Ok(Some(ItemKind::Mushroom));
    }
    Ok(None)
}

/// Builds worlds. Consumed by [`build`](WorldBuilder::build).
pub struct WorldBuilder {
    services: Services,
    gravity: (f32, f32),
}

impl WorldBuilder {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            gravity: GRAVITY,
        }
    }

    pub fn gravity(mut self, x: f32, y: f32) -> Self {
        self.gravity = (x, y);
        self
    }

    pub fn build(self, level: &LevelDescriptor) -> Result<GameWorld, BuildError> {
        for layer in REQUIRED_LAYERS {
            if level.layer(layer).is_none() {
                return Err(BuildError::MissingLayer {
                    layer: layer.to_owned(),
                });
            }
        }
        for name in level.layers.keys() {
            if !REQUIRED_LAYERS.contains(&name.as_str()) {
                warn!(layer = %name, "ignoring unknown layer");
            }
        }

        let mut physics = PhysicsWorld::new(self.gravity.0, self.gravity.1);
        let mut entities = Arena::new();

        for (layer, category) in [(GROUND_LAYER, Category::Ground), (OBJECTS_LAYER, Category::Object)] {
            for (index, object) in level.layer(layer).unwrap_or_default().iter().enumerate() {
                let rect = rect_of(layer, index, object)?;
                let def = BodyDef::fixed(rect.centre).with_fixture(FixtureDef::new(
                    FixtureShape::Box {
                        half_width: rect.half_width,
                        half_height: rect.half_height,
                    },
                    category,
                ));
                physics.create_body(&def, None);
            }
        }

        for (index, object) in level.layer(BRICKS_LAYER).unwrap_or_default().iter().enumerate() {
            let rect = rect_of(BRICKS_LAYER, index, object)?;
            entities.insert_with(|id| {
                Entity::Tile(Tile::spawn_brick(
                    &mut physics,
                    id,
                    rect.centre,
                    rect.half_width,
                    rect.half_height,
                ))
            });
        }

        for (index, object) in level.layer(COINS_LAYER).unwrap_or_default().iter().enumerate() {
            let rect = rect_of(COINS_LAYER, index, object)?;
            let contains = contained_item(COINS_LAYER, index, object)?;
            entities.insert_with(|id| {
                Entity::Tile(Tile::spawn_coin(
                    &mut physics,
                    id,
                    rect.centre,
                    rect.half_width,
                    rect.half_height,
                    contains,
                ))
            });
        }

        for (index, object) in level.layer(WALKERS_LAYER).unwrap_or_default().iter().enumerate() {
            let rect = rect_of(WALKERS_LAYER, index, object)?;
            entities.insert_with(|id| Entity::Enemy(Enemy::spawn_walker(&mut physics, id, rect.centre)));
        }

        for (index, object) in level.layer(SHELLED_LAYER).unwrap_or_default().iter().enumerate() {
            let rect = rect_of(SHELLED_LAYER, index, object)?;
            entities.insert_with(|id| Entity::Enemy(Enemy::spawn_shelled(&mut physics, id, rect.centre)));
        }

        let spawn = level.player_spawn().to_metres();
        let player = entities.insert_with(|id| Entity::Player(Player::spawn(&mut physics, id, spawn)));
        debug!(?player, ?spawn, "player placed");

        let tiles = TileMap::from_placements(&level.tiles);
        info!(
            entities = entities.len(),
            bodies = physics.body_count(),
            tiles = tiles.len(),
            "world built"
        );
        Ok(GameWorld::new(physics, entities, player, self.services, tiles))
    }
}
