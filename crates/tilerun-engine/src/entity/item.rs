//! Power-up items released from coin blocks.

use tilerun_arena::handle::EntityId;
use tracing::debug;

use super::player::Player;
use super::Context;
use crate::category::Category;
use crate::physics::{px, BodyDef, BodyId, FixtureDef, FixtureShape, PhysicsWorld, Position, Velocity};
use crate::spawn::{ItemKind, SpawnRequest};

pub const ITEM_RADIUS_PX: f32 = 6.0;
/// Horizontal speed an item slides at.
pub const ITEM_SPEED: f32 = 0.7;

#[derive(Debug)]
pub struct Item {
    kind: ItemKind,
    body: Option<BodyId>,
    position: Position,
    velocity: Velocity,
    used: bool,
    to_destroy: bool,
    destroyed: bool,
}

pub fn item_body(position: Position) -> BodyDef {
    BodyDef::dynamic(position).with_fixture(FixtureDef::new(
        FixtureShape::Circle {
            radius: px(ITEM_RADIUS_PX),
        },
        Category::Item,
    ))
}

impl Item {
    /// Materialise a spawn request. Only called outside a step.
    pub fn spawn(physics: &mut PhysicsWorld, id: EntityId, request: &SpawnRequest) -> Self {
        let body = physics.create_body(&item_body(request.position), Some(id));
        debug!(?id, kind = ?request.item, "item spawned");
        Self {
            kind: request.item,
            body: Some(body),
            position: request.position,
            velocity: Velocity::new(ITEM_SPEED, 0.0),
            used: false,
            to_destroy: false,
            destroyed: false,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn body(&self) -> Option<BodyId> {
        self.body
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_removable(&self) -> bool {
        self.destroyed
    }

    pub fn reverse_velocity(&mut self, x: bool, y: bool) {
        if x {
            self.velocity.dx = -self.velocity.dx;
        }
        if y {
            self.velocity.dy = -self.velocity.dy;
        }
    }

    /// Apply the item's effect to `player`. An item works once.
    pub fn use_on(&mut self, player: &mut Player, ctx: &mut Context<'_, '_>) {
        if self.used || self.to_destroy {
            return;
        }
        self.used = true;
        match self.kind {
            ItemKind::Mushroom => player.grow(ctx),
        }
        self.to_destroy = true;
    }

    pub(crate) fn update(&mut self, ctx: &mut Context<'_, '_>) {
        let Some(body) = self.body else {
            return;
        };
        if let Some(p) = ctx.bodies.position(body) {
            self.position = p;
        }
        if self.position.y < 0.0 {
            self.to_destroy = true;
        }
        if self.to_destroy {
            return;
        }
        // Keep gravity's vertical speed, impose the horizontal slide.
        let vy = ctx.bodies.velocity(body).map_or(0.0, |v| v.dy);
        ctx.bodies
            .set_velocity(body, Velocity::new(self.velocity.dx, vy));
    }

    pub(crate) fn resolve_structural(&mut self, physics: &mut PhysicsWorld) {
        if !self.to_destroy || self.destroyed {
            return;
        }
        if let Some(body) = self.body.take() {
            physics.destroy_body(body);
        }
        self.destroyed = true;
        debug!(kind = ?self.kind, "item destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::testing::Harness;
    use crate::physics::StructuralKind;
    use crate::services::SoundEvent;

    fn mushroom(h: &mut Harness, y: f32) -> Item {
        let request = SpawnRequest {
            position: Position::new(1.0, y),
            item: ItemKind::Mushroom,
        };
        Item::spawn(&mut h.physics, EntityId::new(5, 0), &request)
    }

    #[test]
    fn use_grows_player_once() {
        let mut h = Harness::new();
        let mut player = Player::spawn(&mut h.physics, EntityId::new(0, 0), Position::new(1.0, 0.5));
        let mut item = mushroom(&mut h, 0.5);

        h.run(|ctx| item.use_on(&mut player, ctx));
        h.run(|ctx| item.use_on(&mut player, ctx));
        assert!(player.is_grown());
        assert_eq!(h.recorder.count(SoundEvent::PowerUpConsumed), 1);

        item.resolve_structural(&mut h.physics);
        item.resolve_structural(&mut h.physics);
        assert!(item.is_removable());
        let destroys = h
            .physics
            .structural_log()
            .iter()
            .filter(|op| op.kind == StructuralKind::Destroyed)
            .count();
        assert_eq!(destroys, 1, "item body destroyed exactly once");
    }

    #[test]
    fn update_slides_horizontally() {
        let mut h = Harness::new();
        let mut item = mushroom(&mut h, 0.5);
        item.reverse_velocity(true, false);
        h.run(|ctx| item.update(ctx));
        let v = h.physics.velocity(item.body().unwrap()).unwrap();
        assert_eq!(v.dx, -ITEM_SPEED);
    }

    #[test]
    fn falling_out_of_world_removes_item() {
        let mut h = Harness::new();
        let mut item = mushroom(&mut h, -0.05);
        h.run(|ctx| item.update(ctx));
        item.resolve_structural(&mut h.physics);
        assert!(item.is_removable());
        assert!(item.body().is_none());
    }
}
