//! The player character.
//!
//! State is derived from body velocity every tick, with DEAD and GROWING
//! taking priority. Growing and shrinking swap the body for a taller or
//! shorter one; the swap is flagged during the contact and carried out by
//! [`Player::resolve_structural`] once the step has finished.

use serde::{Deserialize, Serialize};
use tilerun_arena::handle::EntityId;
use tracing::debug;

use super::enemy::{kick_speed, Enemy};
use super::{has_elapsed, Context};
use crate::category::Category;
use crate::physics::{px, BodyControl, BodyDef, BodyId, FixtureDef, FixtureShape, PhysicsWorld, Position};
use crate::services::SoundEvent;

/// Length of the grow animation.
pub const GROW_ANIMATION_SECS: f32 = 0.8;
/// How long a dead player lingers before the round is over.
pub const ROUND_OVER_SECS: f32 = 3.0;
/// Upward impulse of a jump from rest.
pub const JUMP_IMPULSE: f32 = 4.0;
/// Sideways impulse per tick while a direction is held.
pub const RUN_IMPULSE: f32 = 0.1;
/// Run impulses stop once horizontal speed exceeds this.
pub const MAX_RUN_SPEED: f32 = 2.0;
/// Upward knock a dying player receives.
pub const DEATH_IMPULSE: f32 = 4.0;

const BODY_RADIUS_PX: f32 = 6.0;
/// Offset of the second body circle of a grown player.
const LOWER_CIRCLE_PX: f32 = -14.0;
/// Height gained when the body is rebuilt grown.
const GROW_LIFT_PX: f32 = 10.0;
const SENSOR_HALF_WIDTH_PX: f32 = 2.0;
const HEAD_SENSOR_PX: f32 = 7.0;
/// How far the foot sensor reaches below the lowest circle.
const FOOT_REACH_PX: f32 = 1.0;
/// Below this vertical speed the player counts as resting.
const REST_SPEED: f32 = 0.01;

/// Logical player state, re-derived every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// At rest.
    Standing,
    /// Moving sideways on the ground.
    Running,
    /// Rising, or past the apex of a jump.
    Jumping,
    /// Dropping without having jumped.
    Falling,
    /// Playing the grow animation.
    Growing,
    /// Terminal.
    Dead,
}

/// Controller state for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Run left.
    pub left: bool,
    /// Run right.
    pub right: bool,
    /// Jump, if standing on something.
    pub jump: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reshape {
    Grow,
    Shrink,
}

/// The player entity: a body plus the state machine driving it.
#[derive(Debug)]
pub struct Player {
    body: BodyId,
    position: Position,
    state: PlayerState,
    state_time: f32,
    facing_right: bool,
    grown: bool,
    growing: bool,
    dead: bool,
    reshape: Option<Reshape>,
}

fn sensor(y_px: f32, category: Category) -> FixtureDef {
    FixtureDef::new(
        FixtureShape::Segment {
            from: Position::new(px(-SENSOR_HALF_WIDTH_PX), px(y_px)),
            to: Position::new(px(SENSOR_HALF_WIDTH_PX), px(y_px)),
        },
        category,
    )
}

fn body_circle(y_px: f32) -> FixtureDef {
    FixtureDef::new(
        FixtureShape::Circle {
            radius: px(BODY_RADIUS_PX),
        },
        Category::Player,
    )
    .offset(0.0, px(y_px))
}

/// One circle with a foot sensor below and a head sensor above.
pub fn small_body(position: Position) -> BodyDef {
    BodyDef::dynamic(position)
        .with_fixture(body_circle(0.0))
        .with_fixture(sensor(-BODY_RADIUS_PX - FOOT_REACH_PX, Category::PlayerFoot))
        .with_fixture(sensor(HEAD_SENSOR_PX, Category::PlayerHead))
}

/// Two stacked circles; the foot sensor sits under the lower one.
pub fn grown_body(position: Position) -> BodyDef {
    BodyDef::dynamic(position)
        .with_fixture(body_circle(0.0))
        .with_fixture(body_circle(LOWER_CIRCLE_PX))
        .with_fixture(sensor(
            LOWER_CIRCLE_PX - BODY_RADIUS_PX - FOOT_REACH_PX,
            Category::PlayerFoot,
        ))
        .with_fixture(sensor(HEAD_SENSOR_PX, Category::PlayerHead))
}

impl Player {
    /// Create a small player and its body at `position` (metres).
    pub fn spawn(physics: &mut PhysicsWorld, id: EntityId, position: Position) -> Self {
        let body = physics.create_body(&small_body(position), Some(id));
        Self {
            body,
            position,
            state: PlayerState::Standing,
            state_time: 0.0,
            facing_right: true,
            grown: false,
            growing: false,
            dead: false,
            reshape: None,
        }
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Seconds spent in the current state.
    pub fn state_time(&self) -> f32 {
        self.state_time
    }

    pub fn is_grown(&self) -> bool {
        self.grown
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn facing_right(&self) -> bool {
        self.facing_right
    }

    /// Whether a body swap is waiting for the structural pass.
    pub fn has_pending_reshape(&self) -> bool {
        self.reshape.is_some()
    }

    /// True once the player has been dead for [`ROUND_OVER_SECS`].
    pub fn is_round_over(&self) -> bool {
        self.state == PlayerState::Dead && has_elapsed(self.state_time, ROUND_OVER_SECS)
    }

    /// Apply controller input as impulses. Runs before the step.
    ///
    /// Jumping needs a resting body and a foot sensor on terrain, so the
    /// apex of a jump is not a second take-off point.
    pub fn apply_input(&self, input: PlayerInput, bodies: &mut BodyControl<'_>) {
        if self.dead {
            return;
        }
        let Some(v) = bodies.velocity(self.body) else {
            return;
        };
        let grounded = bodies.sensor_touching(self.body, Category::PlayerFoot);
        if input.jump && grounded && v.dy.abs() < REST_SPEED {
            bodies.apply_impulse(self.body, 0.0, JUMP_IMPULSE);
        }
        if input.right && v.dx <= MAX_RUN_SPEED {
            bodies.apply_impulse(self.body, RUN_IMPULSE, 0.0);
        }
        if input.left && v.dx >= -MAX_RUN_SPEED {
            bodies.apply_impulse(self.body, -RUN_IMPULSE, 0.0);
        }
    }

    /// Power up. A grown player only hears the sound again.
    pub fn grow(&mut self, ctx: &mut Context<'_, '_>) {
        if self.dead {
            return;
        }
        if !self.grown {
            self.grown = true;
            self.growing = true;
            self.reshape = Some(Reshape::Grow);
            debug!("player growing");
        }
        ctx.services.play(SoundEvent::PowerUpConsumed);
    }

    /// Contact with an enemy's body.
    pub fn hit(&mut self, enemy: &mut Enemy, ctx: &mut Context<'_, '_>) {
        if self.dead {
            return;
        }
        if enemy.is_shell_idle() {
            let speed = kick_speed(self.current_x(ctx.bodies), enemy.current_x(ctx.bodies));
            enemy.kick(speed, ctx);
            return;
        }
        if enemy.is_harmless() {
            return;
        }
        if self.grown {
            self.grown = false;
            self.growing = false;
            self.reshape = Some(Reshape::Shrink);
            ctx.services.play(SoundEvent::Shrink);
            debug!("player shrinking");
        } else {
            self.kill(ctx);
        }
    }

    /// Kill the player: it stops colliding and is knocked upward.
    pub fn kill(&mut self, ctx: &mut Context<'_, '_>) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.reshape = None;
        ctx.bodies.clear_collision_masks(self.body);
        ctx.bodies.apply_impulse(self.body, 0.0, DEATH_IMPULSE);
        ctx.services.play(SoundEvent::Death);
        debug!("player died");
    }

    pub(crate) fn current_x(&self, bodies: &BodyControl<'_>) -> f32 {
        bodies.position(self.body).map_or(self.position.x, |p| p.x)
    }

    pub(crate) fn update(&mut self, dt: f32, ctx: &mut Context<'_, '_>) {
        if let Some(p) = ctx.bodies.position(self.body) {
            self.position = p;
        }
        if !self.dead && self.position.y <= 0.0 {
            self.kill(ctx);
        }

        let v = ctx.bodies.velocity(self.body).unwrap_or_default();
        let next = self.derive_state(v.dx, v.dy);
        if v.dx < 0.0 {
            self.facing_right = false;
        } else if v.dx > 0.0 {
            self.facing_right = true;
        }

        self.state_time = if next == self.state { self.state_time + dt } else { 0.0 };
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "player state");
        }
        self.state = next;

        if self.state == PlayerState::Growing && has_elapsed(self.state_time, GROW_ANIMATION_SECS) {
            self.growing = false;
        }
    }

    /// Called before `self.state` is overwritten, so it still holds the
    /// previous tick's state: a jump keeps JUMPING through its apex.
    fn derive_state(&self, vx: f32, vy: f32) -> PlayerState {
        if self.dead {
            PlayerState::Dead
        } else if self.growing {
            PlayerState::Growing
        } else if vy > REST_SPEED || (vy < -REST_SPEED && self.state == PlayerState::Jumping) {
            PlayerState::Jumping
        } else if vy < -REST_SPEED {
            PlayerState::Falling
        } else if vx != 0.0 {
            PlayerState::Running
        } else {
            PlayerState::Standing
        }
    }

    pub(crate) fn resolve_structural(&mut self, id: EntityId, physics: &mut PhysicsWorld) {
        let Some(reshape) = self.reshape.take() else {
            return;
        };
        let here = physics.position(self.body).unwrap_or(self.position);
        physics.destroy_body(self.body);
        let def = match reshape {
            Reshape::Grow => grown_body(Position::new(here.x, here.y + px(GROW_LIFT_PX))),
            Reshape::Shrink => small_body(here),
        };
        self.body = physics.create_body(&def, Some(id));
        self.position = def.position;
        debug!(?reshape, body = ?self.body, "player body rebuilt");
    }
}
