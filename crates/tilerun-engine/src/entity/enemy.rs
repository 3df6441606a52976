//! Patrolling enemies: walkers and shelled enemies.
//!
//! Both variants share one struct: a velocity intent written to the body on
//! every update, a state timer, and flags for deferred body destruction and
//! removal. Behaviour differs per [`EnemyState`] variant.

use serde::{Deserialize, Serialize};
use tilerun_arena::handle::EntityId;
use tracing::debug;

use super::{has_elapsed, Context, EntityKind};
use crate::category::Category;
use crate::physics::{
    px, BodyControl, BodyDef, BodyId, FixtureDef, FixtureShape, PhysicsWorld, Position, Velocity,
};
use crate::services::SoundEvent;

/// Velocity intent every enemy starts with.
pub const INITIAL_VELOCITY: Velocity = Velocity { dx: -1.0, dy: -2.0 };
/// Horizontal shell speed after a kick.
pub const KICK_SPEED: f32 = 2.0;
/// Stomped walkers stay visible this long.
pub const STOMP_GRACE_SECS: f32 = 1.0;
/// An idle shell starts walking again after this long.
pub const SHELL_REVERT_SECS: f32 = 5.0;
/// Speed a shell walks off with after reverting.
pub const SHELL_REVERT_SPEED: f32 = 1.0;
/// Knocked-out enemies are removed after this long.
pub const DEAD_LINGER_SECS: f32 = 5.0;
/// Upward knock from a moving shell.
pub const KNOCKOUT_IMPULSE: f32 = 5.0;
/// Visual spin of a knocked-out enemy.
pub const DEAD_SPIN_DEGREES_PER_TICK: f32 = 3.0;

const BODY_RADIUS_PX: f32 = 6.0;
const HEAD_HALF_WIDTH_PX: f32 = 4.0;
const HEAD_BOTTOM_PX: f32 = 3.0;
const HEAD_TOP_PX: f32 = 8.0;
const WALKER_HEAD_RESTITUTION: f32 = 0.5;
const SHELLED_HEAD_RESTITUTION: f32 = 1.5;

/// Kick direction: rightward when the kicker is left of (or level with) the
/// enemy.
pub fn kick_speed(kicker_x: f32, enemy_x: f32) -> f32 {
    if kicker_x <= enemy_x {
        KICK_SPEED
    } else {
        -KICK_SPEED
    }
}

/// States of an enemy that flattens when stomped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalkerState {
    /// Patrolling.
    Alive,
    /// Flattened; removed after [`STOMP_GRACE_SECS`].
    Stomped,
    /// Knocked out by a moving shell.
    Dead,
}

/// States of an enemy that retreats into its shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShelledState {
    /// Patrolling.
    Walking,
    /// Tucked in and still; a touch kicks it.
    ShellIdle,
    /// Kicked; knocks out other enemies.
    ShellMoving,
    /// Knocked out by another moving shell.
    Dead,
}

/// Variant plus its logical state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyState {
    Walker(WalkerState),
    Shelled(ShelledState),
}

impl EnemyState {
    fn is_shell_moving(self) -> bool {
        self == EnemyState::Shelled(ShelledState::ShellMoving)
    }

    fn is_dead(self) -> bool {
        matches!(
            self,
            EnemyState::Walker(WalkerState::Dead) | EnemyState::Shelled(ShelledState::Dead)
        )
    }
}

/// State of an enemy captured before an enemy-enemy contact is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemySnapshot {
    /// State at the moment of contact.
    pub state: EnemyState,
}

/// A walker or shelled enemy.
#[derive(Debug)]
pub struct Enemy {
    body: Option<BodyId>,
    position: Position,
    velocity: Velocity,
    state: EnemyState,
    previous: EnemyState,
    state_time: f32,
    rotation_degrees: f32,
    destroy_body: bool,
    removable: bool,
}

fn enemy_body(position: Position, head_restitution: f32) -> BodyDef {
    let head_half_height = (HEAD_TOP_PX - HEAD_BOTTOM_PX) / 2.0;
    BodyDef::dynamic(position)
        .with_fixture(FixtureDef::new(
            FixtureShape::Circle {
                radius: px(BODY_RADIUS_PX),
            },
            Category::Enemy,
        ))
        .with_fixture(
            FixtureDef::new(
                FixtureShape::Box {
                    half_width: px(HEAD_HALF_WIDTH_PX),
                    half_height: px(head_half_height),
                },
                Category::EnemyHead,
            )
            .offset(0.0, px(HEAD_BOTTOM_PX + head_half_height))
            .restitution(head_restitution),
        )
        .disabled()
}

impl Enemy {
    /// A walker whose body starts disabled until woken.
    pub fn spawn_walker(physics: &mut PhysicsWorld, id: EntityId, position: Position) -> Self {
        let def = enemy_body(position, WALKER_HEAD_RESTITUTION);
        Self::with_body(
            physics.create_body(&def, Some(id)),
            position,
            EnemyState::Walker(WalkerState::Alive),
        )
    }

    /// A shelled enemy whose body starts disabled until woken.
    pub fn spawn_shelled(physics: &mut PhysicsWorld, id: EntityId, position: Position) -> Self {
        let def = enemy_body(position, SHELLED_HEAD_RESTITUTION);
        Self::with_body(
            physics.create_body(&def, Some(id)),
            position,
            EnemyState::Shelled(ShelledState::Walking),
        )
    }

    fn with_body(body: BodyId, position: Position, state: EnemyState) -> Self {
        Self {
            body: Some(body),
            position,
            velocity: INITIAL_VELOCITY,
            state,
            previous: state,
            state_time: 0.0,
            rotation_degrees: 0.0,
            destroy_body: false,
            removable: false,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self.state {
            EnemyState::Walker(_) => EntityKind::Walker,
            EnemyState::Shelled(_) => EntityKind::Shelled,
        }
    }

    pub fn body(&self) -> Option<BodyId> {
        self.body
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> EnemyState {
        self.state
    }

    /// Velocity intent written to the body each update.
    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    pub fn state_time(&self) -> f32 {
        self.state_time
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    pub fn facing_right(&self) -> bool {
        self.velocity.dx > 0.0
    }

    pub fn is_removable(&self) -> bool {
        self.removable
    }

    pub fn is_shell_idle(&self) -> bool {
        self.state == EnemyState::Shelled(ShelledState::ShellIdle)
    }

    /// Stomped or dead enemies no longer hurt the player.
    pub fn is_harmless(&self) -> bool {
        self.state == EnemyState::Walker(WalkerState::Stomped) || self.state.is_dead()
    }

    pub fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot { state: self.state }
    }

    pub(crate) fn current_x(&self, bodies: &BodyControl<'_>) -> f32 {
        self.body
            .and_then(|b| bodies.position(b))
            .map_or(self.position.x, |p| p.x)
    }

    /// Flip the chosen components of the velocity intent.
    pub fn reverse_velocity(&mut self, x: bool, y: bool) {
        if x {
            self.velocity.dx = -self.velocity.dx;
        }
        if y {
            self.velocity.dy = -self.velocity.dy;
        }
    }

    /// The player landed on this enemy's head.
    pub fn hit_on_head(&mut self, stomper_x: f32, ctx: &mut Context<'_, '_>) {
        match self.state {
            EnemyState::Walker(WalkerState::Alive) => {
                self.set_state(EnemyState::Walker(WalkerState::Stomped));
                self.destroy_body = true;
                ctx.services.play(SoundEvent::Stomp);
            }
            EnemyState::Shelled(ShelledState::Walking | ShelledState::ShellMoving) => {
                self.set_state(EnemyState::Shelled(ShelledState::ShellIdle));
                self.velocity.dx = 0.0;
                ctx.services.play(SoundEvent::Stomp);
            }
            EnemyState::Shelled(ShelledState::ShellIdle) => {
                let speed = kick_speed(stomper_x, self.current_x(ctx.bodies));
                self.kick(speed, ctx);
            }
            EnemyState::Walker(WalkerState::Stomped | WalkerState::Dead)
            | EnemyState::Shelled(ShelledState::Dead) => {}
        }
    }

    /// Send an idle shell sliding at `speed`.
    pub fn kick(&mut self, speed: f32, ctx: &mut Context<'_, '_>) {
        if !self.is_shell_idle() {
            return;
        }
        self.set_state(EnemyState::Shelled(ShelledState::ShellMoving));
        self.velocity.dx = speed;
        ctx.services.play(SoundEvent::Kick);
    }

    /// Resolve contact with another enemy, judged on its state before either
    /// side reacted.
    pub fn on_enemy_hit(&mut self, other: EnemySnapshot, ctx: &mut Context<'_, '_>) {
        if self.is_harmless() {
            return;
        }
        let mine = self.state.is_shell_moving();
        let theirs = other.state.is_shell_moving();
        match (mine, theirs) {
            (false, true) => self.knock_out(ctx),
            (true, _) => {}
            (false, false) => self.reverse_velocity(true, false),
        }
    }

    /// Defeat by a moving shell: no more collisions, knocked upward.
    pub fn knock_out(&mut self, ctx: &mut Context<'_, '_>) {
        let dead = match self.state {
            EnemyState::Walker(_) => EnemyState::Walker(WalkerState::Dead),
            EnemyState::Shelled(_) => EnemyState::Shelled(ShelledState::Dead),
        };
        self.set_state(dead);
        if let Some(body) = self.body {
            ctx.bodies.clear_collision_masks(body);
            ctx.bodies.apply_impulse(body, 0.0, KNOCKOUT_IMPULSE);
        }
    }

    /// Enable the body once the player comes close.
    pub fn wake(&mut self, bodies: &mut BodyControl<'_>) -> bool {
        match self.body {
            Some(body) if !bodies.is_enabled(body) => {
                bodies.set_enabled(body, true);
                true
            }
            _ => false,
        }
    }

    fn set_state(&mut self, next: EnemyState) {
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "enemy state");
            self.state = next;
        }
    }

    pub(crate) fn update(&mut self, dt: f32, ctx: &mut Context<'_, '_>) {
        if let Some(p) = self.body.and_then(|b| ctx.bodies.position(b)) {
            self.position = p;
        }
        self.state_time = if self.state == self.previous { self.state_time + dt } else { 0.0 };
        self.previous = self.state;

        match self.state {
            EnemyState::Walker(WalkerState::Stomped) => {
                if has_elapsed(self.state_time, STOMP_GRACE_SECS) {
                    self.removable = true;
                }
            }
            EnemyState::Walker(WalkerState::Dead) | EnemyState::Shelled(ShelledState::Dead) => {
                self.rotation_degrees += DEAD_SPIN_DEGREES_PER_TICK;
                if has_elapsed(self.state_time, DEAD_LINGER_SECS) {
                    self.destroy_body = true;
                    self.removable = true;
                }
            }
            EnemyState::Shelled(ShelledState::ShellIdle)
                if has_elapsed(self.state_time, SHELL_REVERT_SECS) =>
            {
                self.set_state(EnemyState::Shelled(ShelledState::Walking));
                self.velocity.dx = SHELL_REVERT_SPEED;
                self.drive(ctx);
            }
            _ => self.drive(ctx),
        }
    }

    fn drive(&mut self, ctx: &mut Context<'_, '_>) {
        if let Some(body) = self.body {
            ctx.bodies.set_velocity(body, self.velocity);
        }
    }

    pub(crate) fn resolve_structural(&mut self, physics: &mut PhysicsWorld) {
        if !self.destroy_body {
            return;
        }
        self.destroy_body = false;
        if let Some(body) = self.body.take() {
            physics.destroy_body(body);
            debug!(?body, "enemy body destroyed");
        }
    }
}
