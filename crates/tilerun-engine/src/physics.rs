//! rapier2d integration with category-tagged fixtures.
//!
//! The [`PhysicsWorld`] owns the rapier simulation. Gameplay code refers to
//! bodies by [`BodyId`] and never touches rapier sets directly. Each tick:
//!
//! 1. [`PhysicsWorld::step`] advances rapier by the fixed dt.
//! 2. Collision-started events are resolved to [`Contact`]s carrying each
//!    fixture's [`Category`] and owning [`EntityId`], sorted deterministically.
//! 3. The contact callback runs *while the step is still in progress*. It only
//!    receives a [`BodyControl`], which exposes state changes (velocity,
//!    impulses, collision filters) but no way to create or destroy bodies.
//! 4. After `step` returns, the caller may create and destroy bodies again.
//!
//! Every structural operation is appended to a log tagged with whether a step
//! was running, so tests can verify the ordering rule over whole traces.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Together with the fixed
//! timestep and sorted contact delivery, a tick is reproducible on the same
//! platform.

use std::num::NonZeroUsize;

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};
use tilerun_arena::handle::EntityId;
use tracing::{debug, trace, warn};

use crate::category::{inert_groups, interaction_groups, Category};

/// Level data is authored in pixels; physics runs in metres.
pub const PIXELS_PER_METRE: f32 = 100.0;

/// Default world gravity in m/s².
pub const GRAVITY: (f32, f32) = (0.0, -10.0);

/// Mass given to every dynamic body regardless of fixture area.
const BODY_MASS: f32 = 1.0;

/// Convert a pixel length to metres.
#[inline]
pub fn px(value: f32) -> f32 {
    value / PIXELS_PER_METRE
}

/// Handle to a rigid body owned by the [`PhysicsWorld`].
pub type BodyId = RigidBodyHandle;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// 2D position in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate, up is positive.
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D velocity in metres per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// Horizontal speed.
    pub dx: f32,
    /// Vertical speed, up is positive.
    pub dy: f32,
}

impl Velocity {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }
}

/// How rapier treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Simulated, affected by gravity and contacts.
    Dynamic,
    /// Immovable terrain and tiles.
    Static,
}

/// Fixture geometry, relative to the fixture offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FixtureShape {
    /// Axis-aligned box given by half-extents.
    Box { half_width: f32, half_height: f32 },
    /// Circle centred on the fixture offset.
    Circle { radius: f32 },
    /// Thin edge between two points.
    Segment { from: Position, to: Position },
}

/// One fixture attached to a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDef {
    /// Geometry in metres.
    pub shape: FixtureShape,
    /// Offset of the fixture from the body origin.
    pub offset: Position,
    /// Role in collision filtering and dispatch.
    pub category: Category,
    /// Bounciness; 0 absorbs, 1 keeps speed.
    pub restitution: f32,
}

impl FixtureDef {
    pub fn new(shape: FixtureShape, category: Category) -> Self {
        Self {
            shape,
            offset: Position::default(),
            category,
            restitution: 0.0,
        }
    }

    pub fn offset(mut self, x: f32, y: f32) -> Self {
        self.offset = Position::new(x, y);
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

/// Everything needed to create a body and its fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDef {
    /// Dynamic or static.
    pub kind: BodyKind,
    /// Initial body origin.
    pub position: Position,
    /// Initial linear velocity. Ignored for static bodies.
    pub velocity: Velocity,
    /// Fixtures in attachment order.
    pub fixtures: Vec<FixtureDef>,
    /// Disabled bodies are kept but skipped by the simulation.
    pub enabled: bool,
}

impl BodyDef {
    pub fn dynamic(position: Position) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position,
            velocity: Velocity::default(),
            fixtures: Vec::new(),
            enabled: true,
        }
    }

    pub fn fixed(position: Position) -> Self {
        Self {
            kind: BodyKind::Static,
            ..Self::dynamic(position)
        }
    }

    pub fn with_fixture(mut self, fixture: FixtureDef) -> Self {
        self.fixtures.push(fixture);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Contacts and the structural log
// ---------------------------------------------------------------------------

/// One side of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureRef {
    /// Category of the touching fixture.
    pub category: Category,
    /// Entity that owns the fixture's body, if any.
    pub owner: Option<EntityId>,
    /// Body the fixture is attached to.
    pub body: BodyId,
}

impl FixtureRef {
    fn sort_key(&self) -> (u64, u32, u32) {
        (
            self.owner.map_or(u64::MAX, EntityId::to_raw),
            self.category.bits().bits(),
            self.body.into_raw_parts().0,
        )
    }
}

/// A contact that began during the last step. Side order is arbitrary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// One side.
    pub a: FixtureRef,
    /// The other side.
    pub b: FixtureRef,
}

/// Kind of structural change to the rapier world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralKind {
    /// A body and its fixtures were added.
    Created,
    /// A body and its fixtures were removed.
    Destroyed,
}

/// A logged body creation or destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralOp {
    /// Creation or destruction.
    pub kind: StructuralKind,
    /// The body affected.
    pub body: BodyId,
    /// Whether a step was in progress when the operation ran.
    pub during_step: bool,
}

fn owner_tag(owner: Option<EntityId>) -> u128 {
    owner.map_or(0, |id| id.to_raw() as u128 + 1)
}

fn owner_from_tag(tag: u128) -> Option<EntityId> {
    (tag != 0).then(|| EntityId::from_raw((tag - 1) as u64))
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Owns rapier2d simulation state.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    stepping: bool,
    structural_log: Vec<StructuralOp>,
}

impl PhysicsWorld {
    /// Create a physics world with the given gravity vector.
    pub fn new(gravity_x: f32, gravity_y: f32) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity_x, gravity_y],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            stepping: false,
            structural_log: Vec::new(),
        }
    }

    /// Create a physics world with the platformer's standard gravity.
    pub fn with_default_gravity() -> Self {
        Self::new(GRAVITY.0, GRAVITY.1)
    }

    /// Configure solver effort. Zero velocity iterations are clamped to one.
    pub fn set_solver_iterations(&mut self, velocity_iterations: usize, position_iterations: usize) {
        self.integration_params.num_solver_iterations =
            NonZeroUsize::new(velocity_iterations).unwrap_or(NonZeroUsize::MIN);
        self.integration_params.num_internal_pgs_iterations = position_iterations;
    }

    /// Create a body and its fixtures. Fixtures are tagged with `owner`.
    pub fn create_body(&mut self, def: &BodyDef, owner: Option<EntityId>) -> BodyId {
        let translation = vector![def.position.x, def.position.y];
        let rb = match def.kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .translation(translation)
                .linvel(vector![def.velocity.dx, def.velocity.dy])
                .additional_mass(BODY_MASS)
                .lock_rotations(),
            BodyKind::Static => RigidBodyBuilder::fixed().translation(translation),
        }
        .enabled(def.enabled)
        .build();

        let body = self.rigid_body_set.insert(rb);

        for fixture in &def.fixtures {
            let builder = match &fixture.shape {
                FixtureShape::Box {
                    half_width,
                    half_height,
                } => ColliderBuilder::cuboid(*half_width, *half_height),
                FixtureShape::Circle { radius } => ColliderBuilder::ball(*radius),
                FixtureShape::Segment { from, to } => {
                    ColliderBuilder::segment(point![from.x, from.y], point![to.x, to.y])
                }
            };
            let collider = builder
                .translation(vector![fixture.offset.x, fixture.offset.y])
                .density(0.0)
                .restitution(fixture.restitution)
                .sensor(fixture.category.is_sensor())
                .collision_groups(interaction_groups(fixture.category))
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .user_data(owner_tag(owner))
                .build();
            self.collider_set
                .insert_with_parent(collider, body, &mut self.rigid_body_set);
        }
        // Impulses applied before the first step need a valid mass.
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.recompute_mass_properties_from_colliders(&self.collider_set);
        }

        self.log_structural(StructuralKind::Created, body);
        body
    }

    /// Destroy a body and its fixtures.
    ///
    /// Returns `false` if the body was already gone; destroying twice is a
    /// no-op.
    pub fn destroy_body(&mut self, body: BodyId) -> bool {
        let removed = self
            .rigid_body_set
            .remove(
                body,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some();
        if removed {
            self.log_structural(StructuralKind::Destroyed, body);
        }
        removed
    }

    /// Step the simulation and hand begun contacts to `on_contacts`.
    ///
    /// The callback runs before the step is considered finished: it receives
    /// a [`BodyControl`] rather than the world, so it cannot create or destroy
    /// bodies. Returns the number of contacts delivered.
    pub fn step<F>(&mut self, dt: f32, on_contacts: F) -> usize
    where
        F: FnOnce(&[Contact], &mut BodyControl<'_>),
    {
        self.integration_params.dt = dt;
        self.stepping = true;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut contacts = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                match (self.fixture_ref(h1), self.fixture_ref(h2)) {
                    (Some(a), Some(b)) => contacts.push(Contact { a, b }),
                    _ => warn!(?h1, ?h2, "contact references a missing or untagged collider"),
                }
            }
        }

        // rapier's channel order is not stable across runs.
        contacts.sort_by_key(|c| {
            let (ka, kb) = (c.a.sort_key(), c.b.sort_key());
            (ka.min(kb), ka.max(kb))
        });
        trace!(count = contacts.len(), "contacts collected");

        let delivered = contacts.len();
        on_contacts(&contacts, &mut BodyControl { world: self });
        self.stepping = false;
        delivered
    }

    /// State-only access, for code that must not restructure the world.
    pub fn control(&mut self) -> BodyControl<'_> {
        BodyControl { world: self }
    }

    /// Current body translation.
    pub fn position(&self, body: BodyId) -> Option<Position> {
        self.rigid_body_set.get(body).map(|rb| {
            let t = rb.translation();
            Position::new(t.x, t.y)
        })
    }

    /// Current body linear velocity.
    pub fn velocity(&self, body: BodyId) -> Option<Velocity> {
        self.rigid_body_set.get(body).map(|rb| {
            let v = rb.linvel();
            Velocity::new(v.x, v.y)
        })
    }

    /// Categories of all fixtures attached to `body`, in attachment order.
    pub fn fixture_categories(&self, body: BodyId) -> Vec<Category> {
        self.colliders_of(body)
            .into_iter()
            .filter_map(|h| self.collider_set.get(h))
            .filter_map(|c| Category::from_bits(c.collision_groups().memberships.bits()))
            .collect()
    }

    /// Whether any fixture of `body` still collides with something.
    pub fn collides_with_anything(&self, body: BodyId) -> bool {
        self.colliders_of(body)
            .into_iter()
            .filter_map(|h| self.collider_set.get(h))
            .any(|c| c.collision_groups().filter != Group::NONE)
    }

    /// Whether a sensor fixture of `body` in `sensor` category currently
    /// overlaps anything its mask admits. Updated by each step.
    pub fn sensor_touching(&self, body: BodyId, sensor: Category) -> bool {
        self.colliders_of(body)
            .into_iter()
            .filter(|h| {
                self.collider_set.get(*h).is_some_and(|c| {
                    c.is_sensor() && c.collision_groups().memberships.bits() == sensor.bits().bits()
                })
            })
            .any(|h| {
                self.narrow_phase
                    .intersection_pairs_with(h)
                    .any(|(_, _, intersecting)| intersecting)
            })
    }

    pub fn has_body(&self, body: BodyId) -> bool {
        self.rigid_body_set.contains(body)
    }

    pub fn is_enabled(&self, body: BodyId) -> bool {
        self.rigid_body_set.get(body).is_some_and(|rb| rb.is_enabled())
    }

    /// Number of bodies currently in the world.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Whether a step (including its contact callback) is in progress.
    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// Every body creation and destruction so far.
    pub fn structural_log(&self) -> &[StructuralOp] {
        &self.structural_log
    }

    fn log_structural(&mut self, kind: StructuralKind, body: BodyId) {
        debug!(?kind, ?body, during_step = self.stepping, "structural change");
        self.structural_log.push(StructuralOp {
            kind,
            body,
            during_step: self.stepping,
        });
    }

    fn colliders_of(&self, body: BodyId) -> Vec<ColliderHandle> {
        self.rigid_body_set
            .get(body)
            .map(|rb| rb.colliders().to_vec())
            .unwrap_or_default()
    }

    fn fixture_ref(&self, handle: ColliderHandle) -> Option<FixtureRef> {
        let collider = self.collider_set.get(handle)?;
        let category = Category::from_bits(collider.collision_groups().memberships.bits())?;
        Some(FixtureRef {
            category,
            owner: owner_from_tag(collider.user_data),
            body: collider.parent()?,
        })
    }
}

// ---------------------------------------------------------------------------
// BodyControl
// ---------------------------------------------------------------------------

/// State-only view of the physics world.
///
/// Handed to contact reactions and per-entity updates. Missing bodies are
/// ignored so reactions on already-destroyed bodies stay harmless.
pub struct BodyControl<'w> {
    world: &'w mut PhysicsWorld,
}

impl BodyControl<'_> {
    pub fn position(&self, body: BodyId) -> Option<Position> {
        self.world.position(body)
    }

    pub fn velocity(&self, body: BodyId) -> Option<Velocity> {
        self.world.velocity(body)
    }

    pub fn sensor_touching(&self, body: BodyId, sensor: Category) -> bool {
        self.world.sensor_touching(body, sensor)
    }

    pub fn set_velocity(&mut self, body: BodyId, velocity: Velocity) {
        if let Some(rb) = self.world.rigid_body_set.get_mut(body) {
            rb.set_linvel(vector![velocity.dx, velocity.dy], true);
        }
    }

    pub fn apply_impulse(&mut self, body: BodyId, dx: f32, dy: f32) {
        if let Some(rb) = self.world.rigid_body_set.get_mut(body) {
            rb.apply_impulse(vector![dx, dy], true);
        }
    }

    /// Re-tag every fixture of `body` in category `from` as `to`, with `to`'s
    /// collision mask.
    pub fn set_fixture_category(&mut self, body: BodyId, from: Category, to: Category) {
        for handle in self.world.colliders_of(body) {
            if let Some(collider) = self.world.collider_set.get_mut(handle) {
                if collider.collision_groups().memberships.bits() == from.bits().bits() {
                    collider.set_collision_groups(interaction_groups(to));
                }
            }
        }
    }

    /// Stop every fixture of `body` from colliding with anything.
    pub fn clear_collision_masks(&mut self, body: BodyId) {
        for handle in self.world.colliders_of(body) {
            if let Some(collider) = self.world.collider_set.get_mut(handle) {
                let category = Category::from_bits(collider.collision_groups().memberships.bits())
                    .unwrap_or(Category::None);
                collider.set_collision_groups(inert_groups(category));
            }
        }
    }

    pub fn is_enabled(&self, body: BodyId) -> bool {
        self.world.is_enabled(body)
    }

    pub fn set_enabled(&mut self, body: BodyId, enabled: bool) {
        if let Some(rb) = self.world.rigid_body_set.get_mut(body) {
            rb.set_enabled(enabled);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
