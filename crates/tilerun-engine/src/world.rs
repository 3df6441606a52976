//! The populated game world and its per-tick passes.
//!
//! [`GameWorld`] owns the physics world, the entity store and the services.
//! The simulation driver calls its passes in a fixed order each tick:
//! [`apply_input`](GameWorld::apply_input), [`step`](GameWorld::step),
//! [`structural_pass`](GameWorld::structural_pass),
//! [`update`](GameWorld::update) and [`wake_enemies`](GameWorld::wake_enemies).

use tilerun_arena::prelude::*;
use tracing::{debug, warn};

use crate::dispatch::{self, DispatchSummary};
use crate::entity::{Context, Entity, Item, Player, PlayerInput};
use crate::physics::{BodyId, Contact, PhysicsWorld};
use crate::services::Services;
use crate::spawn::{SpawnQueue, SpawnRequest};
use crate::tiles::TileMap;
use crate::view::EntityView;

/// What the structural pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralReport {
    /// Entities that left the store, in slot order.
    pub removed: Vec<EntityId>,
    /// Item materialised from the spawn queue, if any.
    pub spawned: Option<EntityId>,
}

/// A level's live state.
pub struct GameWorld {
    physics: PhysicsWorld,
    entities: Arena<Entity>,
    player: EntityId,
    services: Services,
    spawns: SpawnQueue,
    tiles: TileMap,
}

impl GameWorld {
    pub(crate) fn new(
        physics: PhysicsWorld,
        entities: Arena<Entity>,
        player: EntityId,
        services: Services,
        tiles: TileMap,
    ) -> Self {
        Self {
            physics,
            entities,
            player,
            services,
            spawns: SpawnQueue::new(),
            tiles,
        }
    }

    pub fn player_id(&self) -> EntityId {
        self.player
    }

    pub fn player(&self) -> Option<&Player> {
        self.entities.get(self.player).and_then(Entity::as_player)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Live entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The body currently owned by `id`.
    pub fn body_of(&self, id: EntityId) -> Option<BodyId> {
        self.entities.get(id).and_then(Entity::body)
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub(crate) fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn pending_spawns(&self) -> usize {
        self.spawns.len()
    }

    /// Queue an item spawn as a tile reaction would.
    pub fn enqueue_spawn(&mut self, request: SpawnRequest) {
        self.spawns.push(request);
    }

    pub fn is_round_over(&self) -> bool {
        self.player().is_some_and(Player::is_round_over)
    }

    /// Render views of every live entity, in slot order.
    pub fn views(&self) -> Vec<EntityView> {
        self.entities
            .iter()
            .map(|(id, entity)| EntityView::of(id, entity))
            .collect()
    }

    /// Turn controller input into impulses on the player body.
    pub fn apply_input(&mut self, input: PlayerInput) {
        if let Some(Entity::Player(player)) = self.entities.get(self.player) {
            player.apply_input(input, &mut self.physics.control());
        }
    }

    /// Step physics and run contact reactions inside the step.
    ///
    /// Returns the number of contacts delivered and what dispatch did.
    pub fn step(&mut self, dt: f32) -> (usize, DispatchSummary) {
        let Self {
            physics,
            entities,
            services,
            spawns,
            tiles,
            ..
        } = self;
        let mut summary = DispatchSummary::default();
        let contacts = physics.step(dt, |contacts, bodies| {
            let mut ctx = Context {
                bodies,
                services,
                spawns,
                tiles,
            };
            summary = dispatch::dispatch(contacts, entities, &mut ctx);
        });
        (contacts, summary)
    }

    /// Run reactions for contacts that did not come from [`step`](Self::step),
    /// such as a recorded trace.
    pub fn deliver_contacts(&mut self, contacts: &[Contact]) -> DispatchSummary {
        let mut bodies = self.physics.control();
        let mut ctx = Context {
            bodies: &mut bodies,
            services: &mut self.services,
            spawns: &mut self.spawns,
            tiles: &mut self.tiles,
        };
        dispatch::dispatch(contacts, &mut self.entities, &mut ctx)
    }

    /// Resolve everything reactions deferred: body rebuilds and destroys,
    /// entity removals, then at most one queued spawn.
    pub fn structural_pass(&mut self) -> StructuralReport {
        debug_assert!(!self.physics.is_stepping());
        let mut report = StructuralReport::default();

        for id in self.entities.ids() {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.resolve_structural(id, &mut self.physics);
            }
        }

        for id in self.entities.ids() {
            let removable = self.entities.get(id).is_some_and(Entity::is_removable);
            if !removable {
                continue;
            }
            if let Some(entity) = self.entities.remove(id) {
                if let Some(body) = entity.body() {
                    self.physics.destroy_body(body);
                }
                debug!(?id, kind = ?entity.kind(), "entity removed");
                report.removed.push(id);
            }
        }

        if let Some(request) = self.spawns.drain_one() {
            let physics = &mut self.physics;
            let id = self
                .entities
                .insert_with(|id| Entity::Item(Item::spawn(physics, id, &request)));
            report.spawned = Some(id);
        }
        report
    }

    /// Per-entity logical updates, in slot order.
    pub fn update(&mut self, dt: f32) {
        let mut bodies = self.physics.control();
        let mut ctx = Context {
            bodies: &mut bodies,
            services: &mut self.services,
            spawns: &mut self.spawns,
            tiles: &mut self.tiles,
        };
        for (_, entity) in self.entities.iter_mut() {
            entity.update(dt, &mut ctx);
        }
    }

    /// Enable sleeping enemies within `range` metres to the right of the
    /// player. Returns how many woke.
    pub fn wake_enemies(&mut self, range: f32) -> usize {
        let Some(player) = self.player() else {
            warn!("no player; enemies stay asleep");
            return 0;
        };
        let limit = player.position().x + range;
        let mut bodies = self.physics.control();
        let mut woken = 0;
        for (id, entity) in self.entities.iter_mut() {
            if let Entity::Enemy(enemy) = entity {
                if enemy.position().x < limit && enemy.wake(&mut bodies) {
                    debug!(?id, "enemy woke");
                    woken += 1;
                }
            }
        }
        woken
    }
}

impl std::fmt::Debug for GameWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameWorld")
            .field("entities", &self.entities.len())
            .field("bodies", &self.physics.body_count())
            .field("player", &self.player)
            .field("pending_spawns", &self.spawns.len())
            .finish()
    }
}
