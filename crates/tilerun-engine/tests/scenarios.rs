//! End-to-end gameplay scenarios.
//!
//! Most scenarios hand the world a contact directly with
//! [`GameWorld::deliver_contacts`] so the reaction under test is not at the
//! mercy of exact trajectories. Landings and the small-player death run fully
//! on physics.

use tilerun_engine::entity::enemy::KICK_SPEED;
use tilerun_engine::entity::tile::COIN_SCORE;
use tilerun_engine::level::PixelPoint;
use tilerun_engine::prelude::*;
use tilerun_engine::tiles::{Cell, BLANK_COIN_TILE};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Flat ground with a few things far to the right so enemies stay asleep.
fn base_level() -> LevelDescriptor {
    let mut level = LevelDescriptor::empty();
    level
        .push("ground", MapObject::rect(0.0, 0.0, 1600.0, 16.0))
        .push("walkers", MapObject::rect(800.0, 16.0, 16.0, 16.0))
        .push("walkers", MapObject::rect(900.0, 16.0, 16.0, 16.0))
        .push("shelled", MapObject::rect(700.0, 16.0, 16.0, 24.0))
        .push(
            "coins",
            MapObject::rect(112.0, 96.0, 16.0, 16.0).with_property("contains", "mushroom"),
        )
        .push("bricks", MapObject::rect(144.0, 96.0, 16.0, 16.0));
    level.tiles.push(tilerun_engine::level::TilePlacement {
        column: 7,
        row: 6,
        id: 27,
    });
    level
}

fn simulation(level: &LevelDescriptor) -> (Simulation, EventRecorder) {
    let recorder = EventRecorder::new();
    let world = WorldBuilder::new(Services::recording(&recorder))
        .build(level)
        .expect("level builds");
    (Simulation::new(world, TickConfig::default()), recorder)
}

fn ids_of(world: &GameWorld, kind: EntityKind) -> Vec<EntityId> {
    world
        .entities()
        .filter(|(_, e)| e.kind() == kind)
        .map(|(id, _)| id)
        .collect()
}

fn fixture(world: &GameWorld, id: EntityId, category: Category) -> FixtureRef {
    FixtureRef {
        category,
        owner: Some(id),
        body: world.body_of(id).expect("entity owns a body"),
    }
}

fn contact(world: &GameWorld, a: (EntityId, Category), b: (EntityId, Category)) -> Contact {
    Contact {
        a: fixture(world, a.0, a.1),
        b: fixture(world, b.0, b.1),
    }
}

fn enemy_state(world: &GameWorld, id: EntityId) -> EnemyState {
    world
        .entity(id)
        .and_then(Entity::as_enemy)
        .expect("enemy is live")
        .state()
}

/// Grow the player by spawning a mushroom and touching it.
fn grow_player(sim: &mut Simulation, recorder: &EventRecorder) {
    let player = sim.world().player_id();
    let at = sim.world().player().unwrap().position();
    sim.world_mut().enqueue_spawn(SpawnRequest {
        position: Position::new(at.x + 1.0, at.y + 0.5),
        item: ItemKind::Mushroom,
    });
    let item = sim.tick().spawned.expect("queued item spawns next tick");

    let touch = contact(sim.world(), (player, Category::Player), (item, Category::Item));
    sim.world_mut().deliver_contacts(&[touch]);
    let report = sim.tick();
    assert!(report.removed.contains(&item), "used item leaves the store");

    let p = sim.world().player().unwrap();
    assert!(p.is_grown());
    assert!(!p.has_pending_reshape());
    recorder.clear();
}

// ---------------------------------------------------------------------------
// Scenario 1: grown player stomps a walker
// ---------------------------------------------------------------------------

#[test]
fn grown_player_stomps_walker() {
    let (mut sim, recorder) = simulation(&base_level());
    grow_player(&mut sim, &recorder);
    let player = sim.world().player_id();
    let walker = ids_of(sim.world(), EntityKind::Walker)[0];

    let stomp = contact(sim.world(), (walker, Category::EnemyHead), (player, Category::Player));
    sim.world_mut().deliver_contacts(&[stomp]);
    assert_eq!(
        enemy_state(sim.world(), walker),
        EnemyState::Walker(WalkerState::Stomped)
    );
    assert_eq!(recorder.sounds(), vec![SoundEvent::Stomp]);
    assert_eq!(recorder.score(), 0, "stomping awards nothing");

    // Body goes in the first structural pass; the walker stays visible.
    let body = sim.world().body_of(walker);
    assert!(body.is_some());
    sim.tick();
    assert!(sim.world().body_of(walker).is_none());
    let view = sim.views().into_iter().find(|v| v.id == walker).unwrap();
    assert!(view.visible);
    assert_eq!(view.anim, AnimState::Walker(WalkerState::Stomped));

    let mut removed_at = None;
    for n in 2..=90 {
        if sim.tick().removed.contains(&walker) {
            removed_at = Some(n);
            break;
        }
    }
    // Grace elapses on the 61st tick; removal happens on the next one.
    assert_eq!(removed_at, Some(62));
    assert!(sim.world().entity(walker).is_none());
    assert!(sim.world().player().unwrap().is_grown());
}

// ---------------------------------------------------------------------------
// Landing on enemies through physics
// ---------------------------------------------------------------------------

/// Player dropped straight onto an enemy that low blocks hold in place.
fn landing_level(enemy_layer: &str, enemy_height: f32, spawn_y: f32) -> LevelDescriptor {
    let mut level = LevelDescriptor::empty();
    level
        .push("ground", MapObject::rect(0.0, 0.0, 640.0, 16.0))
        .push("objects", MapObject::rect(100.0, 16.0, 14.0, 8.0))
        .push("objects", MapObject::rect(126.0, 16.0, 14.0, 8.0))
        .push(enemy_layer, MapObject::rect(112.0, 16.0, 16.0, enemy_height));
    level.player_spawn = Some(PixelPoint { x: 120.0, y: spawn_y });
    level
}

/// Tick until the enemy leaves `from`; returns the tick it happened on.
fn tick_until_changed(sim: &mut Simulation, enemy: EntityId, from: EnemyState) -> Option<u64> {
    for _ in 0..120 {
        let report = sim.tick();
        if enemy_state(sim.world(), enemy) != from {
            return Some(report.tick);
        }
    }
    None
}

#[test]
fn falling_onto_walker_stomps_it() {
    let (mut sim, recorder) = simulation(&landing_level("walkers", 16.0, 60.0));
    let walker = ids_of(sim.world(), EntityKind::Walker)[0];

    let landed = tick_until_changed(&mut sim, walker, EnemyState::Walker(WalkerState::Alive));
    assert!(landed.is_some(), "player never reached the walker");
    assert_eq!(
        enemy_state(sim.world(), walker),
        EnemyState::Walker(WalkerState::Stomped)
    );
    assert!(!sim.world().player().unwrap().is_dead());
    assert_eq!(recorder.sounds(), vec![SoundEvent::Stomp]);

    sim.run_ticks(90);
    assert!(sim.world().entity(walker).is_none());
    assert!(!sim.world().player().unwrap().is_dead());
    assert_eq!(recorder.count(SoundEvent::Death), 0);
}

#[test]
fn falling_onto_shelled_enemy_tucks_it_in() {
    let (mut sim, recorder) = simulation(&landing_level("shelled", 24.0, 70.0));
    let shell = ids_of(sim.world(), EntityKind::Shelled)[0];

    let landed = tick_until_changed(&mut sim, shell, EnemyState::Shelled(ShelledState::Walking));
    assert!(landed.is_some(), "player never reached the shell");
    assert_eq!(
        enemy_state(sim.world(), shell),
        EnemyState::Shelled(ShelledState::ShellIdle)
    );
    assert!(!sim.world().player().unwrap().is_dead());
    assert_eq!(recorder.sounds(), vec![SoundEvent::Stomp]);
}

// ---------------------------------------------------------------------------
// Scenario 2: small player walks into a walker and dies
// ---------------------------------------------------------------------------

#[test]
fn small_player_dies_on_lateral_contact() {
    let mut level = LevelDescriptor::empty();
    level
        .push("ground", MapObject::rect(0.0, 0.0, 640.0, 16.0))
        .push("walkers", MapObject::rect(192.0, 16.0, 16.0, 16.0));
    let (mut sim, recorder) = simulation(&level);

    let mut died = false;
    for _ in 0..240 {
        sim.tick();
        if sim.world().player().unwrap().is_dead() {
            died = true;
            break;
        }
    }
    assert!(died, "walker should reach the player");

    let player = sim.world().player().unwrap();
    let body = player.body();
    assert_eq!(player.state(), PlayerState::Dead);
    assert!(!sim.world().physics().collides_with_anything(body));
    let vy = sim.world().physics().velocity(body).unwrap().dy;
    assert!(vy > 3.0, "one upward impulse, got vy={vy}");
    assert_eq!(recorder.count(SoundEvent::Death), 1);

    for _ in 0..179 {
        sim.tick();
        assert!(!sim.is_round_over());
    }
    sim.tick();
    assert!(sim.is_round_over());
    assert_eq!(recorder.count(SoundEvent::Death), 1);
}

// ---------------------------------------------------------------------------
// Scenario 3: grown player is hit and shrinks
// ---------------------------------------------------------------------------

#[test]
fn grown_player_shrinks_on_lateral_contact() {
    let (mut sim, recorder) = simulation(&base_level());
    grow_player(&mut sim, &recorder);
    let player = sim.world().player_id();
    let walker = ids_of(sim.world(), EntityKind::Walker)[0];
    let tall_body = sim.world().body_of(player).unwrap();

    // Both body circles touch the walker; only one hit counts.
    let hit = contact(sim.world(), (player, Category::Player), (walker, Category::Enemy));
    let summary = sim.world_mut().deliver_contacts(&[hit, hit]);
    assert_eq!(summary.reactions, 1);
    assert_eq!(summary.duplicates, 1);

    let p = sim.world().player().unwrap();
    assert!(!p.is_grown());
    assert!(p.has_pending_reshape());
    assert_eq!(recorder.sounds(), vec![SoundEvent::Shrink]);
    assert_eq!(sim.world().body_of(player), Some(tall_body), "rebuild is deferred");

    sim.tick();
    let small_body = sim.world().body_of(player).unwrap();
    assert_ne!(small_body, tall_body);
    let players = sim
        .world()
        .physics()
        .fixture_categories(small_body)
        .into_iter()
        .filter(|c| *c == Category::Player)
        .count();
    assert_eq!(players, 1);

    sim.run_ticks(30);
    assert!(!sim.world().player().unwrap().is_dead());
    assert_eq!(
        enemy_state(sim.world(), walker),
        EnemyState::Walker(WalkerState::Alive)
    );
}

// ---------------------------------------------------------------------------
// Scenario 4: head-hitting a mushroom coin
// ---------------------------------------------------------------------------

#[test]
fn coin_with_mushroom_spawns_item() {
    let (mut sim, recorder) = simulation(&base_level());
    let player = sim.world().player_id();
    let coin = ids_of(sim.world(), EntityKind::Coin)[0];
    let cell = sim.world().entity(coin).and_then(Entity::as_tile).unwrap().cell();
    assert_eq!(cell, Cell::new(7, 6));
    assert_eq!(sim.world().tiles().tile(cell), Some(27));

    let bonk = contact(sim.world(), (player, Category::PlayerHead), (coin, Category::Coin));
    sim.world_mut().deliver_contacts(&[bonk]);

    assert_eq!(sim.world().pending_spawns(), 1);
    assert_eq!(recorder.sounds(), vec![SoundEvent::PowerUpAppear]);
    assert_eq!(recorder.awards(), vec![COIN_SCORE]);
    assert_eq!(sim.world().tiles().tile(cell), Some(BLANK_COIN_TILE));
    let state = sim.world().entity(coin).and_then(Entity::as_tile).unwrap().tile_kind();
    assert!(matches!(state, TileKind::Coin { state: CoinState::Blank, .. }));

    let report = sim.tick();
    let item = report.spawned.expect("item materialises after the step");
    assert_eq!(sim.world().pending_spawns(), 0);
    let item_y = sim.world().entity(item).unwrap().position().y;
    let coin_y = sim.world().entity(coin).unwrap().position().y;
    assert!(item_y > coin_y);

    // A blank coin only bumps.
    let bonk = contact(sim.world(), (player, Category::PlayerHead), (coin, Category::Coin));
    sim.world_mut().deliver_contacts(&[bonk]);
    assert_eq!(recorder.count(SoundEvent::Bump), 1);
    assert_eq!(recorder.awards(), vec![COIN_SCORE]);
    assert_eq!(sim.world().pending_spawns(), 0);
}

// ---------------------------------------------------------------------------
// Scenario 5: a kicked shell knocks out a walker
// ---------------------------------------------------------------------------

#[test]
fn kicked_shell_defeats_walker() {
    let (mut sim, recorder) = simulation(&base_level());
    let player = sim.world().player_id();
    let shell = ids_of(sim.world(), EntityKind::Shelled)[0];
    let walker = ids_of(sim.world(), EntityKind::Walker)[0];

    let stomp = contact(sim.world(), (shell, Category::EnemyHead), (player, Category::Player));
    sim.world_mut().deliver_contacts(&[stomp]);
    assert_eq!(
        enemy_state(sim.world(), shell),
        EnemyState::Shelled(ShelledState::ShellIdle)
    );

    // The player stands to the shell's left, so the kick goes right.
    let kick = contact(sim.world(), (player, Category::Player), (shell, Category::Enemy));
    sim.world_mut().deliver_contacts(&[kick]);
    let e = sim.world().entity(shell).and_then(Entity::as_enemy).unwrap();
    assert_eq!(e.state(), EnemyState::Shelled(ShelledState::ShellMoving));
    assert_eq!(e.velocity().dx, KICK_SPEED);
    assert!(!sim.world().player().unwrap().is_dead(), "kicking is harmless");

    let clash = contact(sim.world(), (shell, Category::Enemy), (walker, Category::Enemy));
    sim.world_mut().deliver_contacts(&[clash]);
    assert_eq!(
        enemy_state(sim.world(), walker),
        EnemyState::Walker(WalkerState::Dead)
    );
    assert_eq!(
        enemy_state(sim.world(), shell),
        EnemyState::Shelled(ShelledState::ShellMoving)
    );
    assert_eq!(recorder.sounds(), vec![SoundEvent::Stomp, SoundEvent::Kick]);

    // The knocked-out walker spins and is gone after five seconds.
    sim.run_ticks(10);
    let view = sim.views().into_iter().find(|v| v.id == walker).unwrap();
    assert!(view.rotation_degrees > 0.0);
    sim.run_ticks(300);
    assert!(sim.world().entity(walker).is_none());
}

// ---------------------------------------------------------------------------
// Tiles through the world
// ---------------------------------------------------------------------------

#[test]
fn brick_small_then_grown() {
    let (mut sim, recorder) = simulation(&base_level());
    let player = sim.world().player_id();
    let brick = ids_of(sim.world(), EntityKind::Brick)[0];

    let bonk = contact(sim.world(), (player, Category::PlayerHead), (brick, Category::Brick));
    sim.world_mut().deliver_contacts(&[bonk]);
    assert_eq!(recorder.sounds(), vec![SoundEvent::Bump]);
    assert_eq!(recorder.score(), 0);

    grow_player(&mut sim, &recorder);
    let bonk = contact(sim.world(), (player, Category::PlayerHead), (brick, Category::Brick));
    sim.world_mut().deliver_contacts(&[bonk]);
    assert_eq!(recorder.sounds(), vec![SoundEvent::BreakBlock]);
    assert_eq!(recorder.awards(), vec![200]);
    let body = sim.world().body_of(brick).unwrap();
    assert_eq!(
        sim.world().physics().fixture_categories(body),
        vec![Category::Destroyed]
    );
    let view = sim.views().into_iter().find(|v| v.id == brick).unwrap();
    assert!(!view.visible);
}

#[test]
fn contacts_with_removed_owner_are_skipped() {
    let (mut sim, recorder) = simulation(&base_level());
    let player = sim.world().player_id();
    let walker = ids_of(sim.world(), EntityKind::Walker)[0];
    let stale = contact(sim.world(), (player, Category::Player), (walker, Category::Enemy));

    let stomp = contact(sim.world(), (walker, Category::EnemyHead), (player, Category::Player));
    sim.world_mut().deliver_contacts(&[stomp]);
    sim.run_ticks(62);
    assert!(sim.world().entity(walker).is_none());

    let summary = sim.world_mut().deliver_contacts(&[stale]);
    assert_eq!(summary.stale, 1);
    assert_eq!(summary.reactions, 0);
    assert!(!sim.world().player().unwrap().is_dead());
    assert_eq!(recorder.count(SoundEvent::Death), 0);
}
