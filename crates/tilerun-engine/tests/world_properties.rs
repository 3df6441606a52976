//! Property tests over the contact table and the tick pipeline.

use proptest::prelude::*;
use tilerun_engine::category::interacts;
use tilerun_engine::physics::StructuralKind;
use tilerun_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn busy_level() -> LevelDescriptor {
    let mut level = LevelDescriptor::empty();
    level
        .push("ground", MapObject::rect(0.0, 0.0, 2400.0, 16.0))
        .push("objects", MapObject::rect(560.0, 16.0, 32.0, 32.0))
        .push("objects", MapObject::rect(40.0, 16.0, 16.0, 48.0));
    for i in 0..6 {
        let x = 96.0 + 16.0 * i as f32;
        let block = MapObject::rect(x, 64.0, 16.0, 16.0);
        if i % 2 == 0 {
            level.push("bricks", block);
        } else {
            level.push("coins", block.with_property("contains", "mushroom"));
        }
    }
    for i in 0..4 {
        level.push("walkers", MapObject::rect(240.0 + 64.0 * i as f32, 16.0, 16.0, 16.0));
    }
    level.push("shelled", MapObject::rect(420.0, 16.0, 16.0, 24.0));
    level
}

fn simulation(level: &LevelDescriptor) -> Simulation {
    let world = WorldBuilder::new(Services::silent())
        .build(level)
        .expect("level builds");
    Simulation::new(world, TickConfig::default())
}

fn category() -> impl Strategy<Value = Category> {
    proptest::sample::select(Category::ALL.to_vec())
}

fn input() -> impl Strategy<Value = PlayerInput> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(left, right, jump)| PlayerInput {
        left,
        right,
        jump,
    })
}

// ---------------------------------------------------------------------------
// Contact table
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn classification_ignores_fixture_order(a in category(), b in category()) {
        prop_assert_eq!(classify(a, b).ok(), classify(b, a).ok());
    }

    #[test]
    fn interacting_pairs_always_classify(a in category(), b in category()) {
        if interacts(a, b) {
            prop_assert!(classify(a, b).is_ok(), "{:?} x {:?}", a, b);
        }
    }
}

/// Everything a contact can change that a caller can observe.
#[derive(Debug, PartialEq)]
struct Outcome {
    views: Vec<EntityView>,
    sounds: Vec<SoundEvent>,
    awards: Vec<u32>,
    pending_spawns: usize,
}

fn first_of(world: &GameWorld, kind: EntityKind) -> EntityId {
    world
        .entities()
        .find(|(_, e)| e.kind() == kind)
        .map(|(id, _)| id)
        .expect("level has this kind")
}

fn side(world: &GameWorld, id: EntityId, category: Category) -> FixtureRef {
    FixtureRef {
        category,
        owner: Some(id),
        body: world.body_of(id).expect("entity owns a body"),
    }
}

/// Deliver `a` against `b` on a fresh world, in the given side order.
fn deliver(pick: fn(&GameWorld) -> [(EntityId, Category); 2], swapped: bool) -> Outcome {
    let recorder = EventRecorder::new();
    let mut world = WorldBuilder::new(Services::recording(&recorder))
        .build(&busy_level())
        .expect("level builds");
    let [(ia, ca), (ib, cb)] = pick(&world);
    let (a, b) = (side(&world, ia, ca), side(&world, ib, cb));
    let contact = if swapped {
        Contact { a: b, b: a }
    } else {
        Contact { a, b }
    };
    world.deliver_contacts(&[contact]);
    Outcome {
        views: world.views(),
        sounds: recorder.sounds(),
        awards: recorder.awards(),
        pending_spawns: world.pending_spawns(),
    }
}

#[test]
fn dispatch_ignores_fixture_order() {
    let cases: [fn(&GameWorld) -> [(EntityId, Category); 2]; 6] = [
        |w| {
            [
                (w.player_id(), Category::PlayerHead),
                (first_of(w, EntityKind::Coin), Category::Coin),
            ]
        },
        |w| {
            [
                (w.player_id(), Category::PlayerHead),
                (first_of(w, EntityKind::Brick), Category::Brick),
            ]
        },
        |w| {
            [
                (first_of(w, EntityKind::Walker), Category::EnemyHead),
                (w.player_id(), Category::Player),
            ]
        },
        |w| {
            [
                (first_of(w, EntityKind::Shelled), Category::EnemyHead),
                (w.player_id(), Category::Player),
            ]
        },
        |w| {
            [
                (w.player_id(), Category::Player),
                (first_of(w, EntityKind::Walker), Category::Enemy),
            ]
        },
        |w| {
            [
                (first_of(w, EntityKind::Walker), Category::Enemy),
                (first_of(w, EntityKind::Shelled), Category::Enemy),
            ]
        },
    ];
    for (index, pick) in cases.into_iter().enumerate() {
        let forward = deliver(pick, false);
        let backward = deliver(pick, true);
        assert_eq!(forward, backward, "case {index}");
    }
}

// ---------------------------------------------------------------------------
// Tick pipeline
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn bodies_never_change_during_a_step(
        inputs in proptest::collection::vec((input(), 1u64..20), 1..12)
    ) {
        let mut sim = simulation(&busy_level());
        for (held, ticks) in inputs {
            sim.set_input(held);
            for _ in 0..ticks {
                let report = sim.tick();
                prop_assert_eq!(report.dispatch.errors, 0);
            }
        }
        let log = sim.world().physics().structural_log();
        prop_assert!(log.iter().all(|op| !op.during_step));
        prop_assert!(sim.world().entity(sim.world().player_id()).is_some());
    }
}

#[test]
fn spawn_queue_drains_one_per_tick() {
    let mut sim = simulation(&busy_level());
    for i in 0..3 {
        sim.world_mut().enqueue_spawn(SpawnRequest {
            position: Position::new(10.0 + i as f32, 1.0),
            item: ItemKind::Mushroom,
        });
    }
    let before = sim.world().entity_count();

    for remaining in [2, 1, 0] {
        let report = sim.tick();
        let id = report.spawned.expect("one spawn per tick");
        assert_eq!(sim.world().entity(id).unwrap().kind(), EntityKind::Mushroom);
        assert_eq!(sim.world().pending_spawns(), remaining);
    }
    assert!(sim.tick().spawned.is_none());
    assert_eq!(sim.world().entity_count(), before + 3);

    let created = sim
        .world()
        .physics()
        .structural_log()
        .iter()
        .filter(|op| op.kind == StructuralKind::Created)
        .count();
    assert!(created >= 3);
}

#[test]
fn identical_runs_stay_identical() {
    let script = [
        (PlayerInput { right: true, ..Default::default() }, 90),
        (PlayerInput { right: true, jump: true, ..Default::default() }, 20),
        (PlayerInput::default(), 40),
        (PlayerInput { left: true, ..Default::default() }, 30),
    ];
    let run = || {
        let mut sim = simulation(&busy_level());
        for (held, ticks) in script {
            sim.set_input(held);
            sim.run_ticks(ticks);
        }
        sim.views()
    };
    assert_eq!(run(), run());
}

#[test]
fn level_survives_json() {
    let level = busy_level();
    let json = level.to_json().unwrap();
    let back = LevelDescriptor::from_json(&json).unwrap();
    assert_eq!(back, level);

    let a = simulation(&level);
    let b = simulation(&back);
    assert_eq!(a.views(), b.views());
}

#[test]
fn build_errors_from_json() {
    let missing = r#"{ "layers": { "ground": [] } }"#;
    let level = LevelDescriptor::from_json(missing).unwrap();
    let err = WorldBuilder::new(Services::silent()).build(&level).unwrap_err();
    assert!(matches!(err, BuildError::MissingLayer { .. }));

    let ellipse = r#"{
        "layers": {
            "ground": [{ "shape": { "type": "ellipse", "x": 0, "y": 0, "width": 16, "height": 16 } }],
            "objects": [], "bricks": [], "coins": [], "walkers": [], "shelled": []
        }
    }"#;
    let level = LevelDescriptor::from_json(ellipse).unwrap();
    let err = WorldBuilder::new(Services::silent()).build(&level).unwrap_err();
    assert_eq!(err.to_string(), "object 0 on layer `ground` has shape `ellipse`, expected a rectangle");

    assert!(matches!(
        LevelDescriptor::from_json("{ not json"),
        Err(LevelError::Json(_))
    ));
}

#[test]
fn bundled_level_builds_and_runs() {
    let json = include_str!("../levels/level1.json");
    let level = LevelDescriptor::from_json(json).unwrap();
    let mut sim = simulation(&level);
    assert_eq!(
        sim.world()
            .entities()
            .filter(|(_, e)| matches!(e.kind(), EntityKind::Walker | EntityKind::Shelled))
            .count(),
        6
    );
    assert_eq!(sim.world().tiles().len(), 9);
    sim.set_input(PlayerInput { right: true, ..Default::default() });
    sim.run_ticks(120);
    assert!(sim.world().player().is_some());
}
