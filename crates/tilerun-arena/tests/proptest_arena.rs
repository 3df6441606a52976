//! Property tests for arena operations.
//!
//! Random sequences of inserts and removals are applied to an [`Arena`] and to
//! a naive model; after every step the live set must agree and every removed
//! handle must stay stale forever.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tilerun_arena::prelude::*;

#[derive(Debug, Clone)]
enum ArenaOp {
    Insert(u32),
    Remove(usize),
    RemoveStale(usize),
}

fn arena_op_strategy() -> impl Strategy<Value = ArenaOp> {
    prop_oneof![
        any::<u32>().prop_map(ArenaOp::Insert),
        (0..64usize).prop_map(ArenaOp::Remove),
        (0..64usize).prop_map(ArenaOp::RemoveStale),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn arena_matches_model(ops in prop::collection::vec(arena_op_strategy(), 1..80)) {
        let mut arena = Arena::new();
        let mut model: BTreeMap<EntityId, u32> = BTreeMap::new();
        let mut removed: Vec<EntityId> = Vec::new();

        for op in ops {
            match op {
                ArenaOp::Insert(v) => {
                    let id = arena.insert(v);
                    prop_assert!(!model.contains_key(&id), "fresh handle collided: {id:?}");
                    model.insert(id, v);
                }
                ArenaOp::Remove(i) => {
                    if model.is_empty() {
                        continue;
                    }
                    let id = *model.keys().nth(i % model.len()).unwrap();
                    let expected = model.remove(&id);
                    prop_assert_eq!(arena.remove(id), expected);
                    removed.push(id);
                }
                ArenaOp::RemoveStale(i) => {
                    if removed.is_empty() {
                        continue;
                    }
                    let id = removed[i % removed.len()];
                    prop_assert_eq!(arena.remove(id), None);
                }
            }

            prop_assert_eq!(arena.len(), model.len());
            for (id, v) in &model {
                prop_assert_eq!(arena.get(*id), Some(v));
            }
            for id in &removed {
                prop_assert!(arena.get(*id).is_none(), "removed handle {id:?} resolved");
            }
        }
    }

    #[test]
    fn ids_are_slot_ordered(count in 1..40usize, drop_every in 2..5usize) {
        let mut arena = Arena::new();
        let ids: Vec<EntityId> = (0..count).map(|i| arena.insert(i)).collect();
        for id in ids.iter().step_by(drop_every) {
            arena.remove(*id);
        }
        let listed = arena.ids();
        let mut sorted = listed.clone();
        sorted.sort_by_key(|id| id.index());
        prop_assert_eq!(listed, sorted);
    }
}

#[test]
fn handle_serializes_as_raw_integer() {
    let id = EntityId::new(3, 1);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, id.to_raw().to_string());
    let back: EntityId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
