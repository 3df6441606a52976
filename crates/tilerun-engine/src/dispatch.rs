//! Contact classification and reaction routing.
//!
//! Every begun contact is keyed by the union of both fixtures' category bits.
//! The key selects a [`Reaction`]; roles are then resolved from each side's
//! own category, so argument order never matters. Reactions only touch state:
//! they set flags, queue spawns, change filters and apply impulses.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tilerun_arena::prelude::*;
use tracing::{error, trace};

use crate::category::{Categories, Category};
use crate::entity::{Context, Entity};
use crate::physics::{Contact, FixtureRef};

/// What a contact does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reaction {
    /// Player head sensor under a brick or coin block.
    HeadHitTile,
    /// Player lands on an enemy's head.
    StompEnemy,
    /// Enemy walks into a solid object.
    EnemyTurns,
    /// Player touches an enemy's body.
    PlayerHit,
    /// Two enemies bump.
    EnemiesCollide,
    /// Item slides into a solid object.
    ItemTurns,
    /// Player picks up an item.
    ItemUsed,
    /// Resting or walking on terrain; nothing to do.
    Terrain,
}

/// Contact dispatch failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The filter matrix let through a pair no reaction handles.
    #[error("unclassified contact between {a:?} and {b:?}")]
    Unclassified { a: Category, b: Category },

    /// A fixture that needs an owning entity has none.
    #[error("{category:?} fixture has no owning entity")]
    MissingOwner { category: Category },

    /// The owners do not have the entity kinds their categories promise.
    #[error("{reaction:?} contact owners have unexpected kinds")]
    OwnerMismatch { reaction: Reaction },
}

/// Classify a contact by the categories of its two fixtures.
///
/// Symmetric: `classify(a, b) == classify(b, a)`.
pub fn classify(a: Category, b: Category) -> Result<Reaction, DispatchError> {
    let key = a.bits() | b.bits();
    let walkers = [
        Categories::PLAYER,
        Categories::PLAYER_FOOT,
        Categories::ENEMY,
        Categories::ITEM,
    ];
    let tiles = [Categories::GROUND, Categories::BRICK, Categories::COIN];

    let reaction = if key == Categories::PLAYER_HEAD | Categories::BRICK
        || key == Categories::PLAYER_HEAD | Categories::COIN
    {
        Reaction::HeadHitTile
    } else if key == Categories::ENEMY_HEAD | Categories::PLAYER {
        Reaction::StompEnemy
    } else if key == Categories::ENEMY | Categories::OBJECT {
        Reaction::EnemyTurns
    } else if key == Categories::PLAYER | Categories::ENEMY {
        Reaction::PlayerHit
    } else if a == Category::Enemy && b == Category::Enemy {
        Reaction::EnemiesCollide
    } else if key == Categories::ITEM | Categories::OBJECT {
        Reaction::ItemTurns
    } else if key == Categories::ITEM | Categories::PLAYER {
        Reaction::ItemUsed
    } else if a != b
        && (walkers.iter().any(|w| tiles.iter().any(|t| key == *w | *t))
            || key == Categories::PLAYER | Categories::OBJECT
            || key == Categories::PLAYER_FOOT | Categories::OBJECT)
    {
        Reaction::Terrain
    } else {
        return Err(DispatchError::Unclassified { a, b });
    };
    Ok(reaction)
}

/// Outcome of dispatching one step's contacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Reactions that ran (terrain no-ops excluded).
    pub reactions: usize,
    /// Contacts collapsed into an earlier identical one.
    pub duplicates: usize,
    /// Contacts skipped because an owner was already gone.
    pub stale: usize,
    /// Body hits dropped because the same pair was stomped in the batch.
    pub suppressed: usize,
    pub errors: usize,
}

fn report(err: &DispatchError) {
    error!(%err, "contact dispatch invariant broken");
    if cfg!(debug_assertions) {
        panic!("{err}");
    }
}

/// The side of `contact` whose category is one of `categories`.
fn side(contact: &Contact, categories: &[Category]) -> FixtureRef {
    if categories.contains(&contact.a.category) {
        contact.a
    } else {
        contact.b
    }
}

fn other(contact: &Contact, this: FixtureRef) -> FixtureRef {
    if contact.a == this {
        contact.b
    } else {
        contact.a
    }
}

fn owner(fixture: FixtureRef) -> Result<EntityId, DispatchError> {
    fixture.owner.ok_or(DispatchError::MissingOwner {
        category: fixture.category,
    })
}

/// Stomps run before anything else in the batch. A falling player often
/// begins touching an enemy's head and body in the same step, and the stomp
/// must decide that contact.
fn priority(reaction: Reaction) -> u8 {
    match reaction {
        Reaction::StompEnemy => 0,
        _ => 1,
    }
}

type OwnerPair = (Option<EntityId>, Option<EntityId>);

fn owner_pair(contact: &Contact) -> OwnerPair {
    let (oa, ob) = (contact.a.owner, contact.b.owner);
    (oa.min(ob), oa.max(ob))
}

/// Deliver a step's contacts to their reactions.
///
/// Stomps go first; the rest keep their order. A player/enemy pair that was
/// stomped in this batch gets no body hit.
pub fn dispatch(
    contacts: &[Contact],
    entities: &mut Arena<Entity>,
    ctx: &mut Context<'_, '_>,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    let mut batch = Vec::with_capacity(contacts.len());
    for contact in contacts {
        match classify(contact.a.category, contact.b.category) {
            Ok(Reaction::Terrain) => {}
            Ok(reaction) => batch.push((reaction, contact)),
            Err(err) => {
                report(&err);
                summary.errors += 1;
            }
        }
    }
    batch.sort_by_key(|(reaction, _)| priority(*reaction));

    let mut seen = BTreeSet::new();
    let mut stomped: BTreeSet<OwnerPair> = BTreeSet::new();
    for (reaction, contact) in batch {
        let pair = owner_pair(contact);
        if !seen.insert((pair, reaction)) {
            summary.duplicates += 1;
            continue;
        }
        if reaction == Reaction::PlayerHit && stomped.contains(&pair) {
            trace!(?contact, "body hit overridden by stomp");
            summary.suppressed += 1;
            continue;
        }

        let stale = [contact.a.owner, contact.b.owner]
            .into_iter()
            .flatten()
            .any(|id| !entities.contains(id));
        if stale {
            trace!(?contact, "contact owner already removed");
            summary.stale += 1;
            continue;
        }

        trace!(?reaction, a = ?contact.a, b = ?contact.b, "contact");
        match react(reaction, contact, entities, ctx) {
            Ok(()) => {
                summary.reactions += 1;
                if reaction == Reaction::StompEnemy {
                    stomped.insert(pair);
                }
            }
            Err(err) => {
                report(&err);
                summary.errors += 1;
            }
        }
    }
    summary
}

fn react(
    reaction: Reaction,
    contact: &Contact,
    entities: &mut Arena<Entity>,
    ctx: &mut Context<'_, '_>,
) -> Result<(), DispatchError> {
    let mismatch = DispatchError::OwnerMismatch { reaction };
    let arena_err = |_: ArenaError| DispatchError::OwnerMismatch { reaction };

    match reaction {
        Reaction::HeadHitTile => {
            let tile = side(contact, &[Category::Brick, Category::Coin]);
            let head = other(contact, tile);
            let (player, tile) = entities
                .get_pair_mut(owner(head)?, owner(tile)?)
                .map_err(arena_err)?;
            match (player, tile) {
                (Entity::Player(p), Entity::Tile(t)) => t.on_head_hit(p, ctx),
                _ => return Err(mismatch),
            }
        }
        Reaction::StompEnemy => {
            let head = side(contact, &[Category::EnemyHead]);
            let body = other(contact, head);
            let (player, enemy) = entities
                .get_pair_mut(owner(body)?, owner(head)?)
                .map_err(arena_err)?;
            match (player, enemy) {
                (Entity::Player(p), Entity::Enemy(e)) => {
                    if !p.is_dead() {
                        let x = p.current_x(ctx.bodies);
                        e.hit_on_head(x, ctx);
                    }
                }
                _ => return Err(mismatch),
            }
        }
        Reaction::EnemyTurns => {
            let enemy = side(contact, &[Category::Enemy]);
            match entities.get_mut(owner(enemy)?) {
                Some(Entity::Enemy(e)) => e.reverse_velocity(true, false),
                _ => return Err(mismatch),
            }
        }
        Reaction::PlayerHit => {
            let enemy = side(contact, &[Category::Enemy]);
            let body = other(contact, enemy);
            let (player, enemy) = entities
                .get_pair_mut(owner(body)?, owner(enemy)?)
                .map_err(arena_err)?;
            match (player, enemy) {
                (Entity::Player(p), Entity::Enemy(e)) => p.hit(e, ctx),
                _ => return Err(mismatch),
            }
        }
        Reaction::EnemiesCollide => {
            let (a, b) = entities
                .get_pair_mut(owner(contact.a)?, owner(contact.b)?)
                .map_err(arena_err)?;
            match (a, b) {
                (Entity::Enemy(a), Entity::Enemy(b)) => {
                    let (snap_a, snap_b) = (a.snapshot(), b.snapshot());
                    a.on_enemy_hit(snap_b, ctx);
                    b.on_enemy_hit(snap_a, ctx);
                }
                _ => return Err(mismatch),
            }
        }
        Reaction::ItemTurns => {
            let item = side(contact, &[Category::Item]);
            match entities.get_mut(owner(item)?) {
                Some(Entity::Item(i)) => i.reverse_velocity(true, false),
                _ => return Err(mismatch),
            }
        }
        Reaction::ItemUsed => {
            let item = side(contact, &[Category::Item]);
            let body = other(contact, item);
            let (player, item) = entities
                .get_pair_mut(owner(body)?, owner(item)?)
                .map_err(arena_err)?;
            match (player, item) {
                (Entity::Player(p), Entity::Item(i)) => i.use_on(p, ctx),
                _ => return Err(mismatch),
            }
        }
        Reaction::Terrain => {}
    }
    Ok(())
}
