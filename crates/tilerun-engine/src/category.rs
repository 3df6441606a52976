//! Actor categories and the collision-filter matrix.
//!
//! Every fixture carries exactly one [`Category`]. The category decides two
//! things: which other fixtures it physically collides with (its mask, see
//! [`collision_mask`]), and how the contact dispatcher interprets a contact
//! that involves it. Player head and foot fixtures are sensors: the engine
//! reports their contacts but never pushes them.
//!
//! The matrix is fixed for the session. Masks are symmetric so that a pair
//! either interacts from both sides or not at all.

use bitflags::bitflags;
use rapier2d::prelude::{Group, InteractionGroups};
use serde::{Deserialize, Serialize};

bitflags! {
    /// A set of category bits (a fixture mask, or a dispatch key).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct Categories: u32 {
        const GROUND = 1;
        const PLAYER = 1 << 1;
        const BRICK = 1 << 2;
        const COIN = 1 << 3;
        const DESTROYED = 1 << 4;
        const OBJECT = 1 << 5;
        const ENEMY = 1 << 6;
        const ENEMY_HEAD = 1 << 7;
        const ITEM = 1 << 8;
        const PLAYER_HEAD = 1 << 9;
        const PLAYER_FOOT = 1 << 10;
    }
}

impl Categories {
    /// Static terrain a walking actor can stand on.
    pub const TERRAIN: Self = Self::GROUND
        .union(Self::OBJECT)
        .union(Self::BRICK)
        .union(Self::COIN);
}

/// The role a single fixture plays in physics and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Inert; collides with nothing.
    None,
    Ground,
    /// The player's body fixture(s).
    Player,
    Brick,
    Coin,
    /// A brick that has been broken. Nothing masks against it.
    Destroyed,
    /// Solid objects such as pipes. Patrolling actors turn around on them.
    Object,
    Enemy,
    /// The stompable top of an enemy.
    EnemyHead,
    Item,
    /// Sensor on top of the player's head.
    PlayerHead,
    /// Sensor under the player's feet.
    PlayerFoot,
}

impl Category {
    /// Every category, in bit order.
    pub const ALL: [Category; 12] = [
        Category::None,
        Category::Ground,
        Category::Player,
        Category::Brick,
        Category::Coin,
        Category::Destroyed,
        Category::Object,
        Category::Enemy,
        Category::EnemyHead,
        Category::Item,
        Category::PlayerHead,
        Category::PlayerFoot,
    ];

    /// The single bit identifying this category (empty for [`Category::None`]).
    pub fn bits(self) -> Categories {
        match self {
            Category::None => Categories::empty(),
            Category::Ground => Categories::GROUND,
            Category::Player => Categories::PLAYER,
            Category::Brick => Categories::BRICK,
            Category::Coin => Categories::COIN,
            Category::Destroyed => Categories::DESTROYED,
            Category::Object => Categories::OBJECT,
            Category::Enemy => Categories::ENEMY,
            Category::EnemyHead => Categories::ENEMY_HEAD,
            Category::Item => Categories::ITEM,
            Category::PlayerHead => Categories::PLAYER_HEAD,
            Category::PlayerFoot => Categories::PLAYER_FOOT,
        }
    }

    /// Recover a category from a fixture's membership bits.
    ///
    /// Returns `None` when the bits do not name exactly one known category.
    pub fn from_bits(bits: u32) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.bits().bits() == bits)
    }

    /// Whether fixtures of this category only report contacts.
    pub fn is_sensor(self) -> bool {
        matches!(self, Category::PlayerHead | Category::PlayerFoot)
    }
}

/// The set of categories a fixture of `category` collides with.
pub fn collision_mask(category: Category) -> Categories {
    match category {
        Category::None | Category::Destroyed => Categories::empty(),
        Category::Ground | Category::Object => {
            Categories::PLAYER | Categories::PLAYER_FOOT | Categories::ENEMY | Categories::ITEM
        }
        Category::Brick | Category::Coin => {
            Categories::PLAYER
                | Categories::PLAYER_HEAD
                | Categories::PLAYER_FOOT
                | Categories::ENEMY
                | Categories::ITEM
        }
        Category::Player => {
            Categories::TERRAIN | Categories::ENEMY | Categories::ENEMY_HEAD | Categories::ITEM
        }
        Category::PlayerHead => Categories::BRICK | Categories::COIN,
        Category::PlayerFoot => Categories::TERRAIN,
        Category::Enemy => Categories::TERRAIN | Categories::ENEMY | Categories::PLAYER,
        Category::EnemyHead => Categories::PLAYER,
        Category::Item => Categories::TERRAIN | Categories::PLAYER,
    }
}

/// Whether two categories produce contacts at all.
pub fn interacts(a: Category, b: Category) -> bool {
    collision_mask(a).contains(b.bits())
        && collision_mask(b).contains(a.bits())
        && !a.bits().is_empty()
        && !b.bits().is_empty()
}

/// rapier interaction groups for a live fixture of `category`.
pub fn interaction_groups(category: Category) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(category.bits().bits()),
        Group::from_bits_truncate(collision_mask(category).bits()),
    )
}

/// rapier interaction groups for a fixture that keeps its category but no
/// longer collides with anything.
pub fn inert_groups(category: Category) -> InteractionGroups {
    InteractionGroups::new(Group::from_bits_truncate(category.bits().bits()), Group::NONE)
}
