//! Fixture entities.
//!
//! Six entities exercise an ORM against MySQL and PostgreSQL: users, teams,
//! companies, friendships, relations and per-user settings. Each one
//! implements [`Model`], which ties its registry declaration to the struct a
//! decoded record deserializes into.

pub mod random;
pub mod relation;
pub mod team;
pub mod user;
pub mod user_setting;

pub use random::{random_name, random_name_of};
pub use relation::{Friendship, Relation};
pub use team::{Company, Team};
pub use user::{User, UserType, normalize_balance};
pub use user_setting::UserSetting;

use crate::error::FixtureResult;
use crate::models::schema::EntityDefinition;
use crate::registry::SchemaRegistry;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// A fixture struct bound to a registered entity.
pub trait Model: DeserializeOwned {
    const ENTITY: &'static str;

    fn definition() -> EntityDefinition;
}

/// Identity used by [`MemberSet`].
pub trait Keyed {
    fn key(&self) -> i64;
}

/// An in-memory set keyed by id; inserting an id that is already present is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSet<T> {
    items: BTreeMap<i64, T>,
}

impl<T> Default for MemberSet<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Keyed> MemberSet<T> {
    /// Returns false if an item with the same key was already present.
    pub fn insert(&mut self, item: T) -> bool {
        let key = item.key();
        if self.items.contains_key(&key) {
            return false;
        }
        self.items.insert(key, item);
        true
    }
}

impl<T> MemberSet<T> {
    pub fn contains(&self, key: i64) -> bool {
        self.items.contains_key(&key)
    }

    pub fn get(&self, key: i64) -> Option<&T> {
        self.items.get(&key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }
}

/// Declarations of every fixture entity, in registration order.
pub fn definitions() -> Vec<EntityDefinition> {
    vec![
        User::definition(),
        Friendship::definition(),
        Relation::definition(),
        Team::definition(),
        Company::definition(),
        UserSetting::definition(),
    ]
}

/// The validated registry of all fixture entities.
pub fn registry() -> FixtureResult<SchemaRegistry> {
    SchemaRegistry::build(definitions())
}
