//! `Friendship` and `Relation` fixtures: tables without a surrogate key.

use crate::fixtures::Model;
use crate::models::schema::{ColumnDefinition, ColumnType, EntityDefinition};
use serde::Deserialize;

pub const FRIENDSHIP_TABLE: &str = "friendship";
pub const RELATION_TABLE: &str = "relation";

/// An undirected pairing of two users. Neither id is a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Friendship {
    pub my_id: i64,
    pub friend_id: i64,
}

impl std::fmt::Display for Friendship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Friends<{}, {}>", self.my_id, self.friend_id)
    }
}

impl Model for Friendship {
    const ENTITY: &'static str = "Friendship";

    fn definition() -> EntityDefinition {
        EntityDefinition::new(Self::ENTITY, FRIENDSHIP_TABLE)
            .with_column(ColumnDefinition::new("my_id", ColumnType::BigInt).primary_key())
            .with_column(ColumnDefinition::new("friend_id", ColumnType::BigInt).primary_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Relation {
    pub name: String,
}

impl Model for Relation {
    const ENTITY: &'static str = "Relation";

    fn definition() -> EntityDefinition {
        EntityDefinition::new(Self::ENTITY, RELATION_TABLE)
            .with_column(ColumnDefinition::new("name", ColumnType::Varchar(255)).primary_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendship_composite_key() {
        let definition = Friendship::definition();
        assert!(definition.validate().is_ok());
        assert_eq!(definition.primary_key_columns(), vec!["my_id", "friend_id"]);
        assert!(definition.generated_key().is_none());
        assert!(definition.foreign_keys.is_empty());
    }

    #[test]
    fn test_friendship_display() {
        let friendship = Friendship {
            my_id: 1,
            friend_id: 2,
        };
        assert_eq!(friendship.to_string(), "Friends<1, 2>");
    }

    #[test]
    fn test_relation_keyed_by_name() {
        let definition = Relation::definition();
        assert_eq!(definition.primary_key_columns(), vec!["name"]);
        assert!(!definition.column("name").unwrap().nullable);
    }
}
