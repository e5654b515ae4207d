//! The `UserSetting` fixture.
//!
//! Every constraint is declared at table level rather than on the columns:
//! the primary key, the foreign key to `users`, the unique pair, the range
//! check and the index.

use crate::fixtures::Model;
use crate::fixtures::user::USERS_TABLE;
use crate::models::schema::{
    CheckConstraint, ColumnDefinition, ColumnType, DefaultValue, EntityDefinition, ForeignKey,
    IndexDefinition, UniqueConstraint,
};
use serde::Deserialize;

pub const USER_SETTINGS_TABLE: &str = "user_settings";

/// Inclusive range enforced on `col1`.
pub const COL1_RANGE: (i64, i64) = (1, 5);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserSetting {
    pub id: i64,
    pub user_id: Option<i64>,
    pub setting: Option<String>,
    pub value: Option<String>,
    pub col1: Option<i64>,
    pub col2: Option<i64>,
}

impl Model for UserSetting {
    const ENTITY: &'static str = "UserSetting";

    fn definition() -> EntityDefinition {
        EntityDefinition::new(Self::ENTITY, USER_SETTINGS_TABLE)
            .with_column(ColumnDefinition::new("id", ColumnType::BigInt))
            .with_column(ColumnDefinition::new("user_id", ColumnType::BigInt))
            .with_column(ColumnDefinition::new("setting", ColumnType::Varchar(255)))
            .with_column(ColumnDefinition::new("value", ColumnType::Text))
            .with_column(
                ColumnDefinition::new("col1", ColumnType::Integer)
                    .with_default(DefaultValue::literal(1i64)),
            )
            .with_column(
                ColumnDefinition::new("col2", ColumnType::Integer)
                    .with_default(DefaultValue::literal(2i64)),
            )
            .with_primary_key(&["id"])
            .with_foreign_key(ForeignKey::new("user_id", USERS_TABLE, "id"))
            .with_unique(UniqueConstraint::new(&["user_id", "setting"]))
            .with_check(CheckConstraint::between("col1", COL1_RANGE.0, COL1_RANGE.1))
            .with_index(IndexDefinition::new("col2_idx", &["col2"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::CheckPredicate;

    #[test]
    fn test_constraints_declared_apart_from_columns() {
        let definition = UserSetting::definition();
        assert!(definition.validate().is_ok());
        assert!(definition.columns.iter().all(|c| !c.is_primary_key));
        assert_eq!(definition.primary_key_columns(), vec!["id"]);
        assert!(definition.generated_key().is_none());
        assert_eq!(definition.unique_constraints[0].columns, vec!["user_id", "setting"]);
        assert_eq!(definition.indexes[0].name, "col2_idx");
        assert!(matches!(
            definition.check_constraints[0].predicate,
            CheckPredicate::Between { min: 1, max: 5, .. }
        ));
    }
}
