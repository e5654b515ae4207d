//! Row-level statement rendering.
//!
//! Every statement carries its parameters paired with the declared column
//! type, so the binders can send a correctly typed NULL and PostgreSQL gets
//! an explicit cast for enum columns.

use crate::error::{FixtureError, FixtureResult};
use crate::models::connection::Dialect;
use crate::models::schema::{ColumnDefinition, ColumnType, EntityDefinition};
use crate::models::value::{RowValues, SqlValue};

/// A rendered statement and its typed parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<(SqlValue, ColumnType)>,
}

impl Statement {
    fn new(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }

    /// Append a parameter and return its placeholder.
    fn push(&mut self, value: SqlValue, column: &ColumnDefinition, dialect: Dialect) -> String {
        self.params.push((value, column.column_type.clone()));
        let placeholder = dialect.placeholder(self.params.len());
        match (&column.column_type, dialect) {
            (ColumnType::Enum { name, .. }, Dialect::PostgreSQL) => {
                format!("{}::{}", placeholder, dialect.quote(name))
            }
            _ => placeholder,
        }
    }
}

/// INSERT for an already prepared row (keys are attributes).
///
/// A NULL surrogate key is left out so the database generates it. On
/// PostgreSQL the generated key is returned with `RETURNING`.
pub fn insert(entity: &EntityDefinition, row: &RowValues, dialect: Dialect) -> FixtureResult<Statement> {
    for (key, _) in row.iter() {
        if entity.column(key).is_none() {
            return Err(FixtureError::unknown_column(&entity.name, key.as_str()));
        }
    }

    let table = dialect.quote(&entity.table);
    let mut statement = Statement::new(String::new());
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();

    for column in &entity.columns {
        let Some(value) = row.get(&column.attribute) else {
            continue;
        };
        if column.auto_increment && value.is_null() {
            continue;
        }
        columns.push(dialect.quote(&column.name));
        placeholders.push(statement.push(value.clone(), column, dialect));
    }

    statement.sql = if columns.is_empty() {
        match dialect {
            Dialect::MySQL => format!("INSERT INTO {} () VALUES ()", table),
            Dialect::PostgreSQL | Dialect::SQLite => {
                format!("INSERT INTO {} DEFAULT VALUES", table)
            }
        }
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    };

    if dialect == Dialect::PostgreSQL {
        if let Some(key) = entity.generated_key() {
            statement.sql.push_str(&format!(" RETURNING {}", dialect.quote(&key.name)));
        }
    }

    Ok(statement)
}

/// SELECT every column of the rows matching `filter`, ordered by primary key.
pub fn select(entity: &EntityDefinition, filter: &RowValues, dialect: Dialect) -> FixtureResult<Statement> {
    let columns: Vec<String> = entity
        .columns
        .iter()
        .map(|column| match (&column.column_type, dialect) {
            // custom enum types have no text decoder in the driver
            (ColumnType::Enum { .. }, Dialect::PostgreSQL) => {
                let quoted = dialect.quote(&column.name);
                format!("{quoted}::text AS {quoted}")
            }
            _ => dialect.quote(&column.name),
        })
        .collect();

    let mut statement = Statement::new(format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        dialect.quote(&entity.table)
    ));
    push_where(&mut statement, entity, filter, dialect)?;

    let primary_key = entity.primary_key_columns();
    if !primary_key.is_empty() {
        let order: Vec<String> = primary_key.iter().map(|c| dialect.quote(c)).collect();
        statement.sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
    }
    Ok(statement)
}

/// DELETE the rows matching `filter`. An empty filter deletes every row.
pub fn delete(entity: &EntityDefinition, filter: &RowValues, dialect: Dialect) -> FixtureResult<Statement> {
    let mut statement = Statement::new(format!("DELETE FROM {}", dialect.quote(&entity.table)));
    push_where(&mut statement, entity, filter, dialect)?;
    Ok(statement)
}

/// COUNT the rows matching `filter`.
pub fn count(entity: &EntityDefinition, filter: &RowValues, dialect: Dialect) -> FixtureResult<Statement> {
    let mut statement = Statement::new(format!(
        "SELECT COUNT(*) FROM {}",
        dialect.quote(&entity.table)
    ));
    push_where(&mut statement, entity, filter, dialect)?;
    Ok(statement)
}

fn push_where(
    statement: &mut Statement,
    entity: &EntityDefinition,
    filter: &RowValues,
    dialect: Dialect,
) -> FixtureResult<()> {
    let mut predicates = Vec::with_capacity(filter.len());

    for (key, value) in filter.iter() {
        let column = entity
            .column(key)
            .ok_or_else(|| FixtureError::unknown_column(&entity.name, key.as_str()))?;
        if matches!(column.column_type, ColumnType::Json | ColumnType::Binary) {
            return Err(FixtureError::invalid_value(
                key.as_str(),
                "JSON and binary columns cannot be used as filters",
            ));
        }

        let quoted = dialect.quote(&column.name);
        if value.is_null() {
            predicates.push(format!("{} IS NULL", quoted));
        } else {
            let placeholder = statement.push(value.clone(), column, dialect);
            predicates.push(format!("{} = {}", quoted, placeholder));
        }
    }

    if !predicates.is_empty() {
        statement.sql.push_str(" WHERE ");
        statement.sql.push_str(&predicates.join(" AND "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Friendship, Model, Team, User};
    use serde_json::json;

    #[test]
    fn test_insert_postgres_casts_enum_and_returns_key() {
        let row = RowValues::new()
            .with("nickname", "alice")
            .with("profile", json!({"age": 18}))
            .with("user_type", "USER");
        // "user_type" is not an attribute; the column is "type"
        assert!(matches!(
            insert(&User::definition(), &row, Dialect::PostgreSQL),
            Err(FixtureError::UnknownColumn { .. })
        ));

        let row = RowValues::new()
            .with("nickname", "alice")
            .with("profile", json!({"age": 18}))
            .with("type", "USER");
        let statement = insert(&User::definition(), &row, Dialect::PostgreSQL).unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"users\" (\"name\", \"props\", \"type\") VALUES ($1, $2, $3::\"usertype\") RETURNING \"id\""
        );
        assert_eq!(statement.params.len(), 3);
        assert_eq!(statement.params[1].1, ColumnType::Json);
    }

    #[test]
    fn test_insert_mysql_skips_null_surrogate_key() {
        let row = RowValues::new().with("id", SqlValue::Null).with("name", "ops");
        let statement = insert(&Team::definition(), &row, Dialect::MySQL).unwrap();
        assert_eq!(statement.sql, "INSERT INTO `teams` (`name`) VALUES (?)");
        assert_eq!(statement.params, vec![(SqlValue::Text("ops".into()), ColumnType::Varchar(255))]);
    }

    #[test]
    fn test_insert_without_columns() {
        let statement = insert(&Team::definition(), &RowValues::new(), Dialect::SQLite).unwrap();
        assert_eq!(statement.sql, "INSERT INTO \"teams\" DEFAULT VALUES");
        let statement = insert(&Team::definition(), &RowValues::new(), Dialect::MySQL).unwrap();
        assert_eq!(statement.sql, "INSERT INTO `teams` () VALUES ()");
    }

    #[test]
    fn test_select_with_filter_and_order() {
        let filter = RowValues::new().with("my_id", 1i64);
        let statement = select(&Friendship::definition(), &filter, Dialect::PostgreSQL).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT \"my_id\", \"friend_id\" FROM \"friendship\" WHERE \"my_id\" = $1 ORDER BY \"my_id\", \"friend_id\""
        );
    }

    #[test]
    fn test_select_casts_postgres_enum() {
        let statement = select(&User::definition(), &RowValues::new(), Dialect::PostgreSQL).unwrap();
        assert!(statement.sql.contains("\"type\"::text AS \"type\""));
        let statement = select(&User::definition(), &RowValues::new(), Dialect::MySQL).unwrap();
        assert!(statement.sql.contains("`type`, `team_id`"));
    }

    #[test]
    fn test_null_filter_uses_is_null() {
        let filter = RowValues::new()
            .with("parent_id", SqlValue::Null)
            .with("name", "ops");
        let statement = delete(&Team::definition(), &filter, Dialect::MySQL).unwrap();
        assert_eq!(
            statement.sql,
            "DELETE FROM `teams` WHERE `name` = ? AND `parent_id` IS NULL"
        );
        assert_eq!(statement.params.len(), 1);
    }

    #[test]
    fn test_filter_accepts_attribute_and_column_names() {
        let by_attribute = RowValues::new().with("nickname", "bob");
        let by_column = RowValues::new().with("name", "bob");
        let a = count(&User::definition(), &by_attribute, Dialect::SQLite).unwrap();
        let b = count(&User::definition(), &by_column, Dialect::SQLite).unwrap();
        assert_eq!(a.sql, "SELECT COUNT(*) FROM \"users\" WHERE \"name\" = ?");
        assert_eq!(a, b);
    }

    #[test]
    fn test_filter_rejects_json_and_unknown_columns() {
        let filter = RowValues::new().with("profile", json!({}));
        assert!(matches!(
            count(&User::definition(), &filter, Dialect::MySQL),
            Err(FixtureError::InvalidValue { .. })
        ));
        let filter = RowValues::new().with("balance", 1i64);
        assert!(matches!(
            count(&User::definition(), &filter, Dialect::MySQL),
            Err(FixtureError::UnknownColumn { .. })
        ));
    }
}
