//! DDL rendering.
//!
//! Turns registered entities into CREATE/DROP statements for one dialect.
//! Defaults are applied client-side and never appear here.
//!
//! Dialect differences handled here:
//! - surrogate keys: `AUTO_INCREMENT` (MySQL), `BIGSERIAL` (PostgreSQL),
//!   `INTEGER PRIMARY KEY` rowid alias (SQLite)
//! - enums: inline `ENUM(...)` (MySQL), a named type (PostgreSQL),
//!   `VARCHAR` plus a check (SQLite)
//! - indexes: inline in `CREATE TABLE` on MySQL, separate statements elsewhere

use crate::error::FixtureResult;
use crate::models::connection::Dialect;
use crate::models::schema::{
    CheckConstraint, CheckPredicate, ColumnDefinition, ColumnType, EntityDefinition,
    ForeignKeyAction,
};
use crate::registry::SchemaRegistry;

/// Statements that create every registered table, in dependency order.
pub fn create_statements(registry: &SchemaRegistry, dialect: Dialect) -> FixtureResult<Vec<String>> {
    let order = registry.creation_order()?;
    let mut statements = Vec::new();

    if dialect == Dialect::PostgreSQL {
        for (name, variants) in enum_types(&order) {
            statements.push(create_enum_type(name, variants));
        }
    }

    for entity in &order {
        statements.push(create_table(entity, dialect));
        if dialect != Dialect::MySQL {
            for index in &entity.indexes {
                statements.push(format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    dialect.quote(&index.name),
                    dialect.quote(&entity.table),
                    quote_list(&index.columns, dialect)
                ));
            }
        }
    }

    Ok(statements)
}

/// Statements that drop every registered table, referrers first.
pub fn drop_statements(registry: &SchemaRegistry, dialect: Dialect) -> FixtureResult<Vec<String>> {
    let order = registry.creation_order()?;
    let mut statements: Vec<String> = order
        .iter()
        .rev()
        .map(|entity| format!("DROP TABLE IF EXISTS {}", dialect.quote(&entity.table)))
        .collect();

    if dialect == Dialect::PostgreSQL {
        for (name, _) in enum_types(&order) {
            statements.push(format!("DROP TYPE IF EXISTS {}", dialect.quote(name)));
        }
    }

    Ok(statements)
}

/// `CREATE TABLE` for a single entity.
pub fn create_table(entity: &EntityDefinition, dialect: Dialect) -> String {
    let primary_key = entity.primary_key_columns();
    let mut lines: Vec<String> = entity
        .columns
        .iter()
        .map(|column| column_sql(column, primary_key.contains(&column.name.as_str()), dialect))
        .collect();

    if !primary_key.is_empty() {
        lines.push(format!(
            "PRIMARY KEY ({})",
            primary_key
                .iter()
                .map(|c| dialect.quote(c))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    for fk in &entity.foreign_keys {
        let mut line = format!(
            "{}FOREIGN KEY ({}) REFERENCES {} ({})",
            constraint_prefix(fk.name.as_deref(), dialect),
            dialect.quote(&fk.column),
            dialect.quote(&fk.references_table),
            dialect.quote(&fk.references_column)
        );
        if fk.on_delete != ForeignKeyAction::NoAction {
            line.push_str(&format!(" ON DELETE {}", fk.on_delete));
        }
        lines.push(line);
    }

    for unique in &entity.unique_constraints {
        lines.push(format!(
            "{}UNIQUE ({})",
            constraint_prefix(unique.name.as_deref(), dialect),
            quote_list(&unique.columns, dialect)
        ));
    }

    for check in &entity.check_constraints {
        lines.push(format!(
            "{}CHECK ({})",
            constraint_prefix(check.name.as_deref(), dialect),
            check_sql(check, dialect)
        ));
    }

    if dialect == Dialect::MySQL {
        for index in &entity.indexes {
            lines.push(format!(
                "INDEX {} ({})",
                dialect.quote(&index.name),
                quote_list(&index.columns, dialect)
            ));
        }
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        dialect.quote(&entity.table),
        lines.join(",\n    ")
    )
}

fn column_sql(column: &ColumnDefinition, in_primary_key: bool, dialect: Dialect) -> String {
    let mut sql = format!(
        "{} {}",
        dialect.quote(&column.name),
        column_type_sql(column, dialect)
    );

    // SQLite fills a NULL rowid alias itself
    let rowid_alias = dialect == Dialect::SQLite && column.auto_increment;
    if (!column.nullable || in_primary_key) && !rowid_alias {
        sql.push_str(" NOT NULL");
    }
    if column.auto_increment && dialect == Dialect::MySQL {
        sql.push_str(" AUTO_INCREMENT");
    }
    if let (Dialect::SQLite, ColumnType::Enum { variants, .. }) = (dialect, &column.column_type) {
        sql.push_str(&format!(
            " CHECK ({} IN ({}))",
            dialect.quote(&column.name),
            literal_list(variants)
        ));
    }
    sql
}

fn column_type_sql(column: &ColumnDefinition, dialect: Dialect) -> String {
    match (&column.column_type, dialect) {
        (ColumnType::BigInt, Dialect::PostgreSQL) if column.auto_increment => {
            "BIGSERIAL".to_string()
        }
        (ColumnType::BigInt, Dialect::SQLite) if column.auto_increment => "INTEGER".to_string(),
        (ColumnType::BigInt, _) => "BIGINT".to_string(),
        (ColumnType::Integer, _) => "INTEGER".to_string(),
        (ColumnType::Varchar(len), _) => format!("VARCHAR({})", len),
        (ColumnType::Text, _) => "TEXT".to_string(),
        (ColumnType::Json, Dialect::MySQL) => "JSON".to_string(),
        (ColumnType::Json, Dialect::PostgreSQL) => "JSONB".to_string(),
        (ColumnType::Json, Dialect::SQLite) => "TEXT".to_string(),
        (ColumnType::Enum { variants, .. }, Dialect::MySQL) => {
            format!("ENUM({})", literal_list(variants))
        }
        (ColumnType::Enum { name, .. }, Dialect::PostgreSQL) => dialect.quote(name),
        (ColumnType::Enum { variants, .. }, Dialect::SQLite) => {
            let width = variants.iter().map(|v| v.len()).max().unwrap_or(1);
            format!("VARCHAR({})", width)
        }
        (ColumnType::Binary, Dialect::PostgreSQL) => "BYTEA".to_string(),
        (ColumnType::Binary, _) => "BLOB".to_string(),
    }
}

fn check_sql(check: &CheckConstraint, dialect: Dialect) -> String {
    match &check.predicate {
        CheckPredicate::Between { column, min, max } => {
            let column = dialect.quote(column);
            format!("{column} >= {min} AND {column} <= {max}")
        }
    }
}

fn create_enum_type(name: &str, variants: &[String]) -> String {
    // CREATE TYPE has no IF NOT EXISTS
    format!(
        "DO $$ BEGIN CREATE TYPE {} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END $$",
        Dialect::PostgreSQL.quote(name),
        literal_list(variants)
    )
}

/// Distinct enum types in first-use order.
fn enum_types<'a>(entities: &[&'a EntityDefinition]) -> Vec<(&'a str, &'a [String])> {
    let mut types: Vec<(&str, &[String])> = Vec::new();
    for &entity in entities {
        for column in &entity.columns {
            if let ColumnType::Enum { name, variants } = &column.column_type {
                if !types.iter().any(|(n, _)| *n == name.as_str()) {
                    types.push((name.as_str(), variants.as_slice()));
                }
            }
        }
    }
    types
}

fn constraint_prefix(name: Option<&str>, dialect: Dialect) -> String {
    name.map(|n| format!("CONSTRAINT {} ", dialect.quote(n)))
        .unwrap_or_default()
}

fn quote_list(columns: &[String], dialect: Dialect) -> String {
    columns
        .iter()
        .map(|c| dialect.quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn literal_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Model, Team, User, UserSetting};

    #[test]
    fn test_mysql_users_table() {
        let sql = create_table(&User::definition(), Dialect::MySQL);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `users`"));
        assert!(sql.contains("`id` BIGINT NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("`name` VARCHAR(255)"));
        assert!(sql.contains("`props` JSON NOT NULL"));
        assert!(sql.contains("`type` ENUM('USER') NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert!(sql.contains("FOREIGN KEY (`team_id`) REFERENCES `teams` (`id`)"));
        // properties are not columns
        assert!(!sql.contains("balance"));
    }

    #[test]
    fn test_postgres_users_table() {
        let sql = create_table(&User::definition(), Dialect::PostgreSQL);
        assert!(sql.contains("\"id\" BIGSERIAL NOT NULL"));
        assert!(sql.contains("\"props\" JSONB NOT NULL"));
        assert!(sql.contains("\"type\" \"usertype\" NOT NULL"));
    }

    #[test]
    fn test_team_parent_cascades() {
        let sql = create_table(&Team::definition(), Dialect::PostgreSQL);
        assert!(sql.contains(
            "FOREIGN KEY (\"parent_id\") REFERENCES \"teams\" (\"id\") ON DELETE CASCADE"
        ));
        assert!(sql.contains("FOREIGN KEY (\"company_id\") REFERENCES \"companies\" (\"id\")\n"));
    }

    #[test]
    fn test_user_settings_constraints() {
        let sql = create_table(&UserSetting::definition(), Dialect::MySQL);
        assert!(sql.contains("`id` BIGINT NOT NULL,"));
        assert!(!sql.contains("AUTO_INCREMENT"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert!(sql.contains("UNIQUE (`user_id`, `setting`)"));
        assert!(sql.contains("CHECK (`col1` >= 1 AND `col1` <= 5)"));
        assert!(sql.contains("INDEX `col2_idx` (`col2`)"));
    }

    #[test]
    fn test_sqlite_rowid_alias_and_enum_check() {
        let sql = create_table(&User::definition(), Dialect::SQLite);
        assert!(sql.contains("\"id\" INTEGER,"));
        assert!(sql.contains("\"type\" VARCHAR(4) NOT NULL CHECK (\"type\" IN ('USER'))"));
        assert!(sql.contains("\"props\" TEXT NOT NULL"));
    }

    #[test]
    fn test_create_statements_order_and_enum_type() {
        let registry = fixtures::registry().unwrap();
        let statements = create_statements(&registry, Dialect::PostgreSQL).unwrap();
        assert!(statements[0].contains("CREATE TYPE \"usertype\" AS ENUM ('USER')"));

        let position = |needle: &str| {
            statements
                .iter()
                .position(|s| s.contains(needle))
                .unwrap()
        };
        assert!(position("TABLE IF NOT EXISTS \"companies\"") < position("TABLE IF NOT EXISTS \"teams\""));
        assert!(position("TABLE IF NOT EXISTS \"users\"") < position("TABLE IF NOT EXISTS \"user_settings\""));
        assert!(statements.iter().any(|s| s
            == "CREATE INDEX IF NOT EXISTS \"col2_idx\" ON \"user_settings\" (\"col2\")"));
    }

    #[test]
    fn test_mysql_has_no_separate_index_statements() {
        let registry = fixtures::registry().unwrap();
        let statements = create_statements(&registry, Dialect::MySQL).unwrap();
        assert_eq!(statements.len(), registry.len());
        assert!(statements.iter().all(|s| !s.contains("CREATE TYPE")));
    }

    #[test]
    fn test_drop_statements_reverse_order() {
        let registry = fixtures::registry().unwrap();
        let statements = drop_statements(&registry, Dialect::PostgreSQL).unwrap();
        assert_eq!(statements.len(), registry.len() + 1);
        assert_eq!(
            statements.last().unwrap(),
            "DROP TYPE IF EXISTS \"usertype\""
        );
        let position = |table: &str| {
            statements
                .iter()
                .position(|s| s == &format!("DROP TABLE IF EXISTS \"{}\"", table))
                .unwrap()
        };
        assert!(position("user_settings") < position("users"));
        assert!(position("teams") < position("companies"));
    }
}
