//! Schema declaration models.
//!
//! This module defines the building blocks an entity is declared with:
//! columns, client-side defaults, JSON properties and table constraints.
//! Declarations are plain data; [`crate::registry::SchemaRegistry`] validates
//! them and [`crate::db::ddl`] renders them.

use crate::error::{FixtureError, FixtureResult};
use crate::models::value::{RowValues, SqlValue};
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;

/// Text form of datetimes stored in JSON documents.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Logical column type; each dialect renders its own spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Integer,
    Varchar(u32),
    Text,
    Json,
    Enum { name: String, variants: Vec<String> },
    Binary,
}

impl ColumnType {
    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        Self::Enum {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::BigInt | Self::Integer)
    }
}

/// How a value is produced when an insert row omits it.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(SqlValue),
    Computed(Arc<dyn Fn() -> SqlValue + Send + Sync>),
    /// Receives the partially built insert row.
    FromContext(Arc<dyn Fn(&RowValues) -> SqlValue + Send + Sync>),
}

impl DefaultValue {
    pub fn literal(value: impl Into<SqlValue>) -> Self {
        Self::Literal(value.into())
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> SqlValue + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    pub fn from_context<F>(f: F) -> Self
    where
        F: Fn(&RowValues) -> SqlValue + Send + Sync + 'static,
    {
        Self::FromContext(Arc::new(f))
    }

    pub fn resolve(&self, ctx: &RowValues) -> SqlValue {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Computed(f) => f(),
            Self::FromContext(f) => f(ctx),
        }
    }

}

impl std::fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
            Self::FromContext(_) => f.write_str("FromContext(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    /// Column name in the database
    pub name: String,
    /// Key used by rows and decoded records; equals `name` unless renamed
    pub attribute: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub auto_increment: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnDefinition {
    /// Create a new nullable column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            attribute: name.clone(),
            name,
            column_type,
            nullable: true,
            is_primary_key: false,
            auto_increment: false,
            default: None,
        }
    }

    /// Expose the column under a different attribute name.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    /// Mark as (part of) the primary key. Primary key columns are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    /// Let the database assign the value.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// True if `key` names this column by attribute or database name.
    pub fn matches(&self, key: &str) -> bool {
        self.attribute == key || self.name == key
    }
}

/// Value kind of a property stored inside a JSON column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    Integer,
    DateTime,
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "a string"),
            Self::Integer => write!(f, "an integer"),
            Self::DateTime => write!(f, "a datetime"),
        }
    }
}

/// Transform applied to a property value when a record is read.
pub type AfterGet = fn(Option<&JsonValue>) -> FixtureResult<JsonValue>;

/// A named value kept inside an entity's JSON document instead of its own column.
#[derive(Debug, Clone)]
pub struct JsonProperty {
    pub name: String,
    pub kind: PropertyKind,
    pub default: Option<DefaultValue>,
    pub after_get: Option<AfterGet>,
}

impl JsonProperty {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            after_get: None,
        }
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_after_get(mut self, after_get: AfterGet) -> Self {
        self.after_get = Some(after_get);
        self
    }

    /// Reject a stored value that does not match `kind`. Null is always allowed.
    pub fn check(&self, value: &JsonValue) -> FixtureResult<()> {
        let ok = match (self.kind, value) {
            (_, JsonValue::Null) => true,
            (PropertyKind::Integer, JsonValue::Number(n)) => n.is_i64() || n.is_u64(),
            (PropertyKind::String, JsonValue::String(_)) => true,
            (PropertyKind::DateTime, JsonValue::String(s)) => {
                NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).is_ok()
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(FixtureError::invalid_value(
                &self.name,
                format!("expected {}, got {}", self.kind, value),
            ))
        }
    }

    /// Read this property out of a JSON document, applying `after_get`.
    pub fn read(&self, document: &JsonValue) -> FixtureResult<JsonValue> {
        let raw = document.get(&self.name);
        match self.after_get {
            Some(transform) => transform(raw),
            None => Ok(raw.cloned().unwrap_or(JsonValue::Null)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            name: None,
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
            on_delete: ForeignKeyAction::NoAction,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyAction {
    /// No action (error if referenced)
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl std::fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAction => write!(f, "NO ACTION"),
            Self::Restrict => write!(f, "RESTRICT"),
            Self::Cascade => write!(f, "CASCADE"),
            Self::SetNull => write!(f, "SET NULL"),
            Self::SetDefault => write!(f, "SET DEFAULT"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Predicate of a check constraint.
#[derive(Debug, Clone)]
pub enum CheckPredicate {
    /// `column >= min AND column <= max`
    Between { column: String, min: i64, max: i64 },
}

#[derive(Debug, Clone)]
pub struct CheckConstraint {
    pub name: Option<String>,
    pub predicate: CheckPredicate,
}

impl CheckConstraint {
    pub fn between(column: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: None,
            predicate: CheckPredicate::Between {
                column: column.into(),
                min,
                max,
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn columns(&self) -> Vec<&str> {
        match &self.predicate {
            CheckPredicate::Between { column, .. } => vec![column.as_str()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A registered entity: its table, columns, constraints and properties.
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    pub name: String,
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    /// Declared apart from the columns; exclusive with inline primary keys
    pub primary_key: Option<Vec<String>>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub check_constraints: Vec<CheckConstraint>,
    pub indexes: Vec<IndexDefinition>,
    /// Attribute of the JSON column that stores `properties`
    pub property_column: Option<String>,
    pub properties: Vec<JsonProperty>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
            check_constraints: Vec::new(),
            indexes: Vec::new(),
            property_column: None,
            properties: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare the primary key separately from the column definitions.
    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_unique(mut self, unique: UniqueConstraint) -> Self {
        self.unique_constraints.push(unique);
        self
    }

    pub fn with_check(mut self, check: CheckConstraint) -> Self {
        self.check_constraints.push(check);
        self
    }

    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Store `properties` inside the JSON column named by `column` (attribute or name).
    pub fn with_properties(mut self, column: impl Into<String>, properties: Vec<JsonProperty>) -> Self {
        self.property_column = Some(column.into());
        self.properties = properties;
        self
    }

    /// Look up a column by attribute or database name.
    pub fn column(&self, key: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.attribute == key)
            .or_else(|| self.columns.iter().find(|c| c.name == key))
    }

    pub fn property(&self, name: &str) -> Option<&JsonProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// The JSON column holding the properties, if any.
    pub fn property_column(&self) -> Option<&ColumnDefinition> {
        self.property_column.as_deref().and_then(|key| self.column(key))
    }

    /// Primary key column names, whichever way they were declared.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        match &self.primary_key {
            Some(columns) => columns.iter().map(String::as_str).collect(),
            None => self
                .columns
                .iter()
                .filter(|c| c.is_primary_key)
                .map(|c| c.name.as_str())
                .collect(),
        }
    }

    /// The auto-increment surrogate key, if the entity has one.
    pub fn generated_key(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.auto_increment)
    }

    /// Checks that only need this entity. Cross-entity checks live in the registry.
    pub fn validate(&self) -> FixtureResult<()> {
        let invalid = |message: String| FixtureError::invalid_constraint(&self.name, message);

        if self.columns.is_empty() {
            return Err(invalid("entity declares no columns".to_string()));
        }

        let mut names = HashSet::new();
        let mut attributes = HashSet::new();
        for column in &self.columns {
            if !names.insert(column.name.as_str()) {
                return Err(invalid(format!("column '{}' declared twice", column.name)));
            }
            if !attributes.insert(column.attribute.as_str()) {
                return Err(invalid(format!(
                    "attribute '{}' declared twice",
                    column.attribute
                )));
            }
            if column.auto_increment && !column.column_type.is_integer() {
                return Err(invalid(format!(
                    "auto-increment column '{}' must be an integer",
                    column.name
                )));
            }
        }

        let has_column = |name: &str| self.columns.iter().any(|c| c.name == name);
        let require = |what: &str, name: &str| {
            if has_column(name) {
                Ok(())
            } else {
                Err(invalid(format!(
                    "{} references nonexistent column '{}'",
                    what, name
                )))
            }
        };

        if let Some(primary_key) = &self.primary_key {
            if self.columns.iter().any(|c| c.is_primary_key) {
                return Err(invalid(
                    "primary key declared both inline and as a constraint".to_string(),
                ));
            }
            if primary_key.is_empty() {
                return Err(invalid("primary key constraint has no columns".to_string()));
            }
            for column in primary_key {
                require("primary key", column)?;
            }
        }

        for column in self.columns.iter().filter(|c| c.auto_increment) {
            if self.primary_key_columns() != [column.name.as_str()] {
                return Err(invalid(format!(
                    "auto-increment column '{}' must be the sole primary key",
                    column.name
                )));
            }
        }

        for fk in &self.foreign_keys {
            require("foreign key", &fk.column)?;
        }
        for unique in &self.unique_constraints {
            if unique.columns.is_empty() {
                return Err(invalid("unique constraint has no columns".to_string()));
            }
            for column in &unique.columns {
                require("unique constraint", column)?;
            }
        }
        for check in &self.check_constraints {
            for column in check.columns() {
                require("check constraint", column)?;
            }
        }
        for index in &self.indexes {
            if index.columns.is_empty() {
                return Err(invalid(format!("index '{}' has no columns", index.name)));
            }
            for column in &index.columns {
                require("index", column)?;
            }
        }

        if !self.properties.is_empty() {
            let Some(column) = self.property_column() else {
                return Err(invalid(format!(
                    "properties stored in nonexistent column '{}'",
                    self.property_column.as_deref().unwrap_or_default()
                )));
            };
            if column.column_type != ColumnType::Json {
                return Err(invalid(format!(
                    "properties require a JSON column, '{}' is not one",
                    column.name
                )));
            }
            let mut seen = HashSet::new();
            for property in &self.properties {
                if self.column(&property.name).is_some() {
                    return Err(invalid(format!(
                        "property '{}' shadows a column",
                        property.name
                    )));
                }
                if !seen.insert(property.name.as_str()) {
                    return Err(invalid(format!(
                        "property '{}' declared twice",
                        property.name
                    )));
                }
            }
        }

        Ok(())
    }
}
