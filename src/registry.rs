//! Schema registry.
//!
//! The registry is built once at startup and is read-only afterwards. It owns
//! every entity declaration and answers the questions the data-access layer
//! asks: which defaults apply to a row, how a raw record maps back onto
//! attributes, and in which order tables must be created.

use crate::error::{FixtureError, FixtureResult};
use crate::models::schema::{ColumnType, EntityDefinition};
use crate::models::value::{RowValues, SqlValue};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: Vec<EntityDefinition>,
    by_name: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every entity, then run the cross-entity checks.
    pub fn build(entities: impl IntoIterator<Item = EntityDefinition>) -> FixtureResult<Self> {
        let mut registry = Self::new();
        for entity in entities {
            registry.register(entity)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Record an entity. Fails on a name or table collision and on any
    /// constraint that references a column the entity does not declare.
    pub fn register(&mut self, entity: EntityDefinition) -> FixtureResult<()> {
        if self.by_name.contains_key(&entity.name) {
            return Err(FixtureError::duplicate_entity(&entity.name));
        }
        if let Some(other) = self.entities.iter().find(|e| e.table == entity.table) {
            return Err(FixtureError::invalid_constraint(
                &entity.name,
                format!("table '{}' already belongs to '{}'", entity.table, other.name),
            ));
        }
        entity.validate()?;

        debug!(entity = %entity.name, table = %entity.table, "Registered entity");
        self.by_name.insert(entity.name.clone(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    /// Cross-entity checks: foreign key targets exist and do not form a cycle.
    pub fn validate(&self) -> FixtureResult<()> {
        for entity in &self.entities {
            for fk in &entity.foreign_keys {
                let target = self.entity_by_table(&fk.references_table).ok_or_else(|| {
                    FixtureError::invalid_constraint(
                        &entity.name,
                        format!(
                            "foreign key '{}' references unknown table '{}'",
                            fk.column, fk.references_table
                        ),
                    )
                })?;
                if !target.columns.iter().any(|c| c.name == fk.references_column) {
                    return Err(FixtureError::invalid_constraint(
                        &entity.name,
                        format!(
                            "foreign key '{}' references nonexistent column '{}.{}'",
                            fk.column, fk.references_table, fk.references_column
                        ),
                    ));
                }
            }
        }
        self.creation_order().map(|_| ())
    }

    pub fn entity(&self, name: &str) -> FixtureResult<&EntityDefinition> {
        self.by_name
            .get(name)
            .map(|&idx| &self.entities[idx])
            .ok_or_else(|| FixtureError::unknown_entity(name))
    }

    pub fn entity_by_table(&self, table: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.table == table)
    }

    /// Entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDefinition> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Default for `field` (a column or a JSON property) given the row built so far.
    ///
    /// Returns `None` when the field has no default.
    pub fn default_for(
        &self,
        entity: &str,
        field: &str,
        ctx: &RowValues,
    ) -> FixtureResult<Option<SqlValue>> {
        let definition = self.entity(entity)?;
        if let Some(column) = definition.column(field) {
            return Ok(column.default.as_ref().map(|d| d.resolve(ctx)));
        }
        if let Some(property) = definition.property(field) {
            return Ok(property.default.as_ref().map(|d| d.resolve(ctx)));
        }
        Err(FixtureError::unknown_column(entity, field))
    }

    /// Complete an insert row: canonicalize keys to attributes, fill column
    /// defaults in declaration order and pack JSON properties into their document.
    pub fn prepare_insert(&self, entity: &str, row: RowValues) -> FixtureResult<RowValues> {
        let definition = self.entity(entity)?;

        let mut prepared = RowValues::new();
        let mut properties = Map::new();
        for (key, value) in row {
            if let Some(column) = definition.column(&key) {
                prepared.set(column.attribute.clone(), value);
            } else if let Some(property) = definition.property(&key) {
                properties.insert(property.name.clone(), value.to_json());
            } else {
                return Err(FixtureError::unknown_column(entity, key));
            }
        }

        for column in &definition.columns {
            if prepared.contains(&column.attribute) {
                continue;
            }
            if let Some(default) = &column.default {
                let value = default.resolve(&prepared);
                prepared.set(column.attribute.clone(), value);
            }
        }

        if let Some(column) = definition.property_column() {
            let mut document = match prepared.remove(&column.attribute) {
                None | Some(SqlValue::Null) => Map::new(),
                Some(SqlValue::Json(JsonValue::Object(map))) => map,
                Some(SqlValue::Text(text)) => match serde_json::from_str::<JsonValue>(&text)? {
                    JsonValue::Object(map) => map,
                    _ => {
                        return Err(FixtureError::invalid_value(
                            &column.attribute,
                            "expected a JSON object",
                        ));
                    }
                },
                Some(other) => {
                    return Err(FixtureError::invalid_value(
                        &column.attribute,
                        format!("expected a JSON object, got {}", other.type_name()),
                    ));
                }
            };
            document.extend(properties);
            for property in &definition.properties {
                if document.contains_key(&property.name) {
                    continue;
                }
                if let Some(default) = &property.default {
                    document.insert(property.name.clone(), default.resolve(&prepared).to_json());
                }
            }
            for property in &definition.properties {
                if let Some(value) = document.get(&property.name) {
                    property.check(value)?;
                }
            }
            prepared.set(column.attribute.clone(), JsonValue::Object(document));
        }

        Ok(prepared)
    }

    /// Map a raw record keyed by column names onto attributes, parse JSON
    /// documents stored as text and flatten properties through their
    /// after-get transforms.
    pub fn decode_record(
        &self,
        entity: &str,
        mut raw: Map<String, JsonValue>,
    ) -> FixtureResult<Map<String, JsonValue>> {
        let definition = self.entity(entity)?;
        let mut record = Map::new();

        for column in &definition.columns {
            let value = match raw.remove(&column.name) {
                Some(JsonValue::String(text)) if column.column_type == ColumnType::Json => {
                    serde_json::from_str(&text)?
                }
                Some(value) => value,
                None => JsonValue::Null,
            };
            record.insert(column.attribute.clone(), value);
        }

        if let Some(column) = definition.property_column() {
            let document = record
                .get(&column.attribute)
                .cloned()
                .unwrap_or(JsonValue::Null);
            for property in &definition.properties {
                record.insert(property.name.clone(), property.read(&document)?);
            }
        }

        Ok(record)
    }

    /// Entities ordered so every referenced table precedes its referrers.
    /// Self-references are ignored; any other cycle is a configuration error.
    pub fn creation_order(&self) -> FixtureResult<Vec<&EntityDefinition>> {
        let mut pending: Vec<&EntityDefinition> = self.entities.iter().collect();
        let mut ordered: Vec<&EntityDefinition> = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let ready = pending.iter().position(|entity| {
                entity.foreign_keys.iter().all(|fk| {
                    fk.references_table == entity.table
                        || ordered.iter().any(|done| done.table == fk.references_table)
                        || self.entity_by_table(&fk.references_table).is_none()
                })
            });
            match ready {
                Some(idx) => ordered.push(pending.remove(idx)),
                None => {
                    let names: Vec<&str> = pending.iter().map(|e| e.name.as_str()).collect();
                    return Err(FixtureError::invalid_constraint(
                        names.join(", "),
                        "foreign keys form a cycle",
                    ));
                }
            }
        }

        Ok(ordered)
    }
}
