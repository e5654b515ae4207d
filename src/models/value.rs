//! Typed values bound into fixture statements.
//!
//! `SqlValue` is what defaults produce and what the binders in
//! [`crate::db::params`] consume. `RowValues` is an ordered attribute/value
//! map used both for insert rows and equality filters.

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A single value destined for a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    Text(String),
    Json(JsonValue),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Render the value as it is stored inside a JSON document.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(v) => JsonValue::Bool(*v),
            Self::Int(v) => JsonValue::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(v) => JsonValue::String(v.clone()),
            Self::Json(v) => v.clone(),
            Self::Bytes(v) => {
                use base64::{Engine as _, engine::general_purpose::STANDARD};
                JsonValue::String(STANDARD.encode(v))
            }
            Self::Timestamp(v) => JsonValue::String(v.format(crate::models::schema::DATETIME_FORMAT).to_string()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Attribute-keyed values for one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowValues {
    values: BTreeMap<String, SqlValue>,
}

impl RowValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<SqlValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SqlValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<SqlValue> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SqlValue)> {
        self.values.iter()
    }

    /// Integer value under `key`, if present and integral.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(SqlValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Text value under `key`, if present.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(SqlValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl IntoIterator for RowValues {
    type Item = (String, SqlValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_option_into_sql_value() {
        let none: Option<i64> = None;
        assert_eq!(SqlValue::from(none), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[test]
    fn test_timestamp_to_json() {
        let epoch = DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        assert_eq!(
            SqlValue::Timestamp(epoch).to_json(),
            JsonValue::String("1970-01-01T00:00:00".to_string())
        );
    }

    #[test]
    fn test_bytes_to_json_is_base64() {
        assert_eq!(
            SqlValue::Bytes(b"logo".to_vec()).to_json(),
            JsonValue::String("bG9nbw==".to_string())
        );
    }

    #[test]
    fn test_row_values_accessors() {
        let mut row = RowValues::new().with("id", 7i64).with("name", "ops");
        assert_eq!(row.get_i64("id"), Some(7));
        assert_eq!(row.get_str("name"), Some("ops"));
        assert_eq!(row.get_i64("name"), None);
        row.set("id", 8i64);
        assert_eq!(row.get_i64("id"), Some(8));
        assert_eq!(row.remove("name"), Some(SqlValue::Text("ops".into())));
        assert_eq!(row.len(), 1);
    }
}
