//! The `User` fixture.
//!
//! `realname`, `age`, `balance` and `birthday` are not columns: they live in
//! the `profile` JSON document (stored in the `props` column) and are
//! flattened back out when a record is decoded.

use crate::error::{FixtureError, FixtureResult};
use crate::fixtures::random::random_name;
use crate::fixtures::team::TEAMS_TABLE;
use crate::fixtures::{Keyed, Model};
use crate::models::schema::{
    ColumnDefinition, ColumnType, DefaultValue, EntityDefinition, ForeignKey, JsonProperty,
    PropertyKind,
};
use crate::models::value::SqlValue;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const USERS_TABLE: &str = "users";
pub const USER_TYPE_ENUM: &str = "usertype";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UserType {
    #[default]
    #[serde(rename = "USER")]
    User,
}

impl UserType {
    pub const VARIANTS: &'static [&'static str] = &["USER"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    pub nickname: Option<String>,
    #[serde(default)]
    pub profile: JsonValue,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub realname: Option<String>,
    pub age: Option<i64>,
    /// Always present: a stored null reads back as 0.0
    pub balance: f64,
    pub birthday: Option<NaiveDateTime>,
    pub team_id: Option<i64>,
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}<{}>",
            self.nickname.as_deref().unwrap_or("None"),
            self.id
        )
    }
}

impl Keyed for User {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Model for User {
    const ENTITY: &'static str = "User";

    fn definition() -> EntityDefinition {
        EntityDefinition::new(Self::ENTITY, USERS_TABLE)
            .with_column(
                ColumnDefinition::new("id", ColumnType::BigInt)
                    .primary_key()
                    .auto_increment(),
            )
            .with_column(
                ColumnDefinition::new("name", ColumnType::Varchar(255))
                    .with_attribute("nickname")
                    .with_default(DefaultValue::computed(|| SqlValue::Text(random_name()))),
            )
            .with_column(
                ColumnDefinition::new("props", ColumnType::Json)
                    .with_attribute("profile")
                    .not_null()
                    .with_default(DefaultValue::literal(serde_json::json!({}))),
            )
            .with_column(
                ColumnDefinition::new(
                    "type",
                    ColumnType::enumeration(USER_TYPE_ENUM, UserType::VARIANTS),
                )
                .not_null()
                .with_default(DefaultValue::literal(UserType::User.as_str())),
            )
            .with_column(ColumnDefinition::new("team_id", ColumnType::BigInt))
            .with_foreign_key(ForeignKey::new("team_id", TEAMS_TABLE, "id"))
            .with_properties(
                "profile",
                vec![
                    JsonProperty::new("realname", PropertyKind::String),
                    JsonProperty::new("age", PropertyKind::Integer)
                        .with_default(DefaultValue::literal(18i64)),
                    JsonProperty::new("balance", PropertyKind::Integer)
                        .with_default(DefaultValue::literal(0i64))
                        .with_after_get(balance_after_get),
                    JsonProperty::new("birthday", PropertyKind::DateTime)
                        .with_default(DefaultValue::from_context(|_| SqlValue::from(epoch()))),
                ],
            )
    }
}

fn epoch() -> NaiveDateTime {
    DateTime::<Utc>::UNIX_EPOCH.naive_utc()
}

/// Read-side transform for `balance`: null or missing becomes 0.0, anything
/// else is cast to a float.
pub fn normalize_balance(raw: Option<&JsonValue>) -> FixtureResult<f64> {
    let invalid = |message: String| FixtureError::invalid_value("balance", message);
    match raw {
        None | Some(JsonValue::Null) => Ok(0.0),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{} is not representable as a float", n))),
        Some(JsonValue::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("'{}' is not a number", s))),
        Some(other) => Err(invalid(format!("cannot cast {} to a float", other))),
    }
}

fn balance_after_get(raw: Option<&JsonValue>) -> FixtureResult<JsonValue> {
    let value = normalize_balance(raw)?;
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .ok_or_else(|| FixtureError::invalid_value("balance", format!("{} is not finite", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_balance_null_is_zero() {
        assert_eq!(normalize_balance(None).unwrap(), 0.0);
        assert_eq!(normalize_balance(Some(&JsonValue::Null)).unwrap(), 0.0);
    }

    #[test]
    fn test_normalize_balance_casts_numbers() {
        assert_eq!(normalize_balance(Some(&json!(42))).unwrap(), 42.0);
        assert_eq!(normalize_balance(Some(&json!(-3))).unwrap(), -3.0);
        assert_eq!(normalize_balance(Some(&json!(2.5))).unwrap(), 2.5);
        assert_eq!(normalize_balance(Some(&json!("7.25"))).unwrap(), 7.25);
        assert_eq!(normalize_balance(Some(&json!(true))).unwrap(), 1.0);
    }

    #[test]
    fn test_normalize_balance_rejects_garbage() {
        assert!(normalize_balance(Some(&json!("lots"))).is_err());
        assert!(normalize_balance(Some(&json!([1]))).is_err());
    }

    #[test]
    fn test_balance_after_get_never_null() {
        assert_eq!(balance_after_get(None).unwrap(), json!(0.0));
        assert_eq!(balance_after_get(Some(&json!(10))).unwrap(), json!(10.0));
    }

    #[test]
    fn test_definition_is_valid() {
        let definition = User::definition();
        assert!(definition.validate().is_ok());
        assert_eq!(definition.column("nickname").unwrap().name, "name");
        assert_eq!(definition.column("profile").unwrap().name, "props");
        assert_eq!(definition.generated_key().unwrap().name, "id");
        assert_eq!(definition.properties.len(), 4);
    }

    #[test]
    fn test_deserialize_decoded_record() {
        let user: User = serde_json::from_value(json!({
            "id": 3,
            "nickname": "abcdEFGH",
            "profile": { "age": 18, "balance": 0 },
            "type": "USER",
            "realname": null,
            "age": 18,
            "balance": 0.0,
            "birthday": "1970-01-01T00:00:00",
            "team_id": null
        }))
        .unwrap();
        assert_eq!(user.user_type, UserType::User);
        assert_eq!(user.birthday, Some(epoch()));
        assert_eq!(user.balance, 0.0);
        assert_eq!(user.to_string(), "abcdEFGH<3>");
    }
}
