//! `Team` and `Company` fixtures.
//!
//! Both carry a process-local membership set that is never persisted and is
//! skipped when a record is deserialized.

use crate::fixtures::random::random_name;
use crate::fixtures::user::User;
use crate::fixtures::{Keyed, MemberSet, Model};
use crate::models::schema::{
    ColumnDefinition, ColumnType, DefaultValue, EntityDefinition, ForeignKey, ForeignKeyAction,
};
use crate::models::value::SqlValue;
use serde::Deserialize;

pub const TEAMS_TABLE: &str = "teams";
pub const COMPANIES_TABLE: &str = "companies";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: Option<String>,
    pub parent_id: Option<i64>,
    pub company_id: Option<i64>,
    #[serde(skip)]
    members: MemberSet<User>,
}

impl Team {
    /// A team that has not been loaded from a table.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            parent_id: None,
            company_id: None,
            members: MemberSet::default(),
        }
    }

    /// Add `user` to the in-memory member set; adding the same user twice is a no-op.
    pub fn add_member(&mut self, user: User) -> bool {
        self.members.insert(user)
    }

    pub fn members(&self) -> &MemberSet<User> {
        &self.members
    }
}

impl Keyed for Team {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Model for Team {
    const ENTITY: &'static str = "Team";

    fn definition() -> EntityDefinition {
        EntityDefinition::new(Self::ENTITY, TEAMS_TABLE)
            .with_column(
                ColumnDefinition::new("id", ColumnType::BigInt)
                    .primary_key()
                    .auto_increment(),
            )
            .with_column(
                ColumnDefinition::new("name", ColumnType::Varchar(255))
                    .with_default(DefaultValue::computed(|| SqlValue::Text(random_name()))),
            )
            .with_column(ColumnDefinition::new("parent_id", ColumnType::BigInt))
            .with_column(ColumnDefinition::new("company_id", ColumnType::BigInt))
            .with_foreign_key(
                ForeignKey::new("parent_id", TEAMS_TABLE, "id")
                    .with_on_delete(ForeignKeyAction::Cascade),
            )
            .with_foreign_key(ForeignKey::new("company_id", COMPANIES_TABLE, "id"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: Option<String>,
    #[serde(default, with = "base64_bytes")]
    pub logo: Option<Vec<u8>>,
    #[serde(skip)]
    teams: MemberSet<Team>,
}

impl Company {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            logo: None,
            teams: MemberSet::default(),
        }
    }

    /// Add `team` to the in-memory team set; adding the same team twice is a no-op.
    pub fn add_team(&mut self, team: Team) -> bool {
        self.teams.insert(team)
    }

    pub fn teams(&self) -> &MemberSet<Team> {
        &self.teams
    }
}

impl Model for Company {
    const ENTITY: &'static str = "Company";

    fn definition() -> EntityDefinition {
        EntityDefinition::new(Self::ENTITY, COMPANIES_TABLE)
            .with_column(
                ColumnDefinition::new("id", ColumnType::BigInt)
                    .primary_key()
                    .auto_increment(),
            )
            .with_column(
                ColumnDefinition::new("name", ColumnType::Varchar(255))
                    .with_default(DefaultValue::computed(|| SqlValue::Text(random_name()))),
            )
            .with_column(ColumnDefinition::new("logo", ColumnType::Binary))
    }
}

/// Binary columns come back from the row decoder base64 encoded.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => STANDARD
                .decode(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
