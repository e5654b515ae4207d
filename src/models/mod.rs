//! Data models for the fixture layer.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionConfigError, Dialect};
pub use schema::{
    AfterGet, CheckConstraint, CheckPredicate, ColumnDefinition, ColumnType, DefaultValue,
    EntityDefinition, ForeignKey, ForeignKeyAction, IndexDefinition, JsonProperty, PropertyKind,
    UniqueConstraint,
};
pub use value::{RowValues, SqlValue};
