//! ORM Fixtures Library
//!
//! Schema declarations and helpers for exercising an ORM against MySQL and
//! PostgreSQL: a schema registry with client-side defaults, the fixture
//! entities, dialect-specific DDL/DML and a pool introspector.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod registry;

pub use config::Config;
pub use db::{DbPool, FixtureStore, PoolStats};
pub use error::{FixtureError, FixtureResult};
pub use registry::SchemaRegistry;
