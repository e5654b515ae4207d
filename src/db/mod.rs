//! Database access layer.
//!
//! This module provides:
//! - DDL and row-level statement rendering per dialect
//! - Parameter binding and row decoding per driver
//! - Connection pools and the pool introspector
//! - The fixture store that runs it all against a live database

pub mod ddl;
pub mod dml;
pub mod params;
pub mod pool;
pub mod store;
pub mod types;

pub use dml::Statement;
pub use pool::{DbPool, PoolStats, connect};
pub use store::{FixtureStore, Record};
