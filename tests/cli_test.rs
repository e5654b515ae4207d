//! Tests for the command-line commands, driven through the argument parser.
//!
//! `ddl` needs no connection; `create`, `drop` and `pool-stats` run against a
//! temporary SQLite file given with `--url`.

use clap::Parser;
use orm_fixtures::commands;
use orm_fixtures::config::{Config, PoolOptions};
use orm_fixtures::db::{self, FixtureStore};
use orm_fixtures::fixtures;
use orm_fixtures::models::{ConnectionConfig, RowValues};
use orm_fixtures::FixtureError;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn parse(args: &[&str]) -> Config {
    let mut argv = vec!["orm-fixtures"];
    argv.extend_from_slice(args);
    Config::try_parse_from(argv).unwrap()
}

fn temp_sqlite_url() -> String {
    let path = NamedTempFile::new().unwrap().into_temp_path().keep().unwrap();
    format!("sqlite:{}", path.to_str().unwrap())
}

async fn open_store(url: &str) -> FixtureStore {
    let config = ConnectionConfig::new(url, PoolOptions::default()).unwrap();
    let pool = db::connect(&config).await.unwrap();
    FixtureStore::new(pool, Arc::new(fixtures::registry().unwrap()))
}

#[tokio::test]
async fn test_ddl_sqlite() {
    let output = commands::run(&parse(&["ddl", "--backend", "sqlite"])).await.unwrap();
    assert!(output.contains("CREATE TABLE IF NOT EXISTS \"users\""));
    assert!(output.contains("CREATE INDEX IF NOT EXISTS \"col2_idx\""));
    assert!(!output.contains("CREATE TYPE"));
    assert!(output.trim_end().ends_with(';'));
}

#[tokio::test]
async fn test_ddl_postgres_creates_enum_first() {
    let output = commands::run(&parse(&["ddl", "--backend", "postgres"])).await.unwrap();
    let enum_at = output.find("CREATE TYPE").unwrap();
    let users_at = output.find("CREATE TABLE IF NOT EXISTS \"users\"").unwrap();
    assert!(enum_at < users_at);
}

#[tokio::test]
async fn test_create_then_drop_on_sqlite_file() {
    let url = temp_sqlite_url();

    let output = commands::run(&parse(&["create", "--url", &url])).await.unwrap();
    assert!(output.is_empty());

    let store = open_store(&url).await;
    assert_eq!(store.count("User", &RowValues::new()).await.unwrap(), 0);
    store.insert("User", RowValues::new()).await.unwrap();
    assert_eq!(store.count("User", &RowValues::new()).await.unwrap(), 1);
    store.close().await;

    // create again is a no-op on existing tables
    commands::run(&parse(&["create", "--url", &url])).await.unwrap();
    let store = open_store(&url).await;
    assert_eq!(store.count("User", &RowValues::new()).await.unwrap(), 1);
    store.close().await;

    commands::run(&parse(&["drop", "--url", &url])).await.unwrap();
    let store = open_store(&url).await;
    assert!(store.count("User", &RowValues::new()).await.is_err());
    store.close().await;
}

#[tokio::test]
async fn test_pool_stats_rejects_sqlite() {
    let url = temp_sqlite_url();
    let err = commands::run(&parse(&["pool-stats", "--url", &url]))
        .await
        .unwrap_err();
    assert!(matches!(err, FixtureError::UnsupportedPoolKind { ref kind } if kind == "sqlite"));
}
