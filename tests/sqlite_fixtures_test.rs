//! Integration tests for the fixture schema on SQLite.
//!
//! Tests verify that:
//! - Generated names and JSON property defaults are filled on insert
//! - A null balance reads back as 0.0
//! - Property values of the wrong kind are rejected on insert
//! - The unique, check and foreign key constraints are enforced
//! - Deleting a parent team cascades to its children
//! - The pool introspector rejects SQLite pools

use orm_fixtures::config::PoolOptions;
use orm_fixtures::db::{self, DbPool, FixtureStore};
use orm_fixtures::fixtures::{self, Company, Friendship, Team, User, UserSetting, UserType};
use orm_fixtures::models::{ConnectionConfig, RowValues, SqlValue};
use orm_fixtures::FixtureError;
use serde_json::json;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Create a SQLite database file with the fixture schema.
async fn setup_store() -> FixtureStore {
    setup_store_with(PoolOptions::default()).await
}

async fn setup_store_with(pool_options: PoolOptions) -> FixtureStore {
    let temp_file = NamedTempFile::new().unwrap();
    // Keep the temp file alive - prevent deletion when function returns
    let db_path = temp_file
        .into_temp_path()
        .keep()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let config = ConnectionConfig::new(format!("sqlite:{}", db_path), pool_options).unwrap();
    let pool = db::connect(&config).await.unwrap();
    let store = FixtureStore::new(pool, Arc::new(fixtures::registry().unwrap()));
    store.create_all().await.unwrap();
    store
}

async fn insert_user(store: &FixtureStore) -> i64 {
    let row = store.insert("User", RowValues::new()).await.unwrap();
    row.get_i64("id").unwrap()
}

fn setting(id: i64, user_id: i64, name: &str) -> RowValues {
    RowValues::new()
        .with("id", id)
        .with("user_id", user_id)
        .with("setting", name)
        .with("value", "on")
}

#[tokio::test]
async fn test_user_defaults_round_trip() {
    let store = setup_store().await;
    let id = insert_user(&store).await;

    let users = store
        .fetch::<User>(&RowValues::new().with("id", id))
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    let user = &users[0];

    let nickname = user.nickname.as_deref().unwrap();
    assert_eq!(nickname.len(), 8);
    assert!(nickname.chars().all(|c| c.is_ascii_alphabetic()));
    assert_eq!(user.user_type, UserType::User);
    assert_eq!(user.age, Some(18));
    assert_eq!(user.balance, 0.0);
    assert_eq!(user.birthday.unwrap().and_utc().timestamp(), 0);
    assert_eq!(user.realname, None);
    assert_eq!(user.team_id, None);
}

#[tokio::test]
async fn test_generated_names_differ() {
    let store = setup_store().await;
    let a = store.insert("User", RowValues::new()).await.unwrap();
    let b = store.insert("User", RowValues::new()).await.unwrap();
    assert_ne!(a.get_i64("id"), b.get_i64("id"));
    assert_ne!(a.get_str("nickname"), b.get_str("nickname"));
}

#[tokio::test]
async fn test_explicit_values_win_over_defaults() {
    let store = setup_store().await;
    let row = RowValues::new()
        .with("nickname", "fixed")
        .with("realname", "Ada")
        .with("age", 36i64)
        .with("balance", 12i64);
    let written = store.insert("User", row).await.unwrap();
    let id = written.get_i64("id").unwrap();

    let user = store
        .fetch::<User>(&RowValues::new().with("id", id))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(user.nickname.as_deref(), Some("fixed"));
    assert_eq!(user.realname.as_deref(), Some("Ada"));
    assert_eq!(user.age, Some(36));
    assert_eq!(user.balance, 12.0);
}

#[tokio::test]
async fn test_mistyped_property_is_rejected_before_writing() {
    let store = setup_store().await;
    let err = store
        .insert("User", RowValues::new().with("age", "old"))
        .await
        .unwrap_err();
    assert!(matches!(err, FixtureError::InvalidValue { .. }), "unexpected error: {err:?}");

    let err = store
        .insert("User", RowValues::new().with("birthday", "someday"))
        .await
        .unwrap_err();
    assert!(matches!(err, FixtureError::InvalidValue { .. }));

    // nothing was written, and every stored user still loads
    assert_eq!(store.count("User", &RowValues::new()).await.unwrap(), 0);
    insert_user(&store).await;
    assert_eq!(store.fetch::<User>(&RowValues::new()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_null_balance_reads_as_zero() {
    let store = setup_store().await;
    let row = RowValues::new().with("profile", json!({ "balance": null }));
    let id = store.insert("User", row).await.unwrap().get_i64("id").unwrap();

    let records = store
        .fetch_all("User", &RowValues::new().with("id", id))
        .await
        .unwrap();
    assert_eq!(records[0]["profile"]["balance"], json!(null));
    assert_eq!(records[0]["balance"], json!(0.0));

    let user = store
        .fetch::<User>(&RowValues::new().with("id", id))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(user.balance, 0.0);
}

#[tokio::test]
async fn test_duplicate_user_setting_is_unique_violation() {
    let store = setup_store().await;
    let user_id = insert_user(&store).await;

    store.insert("UserSetting", setting(1, user_id, "theme")).await.unwrap();
    let err = store
        .insert("UserSetting", setting(2, user_id, "theme"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "unexpected error: {err:?}");

    // a different setting for the same user is fine
    store.insert("UserSetting", setting(3, user_id, "lang")).await.unwrap();
    assert_eq!(store.count("UserSetting", &RowValues::new()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_col1_range_check() {
    let store = setup_store().await;
    let user_id = insert_user(&store).await;

    for (id, col1) in [(1i64, 0i64), (2, 6)] {
        let row = setting(id, user_id, &format!("s{id}")).with("col1", col1);
        let err = store.insert("UserSetting", row).await.unwrap_err();
        assert!(err.is_check_violation(), "col1={col1}: {err:?}");
    }

    for col1 in 1i64..=5 {
        let id = 10 + col1;
        let row = setting(id, user_id, &format!("s{id}")).with("col1", col1);
        store.insert("UserSetting", row).await.unwrap();
    }

    let settings = store.fetch::<UserSetting>(&RowValues::new()).await.unwrap();
    assert_eq!(settings.len(), 5);
    assert!(settings.iter().all(|s| s.col2 == Some(2)));
}

#[tokio::test]
async fn test_setting_for_missing_user_is_foreign_key_violation() {
    let store = setup_store().await;
    let err = store
        .insert("UserSetting", setting(1, 999, "theme"))
        .await
        .unwrap_err();
    assert!(err.is_foreign_key_violation(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_deleting_parent_team_cascades() {
    let store = setup_store().await;
    let parent = store.insert_model::<Team>(RowValues::new()).await.unwrap();
    let child = store
        .insert_model::<Team>(RowValues::new().with("parent_id", parent.id))
        .await
        .unwrap();
    assert_eq!(child.parent_id, Some(parent.id));
    assert_eq!(store.count("Team", &RowValues::new()).await.unwrap(), 2);

    let deleted = store
        .delete("Team", &RowValues::new().with("id", parent.id))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(store.count("Team", &RowValues::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_company_logo_and_membership() {
    let store = setup_store().await;
    let row = RowValues::new()
        .with("name", "Acme")
        .with("logo", SqlValue::Bytes(vec![0x89, 0x50, 0x4E, 0x47]));
    let mut company = store.insert_model::<Company>(row).await.unwrap();
    assert_eq!(company.logo.as_deref(), Some(&[0x89, 0x50, 0x4E, 0x47][..]));
    assert!(company.teams().is_empty());

    let team = store
        .insert_model::<Team>(RowValues::new().with("company_id", company.id))
        .await
        .unwrap();
    assert!(company.add_team(team.clone()));
    assert!(!company.add_team(team));
    assert_eq!(company.teams().len(), 1);
}

#[tokio::test]
async fn test_friendship_composite_key() {
    let store = setup_store().await;
    let pair = RowValues::new().with("my_id", 1i64).with("friend_id", 2i64);
    store.insert("Friendship", pair.clone()).await.unwrap();
    store
        .insert("Friendship", RowValues::new().with("my_id", 2i64).with("friend_id", 1i64))
        .await
        .unwrap();
    assert!(store.insert("Friendship", pair).await.is_err());

    let friendships = store
        .fetch::<Friendship>(&RowValues::new().with("my_id", 1i64))
        .await
        .unwrap();
    assert_eq!(friendships, vec![Friendship { my_id: 1, friend_id: 2 }]);
}

#[tokio::test]
async fn test_unknown_names_are_rejected() {
    let store = setup_store().await;
    assert!(matches!(
        store.insert("Ghost", RowValues::new()).await,
        Err(FixtureError::UnknownEntity { .. })
    ));
    assert!(matches!(
        store.insert("User", RowValues::new().with("shoe_size", 44i64)).await,
        Err(FixtureError::UnknownColumn { .. })
    ));
}

#[tokio::test]
async fn test_create_all_is_idempotent_and_drop_all_removes_tables() {
    let store = setup_store().await;
    store.create_all().await.unwrap();
    insert_user(&store).await;

    store.drop_all().await.unwrap();
    let err = store.count("User", &RowValues::new()).await.unwrap_err();
    assert!(matches!(err, FixtureError::Database { .. }));
}

#[tokio::test]
async fn test_idle_count_unsupported_for_sqlite() {
    let store = setup_store().await;
    match store.idle_count() {
        Err(FixtureError::UnsupportedPoolKind { kind }) => assert_eq!(kind, "sqlite"),
        other => panic!("expected UnsupportedPoolKind, got {other:?}"),
    }
    store.close().await;
}

#[tokio::test]
async fn test_pool_acquire_timeout_reports_configured_seconds() {
    let store = setup_store_with(PoolOptions {
        max_connections: Some(1),
        acquire_timeout_secs: Some(1),
        ..Default::default()
    })
    .await;
    let DbPool::SQLite(pool) = store.pool() else {
        panic!("expected a SQLite pool");
    };
    let _held = pool.acquire().await.unwrap();

    let err = store.count("User", &RowValues::new()).await.unwrap_err();
    assert!(
        matches!(err, FixtureError::Timeout { elapsed_secs: 1, .. }),
        "unexpected error: {err:?}"
    );
}
