//! Parameter binding for fixture statements.
//!
//! NULLs are bound with the Rust type matching the declared column so that
//! PostgreSQL does not reject an untyped `text` NULL for a `bigint` or
//! `jsonb` column.

use crate::models::schema::ColumnType;
use crate::models::value::SqlValue;
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q (SqlValue, ColumnType),
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    let (value, column_type) = param;
    match value {
        SqlValue::Null => match column_type {
            ColumnType::BigInt | ColumnType::Integer => query.bind(None::<i64>),
            ColumnType::Json => query.bind(None::<Json<JsonValue>>),
            ColumnType::Binary => query.bind(None::<Vec<u8>>),
            _ => query.bind(None::<String>),
        },
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Json(v) => query.bind(Json(v)),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Timestamp(v) => query.bind(*v),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q (SqlValue, ColumnType),
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    let (value, column_type) = param;
    match value {
        SqlValue::Null => match column_type {
            ColumnType::BigInt => query.bind(None::<i64>),
            ColumnType::Integer => query.bind(None::<i32>),
            ColumnType::Json => query.bind(None::<Json<JsonValue>>),
            ColumnType::Binary => query.bind(None::<Vec<u8>>),
            _ => query.bind(None::<String>),
        },
        SqlValue::Bool(v) => query.bind(*v),
        // INTEGER columns are int4 and reject an int8 parameter
        SqlValue::Int(v) if *column_type == ColumnType::Integer => match i32::try_from(*v) {
            Ok(narrow) => query.bind(narrow),
            Err(_) => query.bind(*v),
        },
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Json(v) => query.bind(Json(v)),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Timestamp(v) => query.bind(*v),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q (SqlValue, ColumnType),
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    let (value, _) = param;
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        // SQLite doesn't have native JSON type, store as string
        SqlValue::Json(v) => query.bind(v.to_string()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Timestamp(v) => query.bind(*v),
    }
}
