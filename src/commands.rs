//! Command execution for the `orm-fixtures` binary.
//!
//! `run` returns what the command prints instead of writing it, so the
//! binary stays a thin wrapper and every command can be driven from tests.

use crate::config::{Command, Config};
use crate::db::{self, FixtureStore, ddl};
use crate::error::FixtureResult;
use crate::fixtures;
use std::sync::Arc;
use tracing::debug;

/// Run the configured command and return its stdout text.
pub async fn run(config: &Config) -> FixtureResult<String> {
    let registry = Arc::new(fixtures::registry()?);

    if config.command == Command::Ddl {
        let mut output = String::new();
        for statement in ddl::create_statements(&registry, config.dialect()?)? {
            output.push_str(&statement);
            output.push_str(";\n\n");
        }
        return Ok(output);
    }

    let connection = config.connection_config()?;
    let pool = db::connect(&connection).await?;
    let store = FixtureStore::new(pool, registry)
        .with_statement_timeout(config.statement_timeout_duration());

    let result = match config.command {
        Command::Create => store.create_all().await.map(|_| String::new()),
        Command::Drop => store.drop_all().await.map(|_| String::new()),
        Command::PoolStats => store
            .pool()
            .stats()
            .map(|stats| format!("{}: size={} idle={}\n", stats.kind, stats.size, stats.idle)),
        Command::Ddl => Ok(String::new()),
    };

    store.close().await;
    debug!(command = ?config.command, ok = result.is_ok(), "Command finished");
    result
}
