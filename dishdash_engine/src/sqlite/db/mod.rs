//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Timestamps are always produced by SQLite itself (`CURRENT_TIMESTAMP`, `datetime('now', ..)`), so every stored
//! timestamp has the same text format and compares correctly.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod availability;
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod profiles;

const SQLITE_DB_URL: &str = "sqlite://data/dishdash.db";

pub fn db_url() -> String {
    let result = env::var("DD_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ DD_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// True if `e` is a UNIQUE constraint failure that mentions `column`.
pub(crate) fn is_unique_violation_on(e: &SqlxError, column: &str) -> bool {
    match e {
        SqlxError::Database(db_err) => db_err.is_unique_violation() && db_err.message().contains(column),
        _ => false,
    }
}
