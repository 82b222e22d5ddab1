//! Relational adapter (C3): load/save inodes and pages, and resolve the
//! database-computed canonical path. Postgres is the sole backend; the
//! worker's connections always prefer the private schema set in `pool`.

mod inodes;
mod pages;
mod pool;

pub use inodes::InodeRepository;
pub use pages::PageRepository;
pub use pool::DbPool;

use thiserror::Error;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database pool error: {0}")]
    Pool(String),
    #[error(transparent)]
    Query(#[from] diesel::result::Error),
    #[error("migration error: {0}")]
    Migration(String),
}

/// Run pending Diesel migrations against a blocking connection. This is
/// schema bootstrap (first-time DDL), not the "index schema migration" the
/// Non-goals exclude — that non-goal is about the search store's mapping.
pub fn run_migrations(database_url: &str) -> Result<(), DbError> {
    use diesel::Connection;

    let mut conn = diesel::pg::PgConnection::establish(database_url)
        .map_err(|e| DbError::Migration(e.to_string()))?;

    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| DbError::Migration(e.to_string()))
}
