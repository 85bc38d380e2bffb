//! PostgreSQL persistence for pollsite.
//!
//! - [`models`] / [`repositories`] -- row types and zero-sized repos per table.
//! - [`geo_lookup`] -- the geo-chain validator's lookup, backed by `geo_units`.
//! - [`document_store`] -- the backup engines' store, one collection per table.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod document_store;
pub mod geo_lookup;
pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Round-trip a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
