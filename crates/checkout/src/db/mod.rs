//! `PostgreSQL` collaborators for the checkout core.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `stores` - Tenants orders are placed in
//! - `products` - Catalog prices checked before placing an order
//! - `orders` - Order headers with customer snapshot and totals
//! - `order_items` - Line items with the price frozen at purchase
//!
//! # Migrations
//!
//! Migrations are stored in `crates/checkout/migrations/` and run via:
//! ```bash
//! cargo run -p shopdesk-cli --features postgres -- migrate
//! ```

mod orders;
mod products;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use orders::PgOrderStore;
pub use products::PgProductCatalog;

use crate::store::StoreError;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded checkout migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Map a write error, turning constraint violations into `Rejected`.
fn write_error(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_foreign_key_violation() || db_err.is_check_violation())
    {
        return StoreError::Rejected(format!("{what}: {}", db_err.message()));
    }
    StoreError::Database(e)
}
