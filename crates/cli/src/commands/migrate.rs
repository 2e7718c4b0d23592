//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shopdesk migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPDESK_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Checkout migrations live in `crates/checkout/migrations/` and are embedded
//! into the binary at build time.

use shopdesk_checkout::CheckoutConfig;
use thiserror::Error;

use super::{DatabaseSetupError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Setup(#[from] DatabaseSetupError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the checkout migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn run(config: &CheckoutConfig) -> Result<(), MigrationError> {
    let pool = connect(config).await?;

    tracing::info!("Running checkout migrations...");
    shopdesk_checkout::db::run_migrations(&pool).await?;

    tracing::info!("Checkout migrations complete!");
    Ok(())
}
