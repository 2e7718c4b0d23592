//! CLI subcommands.

pub mod checkout;
pub mod migrate;
pub mod orders;

use shopdesk_checkout::{CheckoutConfig, ConfigError};
use sqlx::PgPool;

/// Connect to the configured database.
async fn connect(config: &CheckoutConfig) -> Result<PgPool, DatabaseSetupError> {
    let database_url = config.require_database_url()?;
    tracing::info!("Connecting to database...");
    Ok(shopdesk_checkout::db::create_pool(database_url).await?)
}

/// Errors from reaching the database.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
