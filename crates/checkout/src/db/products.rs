//! Catalog lookups.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use shopdesk_core::{Price, ProductId};

use crate::store::{CatalogProduct, ProductCatalog, StoreError};

/// Product catalog backed by the `shop.products` table.
#[derive(Debug, Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProductCatalog for PgProductCatalog {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        let row: Option<(i32, Decimal, bool)> =
            sqlx::query_as("SELECT id, price, is_active FROM shop.products WHERE id = $1")
                .bind(id.as_i32())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(id, price, is_active)| -> Result<CatalogProduct, StoreError> {
            let price = Price::new(price).map_err(|e| {
                StoreError::DataCorruption(format!("invalid price in database: {e}"))
            })?;
            Ok(CatalogProduct {
                id: ProductId::new(id),
                price,
                is_active,
            })
        })
        .transpose()
    }
}
