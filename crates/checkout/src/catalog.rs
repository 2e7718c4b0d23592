//! Price check of cart lines against the product catalog.

use tracing::{debug, instrument, warn};

use crate::cart::CartLine;
use crate::order::OrderError;
use crate::store::ProductCatalog;

/// Check every line against the catalog before an order is placed.
///
/// A line passes when its product exists, is active and is listed at exactly
/// the line's unit price.
///
/// # Errors
///
/// Returns `OrderError::UnknownProduct` or `OrderError::StalePrice` for the
/// first line that fails, or `OrderError::Persistence` if the catalog lookup
/// itself fails.
#[instrument(skip_all, fields(lines = lines.len()))]
pub async fn verify_prices<C: ProductCatalog>(catalog: &C, lines: &[CartLine]) -> Result<(), OrderError> {
    for line in lines {
        let product = catalog
            .get_product(line.product_id)
            .await?
            .filter(|product| product.is_active)
            .ok_or_else(|| {
                warn!(product_id = %line.product_id, "Product not available");
                OrderError::UnknownProduct(line.product_id)
            })?;

        if product.price != line.unit_price {
            warn!(
                product_id = %line.product_id,
                cart_price = %line.unit_price,
                catalog_price = %product.price,
                "Cart price is stale"
            );
            return Err(OrderError::StalePrice {
                product_id: line.product_id,
                cart_price: line.unit_price,
                catalog_price: product.price,
            });
        }
    }
    debug!("Cart prices match catalog");
    Ok(())
}
