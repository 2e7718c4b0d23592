//! Order persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use tracing::instrument;

use shopdesk_core::{
    Email, OrderId, OrderItemId, OrderStatus, PaymentStatus, Price, ProductId, StoreId, UserId,
};

use super::write_error;
use crate::cart::CartLine;
use crate::customer::CustomerDetails;
use crate::order::{NewOrder, NewOrderItem, Order, OrderItem};
use crate::store::{OrderStore, StoreError};

const ORDER_COLUMNS: &str = "id, store_id, user_id, customer_name, customer_email, \
     customer_phone, shipping_address, subtotal, shipping_fee, total, status, \
     payment_status, created_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price_at_purchase";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    store_id: i32,
    user_id: i32,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    shipping_address: String,
    subtotal: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
    status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let email = Email::parse(&self.customer_email).map_err(|e| {
            StoreError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            store_id: StoreId::new(self.store_id),
            user_id: UserId::new(self.user_id),
            customer: CustomerDetails {
                name: self.customer_name,
                email,
                phone: self.customer_phone,
                shipping_address: self.shipping_address,
            },
            subtotal: stored_price(self.subtotal)?,
            shipping_fee: stored_price(self.shipping_fee)?,
            total: stored_price(self.total)?,
            status: self.status,
            payment_status: self.payment_status,
            created_at: self.created_at,
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    quantity: i32,
    price_at_purchase: Decimal,
}

impl TryFrom<ItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::DataCorruption(format!("negative quantity in database: {}", row.quantity))
        })?;

        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            quantity,
            price_at_purchase: stored_price(row.price_at_purchase)?,
        })
    }
}

fn stored_price(amount: Decimal) -> Result<Price, StoreError> {
    Price::new(amount)
        .map_err(|e| StoreError::DataCorruption(format!("invalid price in database: {e}")))
}

async fn insert_order<'e, E: PgExecutor<'e>>(
    executor: E,
    order: &NewOrder,
) -> Result<Order, StoreError> {
    let sql = format!(
        "INSERT INTO shop.orders (store_id, user_id, customer_name, customer_email, \
         customer_phone, shipping_address, subtotal, shipping_fee, total, status, payment_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order.store_id.as_i32())
        .bind(order.user_id.as_i32())
        .bind(&order.customer.name)
        .bind(order.customer.email.as_str())
        .bind(order.customer.phone.as_deref())
        .bind(&order.customer.shipping_address)
        .bind(order.totals.subtotal.amount())
        .bind(order.totals.shipping_fee.amount())
        .bind(order.totals.total.amount())
        .bind(order.status)
        .bind(order.payment_status)
        .fetch_one(executor)
        .await
        .map_err(|e| write_error(e, "order"))?;

    row.into_order(Vec::new())
}

async fn insert_item<'e, E: PgExecutor<'e>>(
    executor: E,
    item: &NewOrderItem,
) -> Result<OrderItem, StoreError> {
    let quantity = i32::try_from(item.quantity).map_err(|_| {
        StoreError::Rejected(format!("quantity {} is too large", item.quantity))
    })?;

    let sql = format!(
        "INSERT INTO shop.order_items (order_id, product_id, quantity, price_at_purchase) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {ITEM_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(item.order_id.as_i32())
        .bind(item.product_id.as_i32())
        .bind(quantity)
        .bind(item.price_at_purchase.amount())
        .fetch_one(executor)
        .await
        .map_err(|e| write_error(e, "order item"))?;

    OrderItem::try_from(row)
}

/// Order store backed by the `shop.orders` and `shop.order_items` tables.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if a stored row is invalid.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut items = self.items_of(&[row.id]).await?;
        let items = items.remove(&row.id).unwrap_or_default();
        row.into_order(items).map(Some)
    }

    /// List a store's orders with their items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if a stored row is invalid.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn list_by_store(&self, store_id: StoreId) -> Result<Vec<Order>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE store_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(store_id.as_i32())
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let mut items = self.items_of(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }

    async fn items_of(&self, order_ids: &[i32]) -> Result<HashMap<i32, Vec<OrderItem>>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM shop.order_items WHERE order_id = ANY($1) ORDER BY id"
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped
                .entry(order_id)
                .or_default()
                .push(OrderItem::try_from(row)?);
        }
        Ok(grouped)
    }
}

impl OrderStore for PgOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        insert_order(&self.pool, &order).await
    }

    async fn create_order_item(&self, item: NewOrderItem) -> Result<OrderItem, StoreError> {
        insert_item(&self.pool, &item).await
    }

    /// Insert the order and its items in one transaction.
    async fn place_order(&self, order: NewOrder, lines: &[CartLine]) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut placed = insert_order(&mut *tx, &order).await?;
        for line in lines {
            let item = insert_item(&mut *tx, &NewOrderItem::from_line(placed.id, line)).await?;
            placed.items.push(item);
        }

        tx.commit().await?;
        Ok(placed)
    }
}
