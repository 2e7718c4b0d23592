//! In-memory collaborators for tests and dry runs.

use std::collections::HashMap;

use chrono::Utc;
use shopdesk_core::{OrderId, OrderItemId, Price, ProductId, StoreId};
use tokio::sync::Mutex;

use crate::cart::CartLine;
use crate::order::{NewOrder, NewOrderItem, Order, OrderItem};
use crate::store::{CatalogProduct, OrderStore, ProductCatalog, StoreError};

#[derive(Debug, Default)]
struct Orders {
    placed: Vec<Order>,
    last_order_id: i32,
    last_item_id: i32,
    fail_next: Option<String>,
}

impl Orders {
    fn take_failure(&mut self) -> Result<(), StoreError> {
        self.fail_next
            .take()
            .map_or(Ok(()), |reason| Err(StoreError::Unavailable(reason)))
    }

    fn insert_header(&mut self, order: NewOrder) -> Order {
        self.last_order_id += 1;
        Order {
            id: OrderId::new(self.last_order_id),
            store_id: order.store_id,
            user_id: order.user_id,
            customer: order.customer,
            subtotal: order.totals.subtotal,
            shipping_fee: order.totals.shipping_fee,
            total: order.totals.total,
            status: order.status,
            payment_status: order.payment_status,
            created_at: Utc::now(),
            items: Vec::new(),
        }
    }

    fn next_item(&mut self, item: NewOrderItem) -> OrderItem {
        self.last_item_id += 1;
        OrderItem {
            id: OrderItemId::new(self.last_item_id),
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase,
        }
    }
}

/// Order store backed by a `Vec`. IDs count up from 1.
///
/// `place_order` is atomic: the order and its items are published under a
/// single lock, or not at all.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<Orders>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write fail with [`StoreError::Unavailable`].
    pub async fn fail_next(&self, reason: impl Into<String>) {
        self.orders.lock().await.fail_next = Some(reason.into());
    }

    pub async fn order_count(&self) -> usize {
        self.orders.lock().await.placed.len()
    }

    pub async fn get(&self, id: OrderId) -> Option<Order> {
        self.orders
            .lock()
            .await
            .placed
            .iter()
            .find(|order| order.id == id)
            .cloned()
    }

    /// Orders of one store, newest first.
    pub async fn list_by_store(&self, store_id: StoreId) -> Vec<Order> {
        self.orders
            .lock()
            .await
            .placed
            .iter()
            .rev()
            .filter(|order| order.store_id == store_id)
            .cloned()
            .collect()
    }
}

impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut orders = self.orders.lock().await;
        orders.take_failure()?;
        let order = orders.insert_header(order);
        orders.placed.push(order.clone());
        Ok(order)
    }

    async fn create_order_item(&self, item: NewOrderItem) -> Result<OrderItem, StoreError> {
        let mut orders = self.orders.lock().await;
        orders.take_failure()?;
        if !orders.placed.iter().any(|order| order.id == item.order_id) {
            return Err(StoreError::Rejected(format!(
                "order {} does not exist",
                item.order_id
            )));
        }
        let item = orders.next_item(item);
        if let Some(order) = orders.placed.iter_mut().find(|order| order.id == item.order_id) {
            order.items.push(item.clone());
        }
        Ok(item)
    }

    async fn place_order(&self, order: NewOrder, lines: &[CartLine]) -> Result<Order, StoreError> {
        let mut orders = self.orders.lock().await;
        orders.take_failure()?;
        let mut order = orders.insert_header(order);
        for line in lines {
            let item = orders.next_item(NewOrderItem::from_line(order.id, line));
            order.items.push(item);
        }
        orders.placed.push(order.clone());
        Ok(order)
    }
}

/// Product catalog backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: HashMap<ProductId, CatalogProduct>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an active product.
    #[must_use]
    pub fn with_product(mut self, id: ProductId, price: Price) -> Self {
        self.insert(CatalogProduct {
            id,
            price,
            is_active: true,
        });
        self
    }

    pub fn insert(&mut self, product: CatalogProduct) {
        self.products.insert(product.id, product);
    }
}

impl FromIterator<CatalogProduct> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = CatalogProduct>>(iter: I) -> Self {
        Self {
            products: iter.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        Ok(self.products.get(&id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopdesk_core::{Email, OrderStatus, PaymentStatus, UserId};

    use super::*;
    use crate::customer::CustomerDetails;
    use crate::order::OrderTotals;

    fn new_order(store: i32) -> NewOrder {
        NewOrder {
            store_id: StoreId::new(store),
            user_id: UserId::new(1),
            customer: CustomerDetails {
                name: "Maria Silva".to_owned(),
                email: Email::parse("maria@example.com").unwrap(),
                phone: None,
                shipping_address: "Rua A, 123".to_owned(),
            },
            totals: OrderTotals {
                subtotal: Price::from_cents(1000),
                shipping_fee: Price::from_cents(1500),
                total: Price::from_cents(2500),
            },
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_assigns_sequential_ids() {
        let store = InMemoryOrderStore::new();
        let first = store.create_order(new_order(1)).await.unwrap();
        let second = store.create_order(new_order(1)).await.unwrap();
        assert_eq!(first.id, OrderId::new(1));
        assert_eq!(second.id, OrderId::new(2));
    }

    #[tokio::test]
    async fn test_item_for_missing_order_is_rejected() {
        let store = InMemoryOrderStore::new();
        let err = store
            .create_order_item(NewOrderItem {
                order_id: OrderId::new(42),
                product_id: ProductId::new(1),
                quantity: 1,
                price_at_purchase: Price::from_cents(100),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_failure_is_one_shot() {
        let store = InMemoryOrderStore::new();
        store.fail_next("down").await;
        assert!(store.create_order(new_order(1)).await.is_err());
        assert!(store.create_order(new_order(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_by_store_newest_first() {
        let store = InMemoryOrderStore::new();
        let a = store.place_order(new_order(1), &[]).await.unwrap();
        store.place_order(new_order(2), &[]).await.unwrap();
        let b = store.place_order(new_order(1), &[]).await.unwrap();

        let ids: Vec<_> = store
            .list_by_store(StoreId::new(1))
            .await
            .into_iter()
            .map(|order| order.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_catalog_lookup() {
        let catalog = InMemoryCatalog::new().with_product(ProductId::new(1), Price::from_cents(9999));
        let product = catalog.get_product(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(product.price.to_string(), "99.99");
        assert!(catalog.get_product(ProductId::new(2)).await.unwrap().is_none());
    }
}
