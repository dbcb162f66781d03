//! Order persistence interface
//!
//! The orchestrator talks to storage through [`OrderStore`]; the
//! in-memory implementation backs tests and single-node deployments.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::Order;

use crate::orders::OrderError;

/// Order persistence interface
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), OrderError>;
    async fn get(&self, order_id: &str) -> Result<Order, OrderError>;
    async fn update(&self, order: Order) -> Result<(), OrderError>;
    /// Orders for one buyer, newest first
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Order>, OrderError>;
}

/// In-memory order store keyed by order id
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<String, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), OrderError> {
        if self.orders.contains_key(&order.id) {
            return Err(OrderError::Validation(format!(
                "order {} already exists",
                order.id
            )));
        }
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Order, OrderError> {
        self.orders
            .get(order_id)
            .map(|o| o.clone())
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    async fn update(&self, order: Order) -> Result<(), OrderError> {
        if !self.orders.contains_key(&order.id) {
            return Err(OrderError::NotFound(order.id));
        }
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Order>, OrderError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.buyer.id == user_id)
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipping::tests_support::sample_order;

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = MemoryOrderStore::new();
        let order = sample_order();
        store.insert(order.clone()).await.unwrap();
        assert_eq!(store.get(&order.id).await.unwrap().id, order.id);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryOrderStore::new();
        let order = sample_order();
        store.insert(order.clone()).await.unwrap();
        assert!(matches!(
            store.insert(order).await,
            Err(OrderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let store = MemoryOrderStore::new();
        assert!(matches!(
            store.get("ORD-NOPE").await,
            Err(OrderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_by_user_is_newest_first() {
        let store = MemoryOrderStore::new();
        let mut first = sample_order();
        first.id = "ORD-A".into();
        first.created_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        let mut second = sample_order();
        second.id = "ORD-B".into();
        store.insert(first).await.unwrap();
        store.insert(second).await.unwrap();

        let listed = store.list_by_user("u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "ORD-B");
        assert!(store.list_by_user("other").await.unwrap().is_empty());
    }
}
