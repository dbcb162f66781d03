//! Notification sink collaborator
//!
//! Append-only store the orchestrator writes to on customer-visible
//! shipping transitions. Delivery (email/SMS/push) happens outside
//! this service.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::Notification;

/// Append-only notification store
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append(&self, notification: Notification);
    async fn list_for_order(&self, order_id: &str) -> Vec<Notification>;
}

/// In-memory notification store keyed by order id
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    by_order: DashMap<String, Vec<Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self {
            by_order: DashMap::new(),
        }
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn append(&self, notification: Notification) {
        self.by_order
            .entry(notification.order_id.clone())
            .or_default()
            .push(notification);
    }

    async fn list_for_order(&self, order_id: &str) -> Vec<Notification> {
        self.by_order
            .get(order_id)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_is_per_order_and_ordered() {
        let store = MemoryNotificationStore::new();
        store
            .append(Notification::new("ORD-1", "a@example.com", "dispatched"))
            .await;
        store
            .append(Notification::new("ORD-1", "a@example.com", "delivered"))
            .await;
        store
            .append(Notification::new("ORD-2", "b@example.com", "dispatched"))
            .await;

        let first = store.list_for_order("ORD-1").await;
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].message, "dispatched");
        assert_eq!(store.list_for_order("ORD-2").await.len(), 1);
        assert!(store.list_for_order("ORD-3").await.is_empty());
    }
}
