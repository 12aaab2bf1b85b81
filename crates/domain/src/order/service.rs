//! Order service providing order lookups and status management.

use common::{OrderId, UserId};
use document_store::DocumentStore;

use crate::error::{DomainError, Result};
use crate::identity::Identity;
use crate::notification::NotificationSink;
use crate::repository::Repository;

use super::{Order, OrderStatus};

/// Service for reading orders and driving their status after payment.
///
/// Orders are created by checkout; this service never creates them.
pub struct OrderService<S: DocumentStore, N: NotificationSink> {
    orders: Repository<S, Order>,
    notifier: N,
}

impl<S: DocumentStore, N: NotificationSink> OrderService<S, N> {
    /// Creates a new order service.
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            orders: Repository::new(store),
            notifier,
        }
    }

    /// Returns a reference to the order repository.
    pub fn repository(&self) -> &Repository<S, Order> {
        &self.orders
    }

    /// Loads an order. Only its owner or an admin may see it.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn get(&self, identity: &Identity, order_id: OrderId) -> Result<Order> {
        let order = self.orders.require(&order_id.to_string()).await?.record;
        if !identity.can_manage(order.user_id) {
            return Err(DomainError::Forbidden(
                "not authorized to view this order".to_string(),
            ));
        }
        Ok(order)
    }

    /// Lists the caller's orders, newest first.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn list_mine(&self, identity: &Identity) -> Result<Vec<Order>> {
        self.list_for_user(identity.user_id).await
    }

    /// Lists a user's orders, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.orders
            .find_records(
                self.orders
                    .query()
                    .field_eq("user_id", user_id.to_string())
                    .newest_first(),
            )
            .await
    }

    /// Lists every order, newest first. Admin only.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn list_all(&self, identity: &Identity) -> Result<Vec<Order>> {
        identity.require_admin("view all orders")?;
        self.orders
            .find_records(self.orders.query().newest_first())
            .await
    }

    /// Moves an order to a new status and notifies its owner. Admin only.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn update_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        identity.require_admin("update order status")?;

        let key = order_id.to_string();
        let order = self
            .orders
            .update(&key, |current| {
                let mut order = current.ok_or_else(|| DomainError::not_found("Order", &key))?;
                order.transition_to(status)?;
                Ok(order)
            })
            .await?
            .record;

        tracing::info!(%order_id, %status, "order status updated");

        let message = format!("Your order #{order_id} status has been updated to {status}.");
        if let Err(e) = self.notifier.record(order.user_id, &message).await {
            tracing::warn!(%order_id, error = %e, "failed to record status notification");
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::notification::NotificationService;
    use crate::order::OrderLine;
    use common::ProductId;
    use document_store::InMemoryDocumentStore;
    use std::sync::Arc;

    type Service = OrderService<InMemoryDocumentStore, Arc<NotificationService<InMemoryDocumentStore>>>;

    fn setup() -> (Service, Arc<NotificationService<InMemoryDocumentStore>>) {
        let store = InMemoryDocumentStore::new();
        let notifications = Arc::new(NotificationService::new(store.clone()));
        (OrderService::new(store, notifications.clone()), notifications)
    }

    async fn place(service: &Service, user_id: UserId) -> Order {
        let order = Order::paid(
            OrderId::new(),
            user_id,
            vec![OrderLine {
                product_id: ProductId::new(),
                name: "A".to_string(),
                unit_price: Money::from_cents(1000),
                quantity: 1,
            }],
            Money::from_cents(1000),
            "usd",
            "pi_1",
            None,
        )
        .unwrap();
        service.repository().insert(order).await.unwrap().record
    }

    #[tokio::test]
    async fn test_get_checks_ownership() {
        let (service, _) = setup();
        let owner = Identity::user(UserId::new());
        let order = place(&service, owner.user_id).await;

        assert_eq!(service.get(&owner, order.id).await.unwrap(), order);
        assert!(
            service
                .get(&Identity::admin(UserId::new()), order.id)
                .await
                .is_ok()
        );
        assert!(matches!(
            service.get(&Identity::user(UserId::new()), order.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            service.get(&owner, OrderId::new()).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_mine_newest_first() {
        let (service, _) = setup();
        let user = Identity::user(UserId::new());
        let first = place(&service, user.user_id).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = place(&service, user.user_id).await;
        place(&service, UserId::new()).await;

        let mine = service.list_mine(&user).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        assert!(service.list_all(&user).await.is_err());
        let all = service
            .list_all(&Identity::admin(UserId::new()))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_update_status_notifies_owner() {
        let (service, notifications) = setup();
        let owner = Identity::user(UserId::new());
        let admin = Identity::admin(UserId::new());
        let order = place(&service, owner.user_id).await;

        let updated = service
            .update_status(&admin, order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Shipped);

        let inbox = notifications.list(&owner).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(
            inbox[0].message,
            format!("Your order #{} status has been updated to shipped.", order.id)
        );
    }

    #[tokio::test]
    async fn test_update_status_validates() {
        let (service, notifications) = setup();
        let owner = Identity::user(UserId::new());
        let order = place(&service, owner.user_id).await;

        assert!(matches!(
            service
                .update_status(&owner, order.id, OrderStatus::Shipped)
                .await,
            Err(DomainError::Forbidden(_))
        ));

        let admin = Identity::admin(UserId::new());
        assert!(matches!(
            service
                .update_status(&admin, order.id, OrderStatus::Delivered)
                .await,
            Err(DomainError::InvalidStatusTransition { .. })
        ));
        assert!(notifications.list(&owner).await.unwrap().is_empty());
    }
}
