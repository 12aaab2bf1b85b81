//! User notifications.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{NotificationId, UserId};
use document_store::DocumentStore;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::identity::Identity;
use crate::repository::{Record, Repository};

/// A user-facing message. Only `is_read` ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Notification {
    const COLLECTION: &'static str = "notifications";
    const ENTITY: &'static str = "Notification";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Destination for user notifications.
///
/// Callers treat recording as best-effort: a failure is logged, never
/// propagated into the operation that triggered it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Records a message for a user.
    async fn record(&self, user_id: UserId, message: &str) -> Result<()>;
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    async fn record(&self, user_id: UserId, message: &str) -> Result<()> {
        (**self).record(user_id, message).await
    }
}

/// Store-backed notification inbox.
pub struct NotificationService<S: DocumentStore> {
    notifications: Repository<S, Notification>,
}

impl<S: DocumentStore> NotificationService<S> {
    /// Creates a new notification service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            notifications: Repository::new(store),
        }
    }

    /// Lists the caller's notifications, newest first.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn list(&self, identity: &Identity) -> Result<Vec<Notification>> {
        self.notifications
            .find_records(
                self.notifications
                    .query()
                    .field_eq("user_id", identity.user_id.to_string())
                    .newest_first(),
            )
            .await
    }

    /// Marks one of the caller's notifications as read.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn mark_read(
        &self,
        identity: &Identity,
        notification_id: NotificationId,
    ) -> Result<Notification> {
        let key = notification_id.to_string();
        let stored = self
            .notifications
            .update(&key, |current| {
                let mut notification =
                    current.ok_or_else(|| DomainError::not_found("Notification", &key))?;
                if notification.user_id != identity.user_id {
                    return Err(DomainError::Forbidden(
                        "not authorized to mark this notification as read".to_string(),
                    ));
                }
                notification.is_read = true;
                Ok(notification)
            })
            .await?;
        Ok(stored.record)
    }
}

#[async_trait]
impl<S: DocumentStore> NotificationSink for NotificationService<S> {
    async fn record(&self, user_id: UserId, message: &str) -> Result<()> {
        let notification = Notification {
            id: NotificationId::new(),
            user_id,
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.notifications.insert(notification).await?;
        tracing::debug!(%user_id, "notification recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let service = NotificationService::new(InMemoryDocumentStore::new());
        let user = Identity::user(UserId::new());

        service.record(user.user_id, "first").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        service.record(user.user_id, "second").await.unwrap();
        service.record(UserId::new(), "someone else").await.unwrap();

        let inbox = service.list(&user).await.unwrap();
        let messages: Vec<_> = inbox.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
        assert!(inbox.iter().all(|n| !n.is_read));
    }

    #[tokio::test]
    async fn test_only_owner_marks_read() {
        let service = NotificationService::new(InMemoryDocumentStore::new());
        let owner = Identity::user(UserId::new());
        service.record(owner.user_id, "hello").await.unwrap();
        let id = service.list(&owner).await.unwrap()[0].id;

        let admin = Identity::admin(UserId::new());
        assert!(matches!(
            service.mark_read(&admin, id).await,
            Err(DomainError::Forbidden(_))
        ));

        let read = service.mark_read(&owner, id).await.unwrap();
        assert!(read.is_read);
        assert!(matches!(
            service.mark_read(&owner, NotificationId::new()).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_sink_through_arc() {
        let service = Arc::new(NotificationService::new(InMemoryDocumentStore::new()));
        let sink: Arc<dyn NotificationSink> = service.clone();
        let user = Identity::user(UserId::new());

        sink.record(user.user_id, "via trait object").await.unwrap();
        assert_eq!(service.list(&user).await.unwrap().len(), 1);
    }
}
