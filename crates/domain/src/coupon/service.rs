//! Coupon service.

use chrono::Utc;
use common::CouponId;
use document_store::DocumentStore;

use crate::error::{DomainError, Result};
use crate::identity::Identity;
use crate::repository::{Repository, Stored};

use super::{Coupon, NewCoupon};

/// Service for administering and validating coupons.
pub struct CouponService<S: DocumentStore> {
    coupons: Repository<S, Coupon>,
}

impl<S: DocumentStore> CouponService<S> {
    /// Creates a new coupon service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            coupons: Repository::new(store),
        }
    }

    /// Returns a reference to the coupon repository.
    pub fn repository(&self) -> &Repository<S, Coupon> {
        &self.coupons
    }

    /// Creates a coupon. Admin only; the code must be unused.
    #[tracing::instrument(skip(self, new_coupon), fields(user_id = %identity.user_id))]
    pub async fn create(&self, identity: &Identity, new_coupon: NewCoupon) -> Result<Coupon> {
        identity.require_admin("create coupons")?;
        let coupon = new_coupon.into_coupon()?;
        let stored = self.coupons.insert(coupon).await?;
        tracing::info!(code = %stored.record.code, "coupon created");
        Ok(stored.record)
    }

    /// Lists every coupon. Admin only.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn list(&self, identity: &Identity) -> Result<Vec<Coupon>> {
        identity.require_admin("list coupons")?;
        self.coupons.find_records(self.coupons.query()).await
    }

    /// Deletes a coupon by ID. Admin only.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn delete(&self, identity: &Identity, coupon_id: CouponId) -> Result<()> {
        identity.require_admin("delete coupons")?;

        let coupon = self
            .coupons
            .find_records(
                self.coupons
                    .query()
                    .field_eq("id", coupon_id.to_string())
                    .limit(1),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found("Coupon", coupon_id))?;

        self.coupons.delete(&coupon.code).await?;
        tracing::info!(code = %coupon.code, "coupon deleted");
        Ok(())
    }

    /// Loads a coupon by code with its version.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Stored<Coupon>>> {
        self.coupons.get(code.trim()).await
    }

    /// Returns the coupon if it can be used right now. Does not count a use.
    #[tracing::instrument(skip(self))]
    pub async fn apply(&self, code: &str) -> Result<Coupon> {
        let coupon = self
            .find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("Coupon", code))?
            .record;
        coupon.ensure_usable(Utc::now())?;
        Ok(coupon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::Discount;
    use chrono::Duration;
    use common::UserId;
    use document_store::InMemoryDocumentStore;

    fn new_coupon(code: &str) -> NewCoupon {
        NewCoupon {
            code: code.to_string(),
            discount: Discount::Percentage { value: 10 },
            max_uses: 5,
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn test_only_admin_manages_coupons() {
        let service = CouponService::new(InMemoryDocumentStore::new());
        let user = Identity::user(UserId::new());

        assert!(matches!(
            service.create(&user, new_coupon("SAVE10")).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            service.list(&user).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&user, CouponId::new()).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let service = CouponService::new(InMemoryDocumentStore::new());
        let admin = Identity::admin(UserId::new());

        let coupon = service.create(&admin, new_coupon("SAVE10")).await.unwrap();
        service.create(&admin, new_coupon("SAVE20")).await.unwrap();
        assert_eq!(service.list(&admin).await.unwrap().len(), 2);

        service.delete(&admin, coupon.id).await.unwrap();
        assert_eq!(service.list(&admin).await.unwrap().len(), 1);
        assert!(matches!(
            service.delete(&admin, coupon.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let service = CouponService::new(InMemoryDocumentStore::new());
        let admin = Identity::admin(UserId::new());

        service.create(&admin, new_coupon("SAVE10")).await.unwrap();
        assert!(matches!(
            service.create(&admin, new_coupon("SAVE10")).await,
            Err(DomainError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_does_not_mutate() {
        let service = CouponService::new(InMemoryDocumentStore::new());
        let admin = Identity::admin(UserId::new());
        service.create(&admin, new_coupon("SAVE10")).await.unwrap();

        let applied = service.apply("SAVE10").await.unwrap();
        assert_eq!(applied.used_count, 0);

        let stored = service.find_by_code("SAVE10").await.unwrap().unwrap();
        assert_eq!(stored.record.used_count, 0);
        assert_eq!(stored.version, document_store::Version::first());
    }

    #[tokio::test]
    async fn test_apply_rejects_missing_and_expired() {
        let service = CouponService::new(InMemoryDocumentStore::new());
        let admin = Identity::admin(UserId::new());

        assert!(matches!(
            service.apply("NOPE").await,
            Err(DomainError::NotFound { .. })
        ));

        let mut expired = new_coupon("OLD");
        expired.expires_at = Utc::now() - Duration::days(1);
        service.create(&admin, expired).await.unwrap();
        assert!(matches!(
            service.apply("OLD").await,
            Err(DomainError::InvalidCoupon(_))
        ));
    }
}
