//! Per-user wishlists.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use document_store::DocumentStore;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::error::{DomainError, Result};
use crate::identity::Identity;
use crate::repository::{Record, Repository};

/// Products a user wants to keep an eye on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishlist {
    pub user_id: UserId,
    pub product_ids: Vec<ProductId>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Wishlist {
    const COLLECTION: &'static str = "wishlists";
    const ENTITY: &'static str = "Wishlist";

    fn key(&self) -> String {
        self.user_id.to_string()
    }
}

/// A wishlist with its products resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistView {
    pub user_id: UserId,
    pub products: Vec<Product>,
}

pub struct WishlistService<S: DocumentStore> {
    wishlists: Repository<S, Wishlist>,
    products: Repository<S, Product>,
}

impl<S: DocumentStore + Clone> WishlistService<S> {
    pub fn new(store: S) -> Self {
        Self {
            wishlists: Repository::new(store.clone()),
            products: Repository::new(store),
        }
    }
}

impl<S: DocumentStore> WishlistService<S> {
    /// Adds an existing product to the caller's wishlist.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn add(&self, identity: &Identity, product_id: ProductId) -> Result<Wishlist> {
        self.products.require(&product_id.to_string()).await?;
        let user_id = identity.user_id;

        let stored = self
            .wishlists
            .update(&user_id.to_string(), |current| {
                let mut wishlist = current.unwrap_or_else(|| Wishlist {
                    user_id,
                    product_ids: Vec::new(),
                    updated_at: Utc::now(),
                });
                if wishlist.product_ids.contains(&product_id) {
                    return Err(DomainError::InvalidInput(
                        "product already in wishlist".to_string(),
                    ));
                }
                wishlist.product_ids.push(product_id);
                wishlist.updated_at = Utc::now();
                Ok(wishlist)
            })
            .await?;
        Ok(stored.record)
    }

    /// Returns the caller's wishlist with products resolved.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn get(&self, identity: &Identity) -> Result<WishlistView> {
        let wishlist = self
            .wishlists
            .require(&identity.user_id.to_string())
            .await?
            .record;

        let mut products = Vec::with_capacity(wishlist.product_ids.len());
        for product_id in &wishlist.product_ids {
            if let Some(product) = self.products.get(&product_id.to_string()).await? {
                products.push(product.record);
            }
        }

        Ok(WishlistView {
            user_id: wishlist.user_id,
            products,
        })
    }

    /// Removes a product from the caller's wishlist.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn remove(&self, identity: &Identity, product_id: ProductId) -> Result<Wishlist> {
        let key = identity.user_id.to_string();
        let stored = self
            .wishlists
            .update(&key, |current| {
                let mut wishlist =
                    current.ok_or_else(|| DomainError::not_found("Wishlist", &key))?;
                wishlist.product_ids.retain(|id| *id != product_id);
                wishlist.updated_at = Utc::now();
                Ok(wishlist)
            })
            .await?;
        Ok(stored.record)
    }
}
