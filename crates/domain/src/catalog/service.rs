//! Catalog service providing the product operations.

use common::{ProductId, UserId};
use document_store::DocumentStore;

use crate::error::{DomainError, Result};
use crate::identity::Identity;
use crate::repository::Repository;

use super::{NewProduct, Product, ProductSearch, ProductUpdate};

/// Service for managing catalog products.
pub struct CatalogService<S: DocumentStore> {
    products: Repository<S, Product>,
}

impl<S: DocumentStore> CatalogService<S> {
    /// Creates a new catalog service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            products: Repository::new(store),
        }
    }

    /// Returns a reference to the product repository.
    pub fn repository(&self) -> &Repository<S, Product> {
        &self.products
    }

    /// Lists a new product sold by the caller.
    #[tracing::instrument(skip(self, new_product), fields(user_id = %identity.user_id))]
    pub async fn create(&self, identity: &Identity, new_product: NewProduct) -> Result<Product> {
        let product = new_product.into_product(identity.user_id)?;
        let stored = self.products.insert(product).await?;
        tracing::info!(product_id = %stored.record.id, "product created");
        Ok(stored.record)
    }

    /// Returns every product, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>> {
        self.products.find_records(self.products.query()).await
    }

    /// Loads a product by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, product_id: ProductId) -> Result<Product> {
        Ok(self.products.require(&product_id.to_string()).await?.record)
    }

    /// Loads a product by ID, returning None if it doesn't exist.
    pub async fn find(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self
            .products
            .get(&product_id.to_string())
            .await?
            .map(|stored| stored.record))
    }

    /// Searches products by name substring and/or category.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, search: ProductSearch) -> Result<Vec<Product>> {
        let mut query = self.products.query();
        if let Some(category) = &search.category {
            query = query.field_eq("category", category.as_str());
        }

        let products = self.products.find_records(query).await?;
        Ok(products
            .into_iter()
            .filter(|p| search.matches_name(p))
            .collect())
    }

    /// Updates a product. Only its seller or an admin may do so.
    #[tracing::instrument(skip(self, update), fields(user_id = %identity.user_id))]
    pub async fn update(
        &self,
        identity: &Identity,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        let key = product_id.to_string();
        let stored = self
            .products
            .update(&key, |current| {
                let mut product = current.ok_or_else(|| DomainError::not_found("Product", &key))?;
                ensure_can_manage(identity, product.seller_id)?;
                update.apply_to(&mut product)?;
                Ok(product)
            })
            .await?;
        Ok(stored.record)
    }

    /// Deletes a product. Only its seller or an admin may do so.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn delete(&self, identity: &Identity, product_id: ProductId) -> Result<()> {
        let key = product_id.to_string();
        let stored = self.products.require(&key).await?;
        ensure_can_manage(identity, stored.record.seller_id)?;
        self.products.delete(&key).await?;
        tracing::info!(%product_id, "product deleted");
        Ok(())
    }

    /// Adds a review by the caller and recomputes the product rating.
    #[tracing::instrument(skip(self, comment), fields(user_id = %identity.user_id))]
    pub async fn add_review(
        &self,
        identity: &Identity,
        product_id: ProductId,
        rating: u8,
        comment: String,
    ) -> Result<Product> {
        let key = product_id.to_string();
        let stored = self
            .products
            .update(&key, |current| {
                let mut product = current.ok_or_else(|| DomainError::not_found("Product", &key))?;
                product.add_review(identity.user_id, rating, comment.clone())?;
                Ok(product)
            })
            .await?;
        Ok(stored.record)
    }
}

fn ensure_can_manage(identity: &Identity, seller_id: UserId) -> Result<()> {
    if identity.can_manage(seller_id) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "only the seller or an admin can modify this product".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use document_store::InMemoryDocumentStore;

    fn new_product(name: &str, category: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            price: Money::from_cents(1000),
            stock: 5,
            category: category.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = CatalogService::new(InMemoryDocumentStore::new());
        let seller = Identity::user(UserId::new());

        let product = service
            .create(&seller, new_product("Widget", "tools"))
            .await
            .unwrap();
        assert_eq!(product.seller_id, seller.user_id);

        let loaded = service.get(product.id).await.unwrap();
        assert_eq!(loaded, product);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let service = CatalogService::new(InMemoryDocumentStore::new());
        let result = service.get(ProductId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_search_by_category_and_name() {
        let service = CatalogService::new(InMemoryDocumentStore::new());
        let seller = Identity::user(UserId::new());
        service
            .create(&seller, new_product("Red Widget", "tools"))
            .await
            .unwrap();
        service
            .create(&seller, new_product("Blue Widget", "toys"))
            .await
            .unwrap();
        service
            .create(&seller, new_product("Hammer", "tools"))
            .await
            .unwrap();

        let tools = service
            .search(ProductSearch {
                name: None,
                category: Some("tools".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(tools.len(), 2);

        let widgets_in_tools = service
            .search(ProductSearch {
                name: Some("widget".to_string()),
                category: Some("tools".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(widgets_in_tools.len(), 1);
        assert_eq!(widgets_in_tools[0].name, "Red Widget");

        assert_eq!(service.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_only_seller_or_admin_can_update_and_delete() {
        let service = CatalogService::new(InMemoryDocumentStore::new());
        let seller = Identity::user(UserId::new());
        let stranger = Identity::user(UserId::new());
        let admin = Identity::admin(UserId::new());
        let product = service
            .create(&seller, new_product("Widget", "tools"))
            .await
            .unwrap();

        let update = ProductUpdate {
            stock: Some(1),
            ..Default::default()
        };
        let result = service.update(&stranger, product.id, update.clone()).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert!(matches!(
            service.delete(&stranger, product.id).await,
            Err(DomainError::Forbidden(_))
        ));

        let updated = service.update(&admin, product.id, update).await.unwrap();
        assert_eq!(updated.stock, 1);

        service.delete(&seller, product.id).await.unwrap();
        assert!(service.find(product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_review() {
        let service = CatalogService::new(InMemoryDocumentStore::new());
        let seller = Identity::user(UserId::new());
        let buyer = Identity::user(UserId::new());
        let product = service
            .create(&seller, new_product("Widget", "tools"))
            .await
            .unwrap();

        service
            .add_review(&buyer, product.id, 4, "solid".to_string())
            .await
            .unwrap();
        let reviewed = service
            .add_review(&buyer, product.id, 2, "broke".to_string())
            .await
            .unwrap();

        assert_eq!(reviewed.reviews.len(), 2);
        assert!((reviewed.rating - 3.0).abs() < f64::EPSILON);
        assert_eq!(reviewed.reviews[0].user_id, buyer.user_id);
    }
}
