//! Cart service.

use common::{ProductId, UserId};
use document_store::DocumentStore;

use crate::catalog::Product;
use crate::error::{DomainError, Result};
use crate::identity::Identity;
use crate::money::Money;
use crate::repository::{Repository, Stored};

use super::{Cart, CartLineView, CartView};

/// Service for mutating and viewing carts.
///
/// Every mutation is a versioned read-modify-write of the caller's cart, so
/// two concurrent requests on the same cart never overwrite each other.
pub struct CartService<S: DocumentStore> {
    carts: Repository<S, Cart>,
    products: Repository<S, Product>,
}

impl<S: DocumentStore + Clone> CartService<S> {
    /// Creates a new cart service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            carts: Repository::new(store.clone()),
            products: Repository::new(store),
        }
    }
}

impl<S: DocumentStore> CartService<S> {
    /// Returns a reference to the cart repository.
    pub fn repository(&self) -> &Repository<S, Cart> {
        &self.carts
    }

    /// Adds units of a product to the caller's cart, creating it if needed.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn add(
        &self,
        identity: &Identity,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let product = self.products.require(&product_id.to_string()).await?.record;
        let user_id = identity.user_id;

        let stored = self
            .carts
            .update(&user_id.to_string(), |current| {
                let mut cart = current.unwrap_or_else(|| Cart::new(user_id));
                cart.add_line(&product, quantity)?;
                Ok(cart)
            })
            .await?;
        Ok(stored.record)
    }

    /// Sets the quantity of a line in the caller's cart.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn update(
        &self,
        identity: &Identity,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let product = self.products.require(&product_id.to_string()).await?.record;
        let key = identity.user_id.to_string();

        let stored = self
            .carts
            .update(&key, |current| {
                let mut cart = current.ok_or_else(|| DomainError::not_found("Cart", &key))?;
                cart.update_line(&product, quantity)?;
                Ok(cart)
            })
            .await?;
        Ok(stored.record)
    }

    /// Removes a line from the caller's cart.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn remove(&self, identity: &Identity, product_id: ProductId) -> Result<Cart> {
        let key = identity.user_id.to_string();

        let stored = self
            .carts
            .update(&key, |current| {
                let mut cart = current.ok_or_else(|| DomainError::not_found("Cart", &key))?;
                cart.remove_line(product_id)?;
                Ok(cart)
            })
            .await?;
        Ok(stored.record)
    }

    /// Loads a user's cart with its version.
    pub async fn load(&self, user_id: UserId) -> Result<Option<Stored<Cart>>> {
        self.carts.get(&user_id.to_string()).await
    }

    /// Returns the caller's cart with every line resolved against the catalog.
    ///
    /// Lines whose product no longer exists are left out, and the total is
    /// computed from current catalog prices.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn view(&self, identity: &Identity) -> Result<CartView> {
        let cart = self
            .carts
            .require(&identity.user_id.to_string())
            .await?
            .record;

        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let Some(product) = self.products.get(&line.product_id.to_string()).await? else {
                tracing::warn!(product_id = %line.product_id, "cart references a missing product");
                continue;
            };
            lines.push(CartLineView {
                product_id: product.record.id,
                name: product.record.name,
                unit_price: product.record.price,
                quantity: line.quantity,
                line_total: product.record.price.checked_multiply(line.quantity)?,
            });
        }

        let total_price = Money::checked_sum(lines.iter().map(|l| l.line_total))?;
        Ok(CartView {
            user_id: cart.user_id,
            lines,
            total_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogService, NewProduct, ProductUpdate};
    use crate::money::Money;
    use document_store::InMemoryDocumentStore;

    async fn setup() -> (
        CartService<InMemoryDocumentStore>,
        CatalogService<InMemoryDocumentStore>,
        Identity,
    ) {
        let store = InMemoryDocumentStore::new();
        (
            CartService::new(store.clone()),
            CatalogService::new(store),
            Identity::user(UserId::new()),
        )
    }

    async fn seed(catalog: &CatalogService<InMemoryDocumentStore>, price: i64, stock: u32) -> Product {
        catalog
            .create(
                &Identity::user(UserId::new()),
                NewProduct {
                    name: format!("Item {price}"),
                    description: String::new(),
                    price: Money::from_cents(price),
                    stock,
                    category: String::new(),
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_creates_cart_lazily() {
        let (carts, catalog, user) = setup().await;
        let a = seed(&catalog, 1000, 5).await;

        assert!(carts.load(user.user_id).await.unwrap().is_none());
        let cart = carts.add(&user, a.id, 2).await.unwrap();

        assert_eq!(cart.user_id, user.user_id);
        assert_eq!(cart.total_price.cents(), 2000);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let (carts, _, user) = setup().await;
        let result = carts.add(&user, ProductId::new(), 1).await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "Product",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_add_beyond_stock_leaves_stored_cart_unchanged() {
        let (carts, catalog, user) = setup().await;
        let a = seed(&catalog, 1000, 5).await;
        carts.add(&user, a.id, 1).await.unwrap();
        let before = carts.load(user.user_id).await.unwrap().unwrap();

        let result = carts.add(&user, a.id, 10).await;
        assert!(matches!(result, Err(DomainError::InsufficientStock { .. })));

        let after = carts.load(user.user_id).await.unwrap().unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.record, before.record);
    }

    #[tokio::test]
    async fn test_update_and_remove_require_cart() {
        let (carts, catalog, user) = setup().await;
        let a = seed(&catalog, 1000, 5).await;

        assert!(matches!(
            carts.update(&user, a.id, 1).await,
            Err(DomainError::NotFound { entity: "Cart", .. })
        ));
        assert!(matches!(
            carts.remove(&user, a.id).await,
            Err(DomainError::NotFound { entity: "Cart", .. })
        ));
        assert!(matches!(
            carts.view(&user).await,
            Err(DomainError::NotFound { entity: "Cart", .. })
        ));
    }

    #[tokio::test]
    async fn test_view_uses_current_prices() {
        let (carts, catalog, user) = setup().await;
        let a = seed(&catalog, 1000, 5).await;
        let b = seed(&catalog, 500, 3).await;
        carts.add(&user, a.id, 2).await.unwrap();
        carts.add(&user, b.id, 1).await.unwrap();

        catalog
            .update(
                &Identity::admin(UserId::new()),
                b.id,
                ProductUpdate {
                    price: Some(Money::from_cents(700)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let view = carts.view(&user).await.unwrap();
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.total_price.cents(), 2700);
        let line_b = view.lines.iter().find(|l| l.product_id == b.id).unwrap();
        assert_eq!(line_b.line_total.cents(), 700);
        assert_eq!(line_b.name, "Item 500");
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_all_applied() {
        let store = InMemoryDocumentStore::new();
        let catalog = CatalogService::new(store.clone());
        let a = seed(&catalog, 100, 1000).await;
        let user = Identity::user(UserId::new());
        let carts = std::sync::Arc::new(CartService::new(store));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let carts = carts.clone();
            handles.push(tokio::spawn(async move {
                carts.add(&user, a.id, 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let cart = carts.load(user.user_id).await.unwrap().unwrap().record;
        assert_eq!(cart.line(a.id).unwrap().quantity, 4);
        assert_eq!(cart.total_price.cents(), 400);
    }
}
