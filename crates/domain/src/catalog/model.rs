use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::money::Money;
use crate::repository::Record;

/// A review left on a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub user_id: UserId,
    /// Rating from 1 to 5.
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A catalog product.
///
/// Stock is unsigned, so a product can never be oversold into negative stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub category: String,
    /// Mean of all review ratings, 0 when there are no reviews.
    pub rating: f64,
    pub reviews: Vec<Review>,
    /// The seller who listed the product.
    pub seller_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Product {
    const COLLECTION: &'static str = "products";
    const ENTITY: &'static str = "Product";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Product {
    /// Fails with `InsufficientStock` unless `quantity` units are available.
    pub fn ensure_stock(&self, quantity: u32) -> Result<()> {
        if quantity > self.stock {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                requested: quantity,
                available: self.stock,
            });
        }
        Ok(())
    }

    /// Removes `quantity` units from stock.
    pub fn decrement_stock(&mut self, quantity: u32) -> Result<()> {
        self.ensure_stock(quantity)?;
        self.stock -= quantity;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Appends a review and recomputes the mean rating.
    pub fn add_review(&mut self, user_id: UserId, rating: u8, comment: String) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::InvalidInput(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let now = Utc::now();
        self.reviews.push(Review {
            user_id,
            rating,
            comment,
            created_at: now,
        });
        let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        self.rating = f64::from(sum) / self.reviews.len() as f64;
        self.updated_at = now;
        Ok(())
    }
}

/// Fields of a product to be listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub stock: u32,
    #[serde(default)]
    pub category: String,
}

impl NewProduct {
    /// Validates the fields and builds a product owned by `seller_id`.
    pub fn into_product(self, seller_id: UserId) -> Result<Product> {
        validate_name(&self.name)?;
        validate_price(self.price)?;

        let now = Utc::now();
        Ok(Product {
            id: ProductId::new(),
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price,
            stock: self.stock,
            category: self.category,
            rating: 0.0,
            reviews: Vec::new(),
            seller_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

impl ProductUpdate {
    /// Validates and applies the update to a product.
    pub fn apply_to(&self, product: &mut Product) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
            product.name = name.trim().to_string();
        }
        if let Some(price) = self.price {
            validate_price(price)?;
            product.price = price;
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        product.updated_at = Utc::now();
        Ok(())
    }
}

/// Catalog search filters. All present filters must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductSearch {
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
    /// Exact category.
    pub category: Option<String>,
}

impl ProductSearch {
    /// Returns true if the product matches the name filter.
    pub fn matches_name(&self, product: &Product) -> bool {
        match &self.name {
            Some(name) => product
                .name
                .to_lowercase()
                .contains(&name.trim().to_lowercase()),
            None => true,
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidInput(
            "product name is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: Money) -> Result<()> {
    if price.is_negative() {
        return Err(DomainError::InvalidInput(
            "price must not be negative".to_string(),
        ));
    }
    if price > Money::MAX_PRICE {
        return Err(DomainError::InvalidInput(format!(
            "price must not exceed {}",
            Money::MAX_PRICE
        )));
    }
    Ok(())
}
