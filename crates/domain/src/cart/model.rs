use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::error::{DomainError, Result};
use crate::money::Money;
use crate::repository::Record;

/// A line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: u32,
    /// Catalog price when the line was last changed.
    pub unit_price: Money,
}

impl CartLine {
    /// Returns quantity * unit_price.
    pub fn line_total(&self) -> Result<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Marks a cart as being paid for by one checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutHold {
    pub order_id: OrderId,
    /// After this instant the hold no longer blocks another checkout.
    pub expires_at: DateTime<Utc>,
}

/// A user's cart.
///
/// `total_price` is maintained incrementally by every mutation and always
/// equals [`Cart::recompute_total`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub total_price: Money,
    /// Set while a checkout has priced the cart and is waiting on payment.
    #[serde(default)]
    pub checkout_hold: Option<CheckoutHold>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Cart {
    const COLLECTION: &'static str = "carts";
    const ENTITY: &'static str = "Cart";

    fn key(&self) -> String {
        self.user_id.to_string()
    }
}

impl Cart {
    /// Creates an empty cart.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            total_price: Money::zero(),
            checkout_hold: None,
            updated_at: Utc::now(),
        }
    }

    /// Returns the line for a product.
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds units of a product, merging with an existing line.
    ///
    /// The merged quantity must not exceed the product's stock.
    pub fn add_line(&mut self, product: &Product, quantity: u32) -> Result<()> {
        validate_quantity(quantity)?;

        match self.lines.iter().position(|l| l.product_id == product.id) {
            Some(index) => {
                let merged = self.lines[index].quantity.saturating_add(quantity);
                self.set_quantity(index, product, merged)?;
            }
            None => {
                product.ensure_stock(quantity)?;
                let line = CartLine {
                    product_id: product.id,
                    quantity,
                    unit_price: product.price,
                };
                self.total_price = self.total_price.checked_add(line.line_total()?)?;
                self.lines.push(line);
            }
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Sets the quantity of an existing line.
    pub fn update_line(&mut self, product: &Product, quantity: u32) -> Result<()> {
        validate_quantity(quantity)?;

        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product.id)
            .ok_or_else(|| DomainError::not_found("Cart item", product.id))?;
        self.set_quantity(index, product, quantity)?;

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Removes a line.
    pub fn remove_line(&mut self, product_id: ProductId) -> Result<()> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| DomainError::not_found("Cart item", product_id))?;

        self.total_price = self.total_price.checked_sub(self.lines[index].line_total()?)?;
        self.lines.remove(index);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Derives the total from the lines.
    pub fn recompute_total(&self) -> Result<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total()?))
    }

    /// Returns true if an unexpired checkout holds the cart.
    pub fn is_held(&self, now: DateTime<Utc>) -> bool {
        self.checkout_hold.is_some_and(|hold| hold.expires_at > now)
    }

    /// Returns true if the given checkout holds the cart.
    pub fn is_held_by(&self, order_id: OrderId) -> bool {
        self.checkout_hold.is_some_and(|hold| hold.order_id == order_id)
    }

    /// Reserves the cart for a checkout until `expires_at`.
    ///
    /// Fails with `CheckoutInProgress` while another checkout's hold is live.
    pub fn hold_for_checkout(
        &mut self,
        order_id: OrderId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.is_held(now) && !self.is_held_by(order_id) {
            return Err(DomainError::CheckoutInProgress(self.user_id));
        }
        self.checkout_hold = Some(CheckoutHold {
            order_id,
            expires_at,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Drops the hold of a checkout. Returns false if it did not hold the cart.
    pub fn release_hold(&mut self, order_id: OrderId) -> bool {
        if !self.is_held_by(order_id) {
            return false;
        }
        self.checkout_hold = None;
        self.updated_at = Utc::now();
        true
    }

    /// Removes the purchased quantities and releases the checkout's hold.
    ///
    /// Lines added or raised while the payment was in flight keep whatever
    /// was not purchased.
    pub fn complete_checkout<I>(&mut self, order_id: OrderId, purchased: I) -> Result<()>
    where
        I: IntoIterator<Item = (ProductId, u32)>,
    {
        if !self.is_held_by(order_id) {
            return Err(DomainError::InvalidInput(format!(
                "cart of user {} is not held by order {order_id}",
                self.user_id
            )));
        }

        let mut lines = self.lines.clone();
        let mut total = self.total_price;
        for (product_id, quantity) in purchased {
            let Some(index) = lines.iter().position(|l| l.product_id == product_id) else {
                continue;
            };
            total = total.checked_sub(lines[index].line_total()?)?;
            if lines[index].quantity <= quantity {
                lines.remove(index);
            } else {
                let line = &mut lines[index];
                line.quantity -= quantity;
                total = total.checked_add(line.line_total()?)?;
            }
        }

        self.lines = lines;
        self.total_price = total;
        self.checkout_hold = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Re-prices one line at the product's current price.
    fn set_quantity(&mut self, index: usize, product: &Product, quantity: u32) -> Result<()> {
        product.ensure_stock(quantity)?;
        let line = CartLine {
            product_id: product.id,
            quantity,
            unit_price: product.price,
        };
        self.total_price = self
            .total_price
            .checked_sub(self.lines[index].line_total()?)?
            .checked_add(line.line_total()?)?;
        self.lines[index] = line;
        Ok(())
    }
}

fn validate_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(DomainError::InvalidInput(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// A cart line resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// A cart with every line resolved and a freshly computed total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub user_id: UserId,
    pub lines: Vec<CartLineView>,
    pub total_price: Money,
}
