use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::money::Money;
use crate::repository::Record;

use super::OrderStatus;

/// A purchased line, copied from the catalog at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    /// Returns quantity * unit_price.
    pub fn line_total(&self) -> Result<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }

    /// Sums the lines, failing if the amount is out of range.
    pub fn subtotal(lines: &[OrderLine]) -> Result<Money> {
        lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total()?))
    }
}

/// Immutable snapshot of a completed purchase.
///
/// Only `status` and `updated_at` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    /// Sum of the lines before any discount.
    pub subtotal: Money,
    /// Amount actually charged.
    pub total: Money,
    pub currency: String,
    /// Reference returned by the payment gateway.
    pub payment_reference: String,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Order {
    const COLLECTION: &'static str = "orders";
    const ENTITY: &'static str = "Order";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Order {
    /// Builds the snapshot of a captured payment.
    pub fn paid(
        id: OrderId,
        user_id: UserId,
        lines: Vec<OrderLine>,
        total: Money,
        currency: impl Into<String>,
        payment_reference: impl Into<String>,
        coupon_code: Option<String>,
    ) -> Result<Self> {
        let now = Utc::now();
        let subtotal = OrderLine::subtotal(&lines)?;
        Ok(Self {
            id,
            user_id,
            lines,
            subtotal,
            total,
            currency: currency.into(),
            payment_reference: payment_reference.into(),
            coupon_code,
            status: OrderStatus::Paid,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the order to a new status.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::paid(
            OrderId::new(),
            UserId::new(),
            vec![
                OrderLine {
                    product_id: ProductId::new(),
                    name: "A".to_string(),
                    unit_price: Money::from_cents(1000),
                    quantity: 2,
                },
                OrderLine {
                    product_id: ProductId::new(),
                    name: "B".to_string(),
                    unit_price: Money::from_cents(500),
                    quantity: 1,
                },
            ],
            Money::from_cents(2250),
            "usd",
            "pi_123",
            Some("SAVE10".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_paid_snapshot() {
        let order = order();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.subtotal.cents(), 2500);
        assert_eq!(order.total.cents(), 2250);
        assert_eq!(order.total_quantity(), 3);
    }

    #[test]
    fn test_paid_rejects_subtotal_overflow() {
        let line = OrderLine {
            product_id: ProductId::new(),
            name: "A".to_string(),
            unit_price: Money::from_cents(i64::MAX / 2 + 1),
            quantity: 2,
        };
        let result = Order::paid(
            OrderId::new(),
            UserId::new(),
            vec![line],
            Money::zero(),
            "usd",
            "pi_1",
            None,
        );
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn test_transition() {
        let mut order = order();
        order.transition_to(OrderStatus::Shipped).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);

        let err = order.transition_to(OrderStatus::Cancelled).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidStatusTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Cancelled
            }
        ));
        assert_eq!(order.status, OrderStatus::Shipped);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let order = order();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "paid");
        assert_eq!(json["total"], 2250);
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
