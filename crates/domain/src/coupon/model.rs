use chrono::{DateTime, Utc};
use common::CouponId;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::money::Money;
use crate::repository::Record;

/// How a coupon reduces an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Whole-number percentage off, 1 to 100.
    Percentage { value: u32 },
    /// Fixed amount off.
    Fixed { value: Money },
}

impl Discount {
    fn validate(&self) -> Result<()> {
        match *self {
            Discount::Percentage { value } if value == 0 || value > 100 => Err(
                DomainError::InvalidInput("percentage must be between 1 and 100".to_string()),
            ),
            Discount::Fixed { value } if value.cents() <= 0 => Err(DomainError::InvalidInput(
                "fixed discount must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Applies a discount to an amount.
///
/// Percentages are rounded half-up to the cent. The result never drops below
/// `floor`, and never rises above the undiscounted amount.
pub fn apply_discount(discount: &Discount, amount: Money, floor: Money) -> Money {
    let discounted = match *discount {
        Discount::Percentage { value } => amount.saturating_sub(amount.percentage(value)),
        Discount::Fixed { value } => amount.saturating_sub(value),
    };
    discounted.max(floor.min(amount))
}

/// A discount code with a usage cap and an expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    /// Unique code, also the document key.
    pub code: String,
    pub discount: Discount,
    pub max_uses: u32,
    /// Never exceeds `max_uses`.
    pub used_count: u32,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Coupon {
    const COLLECTION: &'static str = "coupons";
    const ENTITY: &'static str = "Coupon";

    fn key(&self) -> String {
        self.code.clone()
    }
}

impl Coupon {
    /// Fails with `InvalidCoupon` if the coupon cannot be used at `now`.
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active {
            return Err(DomainError::InvalidCoupon(format!(
                "coupon {} is inactive",
                self.code
            )));
        }
        if self.used_count >= self.max_uses {
            return Err(DomainError::InvalidCoupon(format!(
                "coupon {} has been fully used",
                self.code
            )));
        }
        if now > self.expires_at {
            return Err(DomainError::InvalidCoupon(format!(
                "coupon {} has expired",
                self.code
            )));
        }
        Ok(())
    }

    /// Applies this coupon's discount to an amount.
    pub fn apply(&self, amount: Money, floor: Money) -> Money {
        apply_discount(&self.discount, amount, floor)
    }

    /// Counts one use of the coupon.
    pub fn record_use(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_usable(now)?;
        self.used_count += 1;
        Ok(())
    }
}

fn default_max_uses() -> u32 {
    1
}

/// Fields of a coupon to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub discount: Discount,
    #[serde(default = "default_max_uses")]
    pub max_uses: u32,
    pub expires_at: DateTime<Utc>,
}

impl NewCoupon {
    /// Validates the fields and builds an active, unused coupon.
    pub fn into_coupon(self) -> Result<Coupon> {
        let code = self.code.trim().to_string();
        if code.is_empty() {
            return Err(DomainError::InvalidInput(
                "coupon code is required".to_string(),
            ));
        }
        if self.max_uses == 0 {
            return Err(DomainError::InvalidInput(
                "max_uses must be at least 1".to_string(),
            ));
        }
        self.discount.validate()?;

        Ok(Coupon {
            id: CouponId::new(),
            code,
            discount: self.discount,
            max_uses: self.max_uses,
            used_count: 0,
            expires_at: self.expires_at,
            is_active: true,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(discount: Discount, max_uses: u32) -> Coupon {
        NewCoupon {
            code: "SAVE".to_string(),
            discount,
            max_uses,
            expires_at: Utc::now() + Duration::days(1),
        }
        .into_coupon()
        .unwrap()
    }

    #[test]
    fn test_percentage_discount() {
        let discount = Discount::Percentage { value: 10 };
        let result = apply_discount(&discount, Money::from_cents(2500), Money::zero());
        assert_eq!(result.cents(), 2250);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 15% of 0.10 is 1.5 cents, rounded to 2 off
        let discount = Discount::Percentage { value: 15 };
        let result = apply_discount(&discount, Money::from_cents(10), Money::zero());
        assert_eq!(result.cents(), 8);
    }

    #[test]
    fn test_fixed_discount_clamps_at_zero() {
        let discount = Discount::Fixed {
            value: Money::from_cents(5000),
        };
        let result = apply_discount(&discount, Money::from_cents(2500), Money::zero());
        assert!(result.is_zero());
    }

    #[test]
    fn test_floor_is_respected() {
        let discount = Discount::Fixed {
            value: Money::from_cents(5000),
        };
        let floor = Money::from_cents(50);
        assert_eq!(
            apply_discount(&discount, Money::from_cents(2500), floor).cents(),
            50
        );
        // An amount already below the floor is not raised
        assert_eq!(
            apply_discount(&discount, Money::from_cents(30), floor).cents(),
            30
        );
    }

    #[test]
    fn test_full_percentage_is_free() {
        let discount = Discount::Percentage { value: 100 };
        assert!(apply_discount(&discount, Money::from_cents(1234), Money::zero()).is_zero());
    }

    #[test]
    fn test_validation() {
        let base = NewCoupon {
            code: "X".to_string(),
            discount: Discount::Percentage { value: 0 },
            max_uses: 1,
            expires_at: Utc::now(),
        };
        assert!(base.clone().into_coupon().is_err());

        let too_big = NewCoupon {
            discount: Discount::Percentage { value: 101 },
            ..base.clone()
        };
        assert!(too_big.into_coupon().is_err());

        let negative = NewCoupon {
            discount: Discount::Fixed {
                value: Money::from_cents(-5),
            },
            ..base.clone()
        };
        assert!(negative.into_coupon().is_err());

        let blank = NewCoupon {
            code: "  ".to_string(),
            discount: Discount::Percentage { value: 5 },
            ..base
        };
        assert!(blank.into_coupon().is_err());
    }

    #[test]
    fn test_usable_checks() {
        let now = Utc::now();
        let mut c = coupon(Discount::Percentage { value: 10 }, 1);
        assert!(c.ensure_usable(now).is_ok());

        c.record_use(now).unwrap();
        assert_eq!(c.used_count, 1);
        assert!(matches!(
            c.record_use(now),
            Err(DomainError::InvalidCoupon(msg)) if msg.contains("fully used")
        ));
        assert_eq!(c.used_count, 1);

        let mut expired = coupon(Discount::Percentage { value: 10 }, 5);
        expired.expires_at = now - Duration::seconds(1);
        assert!(matches!(
            expired.ensure_usable(now),
            Err(DomainError::InvalidCoupon(msg)) if msg.contains("expired")
        ));

        let mut inactive = coupon(Discount::Percentage { value: 10 }, 5);
        inactive.is_active = false;
        assert!(inactive.ensure_usable(now).is_err());
    }

    #[test]
    fn test_discount_json_shape() {
        let json = serde_json::to_value(Discount::Percentage { value: 10 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "percentage", "value": 10}));
    }
}
