//! Order aggregations.

use std::collections::{BTreeMap, HashMap};

use common::ProductId;
use document_store::DocumentStore;
use domain::{Identity, Money, Order, Repository};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::range::DateRange;

/// Number of products returned by the top-selling report when no limit is given.
pub const DEFAULT_TOP_SELLING_LIMIT: usize = 10;

/// Revenue over a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueReport {
    /// Sum of order totals, or `None` when the orders span several
    /// currencies and only `by_currency` is meaningful.
    pub total_revenue: Option<Money>,
    /// Sum of order totals per currency.
    pub by_currency: BTreeMap<String, Money>,
}

/// Number of orders over a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCount {
    pub total_orders: usize,
}

/// Units sold of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    /// Name as recorded on the most recent order line.
    pub name: String,
    pub total_sold: u64,
    pub revenue: Money,
}

/// Read-only reports over stored orders.
pub struct ReportService<S: DocumentStore> {
    orders: Repository<S, Order>,
}

impl<S: DocumentStore> ReportService<S> {
    pub fn new(store: S) -> Self {
        Self {
            orders: Repository::new(store),
        }
    }

    /// Sums what was charged for orders in the range.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn total_revenue(
        &self,
        identity: &Identity,
        range: DateRange,
    ) -> Result<RevenueReport> {
        let orders = self.orders_in(identity, range).await?;

        let mut by_currency: BTreeMap<String, Money> = BTreeMap::new();
        for order in &orders {
            let revenue = by_currency.entry(order.currency.clone()).or_default();
            *revenue = revenue.checked_add(order.total)?;
        }

        let total_revenue = match by_currency.len() {
            0 => Some(Money::zero()),
            1 => by_currency.values().next().copied(),
            _ => {
                tracing::debug!(
                    currencies = by_currency.len(),
                    "orders span several currencies, no single total"
                );
                None
            }
        };

        Ok(RevenueReport {
            total_revenue,
            by_currency,
        })
    }

    /// Counts orders in the range.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn order_count(&self, identity: &Identity, range: DateRange) -> Result<OrderCount> {
        Ok(OrderCount {
            total_orders: self.orders_in(identity, range).await?.len(),
        })
    }

    /// Ranks products by units sold in the range, most sold first.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn top_selling_products(
        &self,
        identity: &Identity,
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<ProductSales>> {
        let orders = self.orders_in(identity, range).await?;

        let mut sales: HashMap<ProductId, ProductSales> = HashMap::new();
        // Oldest first so the latest recorded name wins.
        for order in orders.iter().rev() {
            for line in &order.lines {
                let entry = sales.entry(line.product_id).or_insert_with(|| ProductSales {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    total_sold: 0,
                    revenue: Money::zero(),
                });
                entry.name.clone_from(&line.name);
                entry.total_sold += u64::from(line.quantity);
                entry.revenue = entry.revenue.checked_add(line.line_total()?)?;
            }
        }

        let mut ranked: Vec<ProductSales> = sales.into_values().collect();
        ranked.sort_by(|a, b| {
            b.total_sold
                .cmp(&a.total_sold)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        ranked.truncate(limit.unwrap_or(DEFAULT_TOP_SELLING_LIMIT));
        Ok(ranked)
    }

    /// Loads the orders visible to the caller, newest first.
    async fn orders_in(&self, identity: &Identity, range: DateRange) -> Result<Vec<Order>> {
        let mut query = self.orders.query();
        if !identity.is_admin {
            query = query.field_eq("user_id", identity.user_id.to_string());
        }

        let mut orders: Vec<Order> = self
            .orders
            .find_records(query)
            .await?
            .into_iter()
            .filter(|order| range.contains(order.created_at))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        tracing::debug!(count = orders.len(), "orders loaded for report");
        Ok(orders)
    }
}
