//! Records of captured payments whose order could not be committed.

use chrono::{DateTime, Utc};
use common::{OrderId, ReconciliationId, UserId};
use document_store::DocumentStore;
use domain::{Identity, Money, OrderLine, Record, Repository};
use serde::{Deserialize, Serialize};

/// A captured payment that needs manual follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub id: ReconciliationId,
    pub user_id: UserId,
    /// Id the order would have had.
    pub order_id: OrderId,
    pub payment_reference: String,
    pub amount: Money,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub lines: Vec<OrderLine>,
    /// Why the commit failed.
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Reconciliation {
    const COLLECTION: &'static str = "reconciliations";
    const ENTITY: &'static str = "Reconciliation";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Stores and lists reconciliation records.
pub struct ReconciliationService<S: DocumentStore> {
    reconciliations: Repository<S, Reconciliation>,
}

impl<S: DocumentStore> ReconciliationService<S> {
    pub fn new(store: S) -> Self {
        Self {
            reconciliations: Repository::new(store),
        }
    }

    /// Persists a reconciliation record.
    pub async fn record(&self, reconciliation: Reconciliation) -> domain::Result<Reconciliation> {
        Ok(self.reconciliations.insert(reconciliation).await?.record)
    }

    /// Lists every open reconciliation, newest first. Admin only.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn list(&self, identity: &Identity) -> domain::Result<Vec<Reconciliation>> {
        identity.require_admin("list reconciliations")?;
        self.reconciliations
            .find_records(self.reconciliations.query().newest_first())
            .await
    }
}
