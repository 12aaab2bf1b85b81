//! Checkout coordinator turning a cart into a paid order.

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use common::{OrderId, ReconciliationId, UserId};
use document_store::{DocumentStore, WriteOp, WriteOptions};
use domain::{
    Cart, Coupon, DomainError, Identity, Money, NotificationSink, Order, OrderLine, Product,
    Record, Repository, Stored,
};

use crate::error::{CheckoutError, Result};
use crate::reconciliation::{Reconciliation, ReconciliationService};
use crate::request::CheckoutRequest;
use crate::services::payment::PaymentGateway;
use crate::state::CheckoutState;

/// Tunables for the checkout flow.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Upper bound on a single gateway call.
    pub payment_timeout: Duration,
    /// Attempts at holding the cart and at the final commit when they hit a
    /// version conflict.
    pub commit_attempts: usize,
    /// Lowest amount a coupon can bring a total down to.
    pub discount_floor: Money,
    /// How long a checkout keeps the cart to itself. Must outlast the payment.
    pub hold_ttl: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_secs(10),
            commit_attempts: 3,
            discount_floor: Money::zero(),
            hold_ttl: Duration::from_secs(120),
        }
    }
}

/// Everything known about an order once its payment is captured.
#[derive(Debug, Clone)]
struct PendingOrder {
    order_id: OrderId,
    user_id: UserId,
    lines: Vec<OrderLine>,
    amount: Money,
    currency: String,
    coupon_code: Option<String>,
    payment_reference: String,
}

/// How far a single checkout got, used to unwind it on failure.
#[derive(Debug, Default)]
struct Progress {
    state: CheckoutState,
    /// Set once the cart is held for this checkout.
    held: Option<OrderId>,
    /// Set once the payment is captured.
    pending: Option<PendingOrder>,
}

/// Orchestrates a checkout.
///
/// The coordinator runs the flow Initiated → Priced → CouponApplied →
/// Authorized → Committed. Pricing writes a hold onto the cart, conditional
/// on the version it priced, so a second checkout of the same cart fails
/// before it reaches the payment gateway. After the payment, the coupon use,
/// stock decrements, order creation and removal of the purchased lines are
/// committed as one versioned batch. A batch that keeps failing after the
/// payment was captured opens a reconciliation instead of being dropped.
pub struct CheckoutCoordinator<S, P, N>
where
    S: DocumentStore,
    P: PaymentGateway,
    N: NotificationSink,
{
    store: S,
    carts: Repository<S, Cart>,
    products: Repository<S, Product>,
    coupons: Repository<S, Coupon>,
    reconciliations: ReconciliationService<S>,
    gateway: P,
    notifier: N,
    config: CheckoutConfig,
}

impl<S, P, N> CheckoutCoordinator<S, P, N>
where
    S: DocumentStore + Clone,
    P: PaymentGateway,
    N: NotificationSink,
{
    /// Creates a coordinator with the default configuration.
    pub fn new(store: S, gateway: P, notifier: N) -> Self {
        Self::with_config(store, gateway, notifier, CheckoutConfig::default())
    }

    /// Creates a coordinator with an explicit configuration.
    pub fn with_config(store: S, gateway: P, notifier: N, config: CheckoutConfig) -> Self {
        Self {
            carts: Repository::new(store.clone()),
            products: Repository::new(store.clone()),
            coupons: Repository::new(store.clone()),
            reconciliations: ReconciliationService::new(store.clone()),
            store,
            gateway,
            notifier,
            config,
        }
    }
}

impl<S, P, N> CheckoutCoordinator<S, P, N>
where
    S: DocumentStore,
    P: PaymentGateway,
    N: NotificationSink,
{
    /// Returns the active configuration.
    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Checks out the caller's cart and returns the created order.
    #[tracing::instrument(skip(self, request), fields(user_id = %identity.user_id))]
    pub async fn checkout(&self, identity: &Identity, request: CheckoutRequest) -> Result<Order> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();
        let mut progress = Progress::default();

        let result = match self.run(identity, request, &mut progress).await {
            Ok(order) => Ok(order),
            Err(e) => Err(self.abort(identity.user_id, progress, e).await),
        };

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        if let Ok(order) = &result {
            metrics::counter!("checkout_completed_total").increment(1);
            tracing::info!(order_id = %order.id, total = %order.total, "checkout completed");
        }

        result
    }

    async fn run(
        &self,
        identity: &Identity,
        request: CheckoutRequest,
        progress: &mut Progress,
    ) -> Result<Order> {
        let request = request.validate()?;
        let user_id = identity.user_id;
        let order_id = OrderId::new();

        // 1. Price the cart from the catalog and hold it
        let lines = self.hold_and_price(user_id, order_id).await?;
        progress.held = Some(order_id);
        let subtotal = OrderLine::subtotal(&lines)?;
        advance(&mut progress.state, CheckoutState::Priced);

        // 2. Coupon
        let mut amount = subtotal;
        if let Some(code) = &request.coupon_code {
            let coupon = self
                .coupons
                .get(code)
                .await?
                .ok_or_else(|| CheckoutError::InvalidCoupon(format!("coupon {code} does not exist")))?
                .record;
            coupon.ensure_usable(Utc::now())?;
            amount = coupon.apply(subtotal, self.config.discount_floor);
            tracing::info!(%code, %subtotal, %amount, "coupon applied");
            advance(&mut progress.state, CheckoutState::CouponApplied);
        }

        // 3. Payment
        let payment_reference = self.capture(order_id, amount, &request).await?;
        let pending = progress.pending.insert(PendingOrder {
            order_id,
            user_id,
            lines,
            amount,
            currency: request.currency,
            coupon_code: request.coupon_code,
            payment_reference,
        });
        advance(&mut progress.state, CheckoutState::Authorized);

        // 4. Commit
        let order = self.commit_with_retry(pending).await?;
        advance(&mut progress.state, CheckoutState::Committed);

        let message = format!("Your order #{} has been successfully placed.", order.id);
        if let Err(e) = self.notifier.record(user_id, &message).await {
            tracing::warn!(order_id = %order.id, error = %e, "failed to record order notification");
        }

        Ok(order)
    }

    /// Unwinds a failed checkout according to how far it got.
    ///
    /// Before the payment the cart hold is released. After it, a
    /// reconciliation is opened and the hold is left to expire.
    async fn abort(&self, user_id: UserId, mut progress: Progress, cause: CheckoutError) -> CheckoutError {
        let failed_in = progress.state;
        let error = match progress.pending.take() {
            Some(pending) if failed_in.has_side_effects() => {
                self.open_reconciliation(&pending, cause).await
            }
            _ => {
                if let Some(order_id) = progress.held {
                    self.release_hold(user_id, order_id).await;
                }
                cause
            }
        };
        advance(&mut progress.state, CheckoutState::Aborted);

        metrics::counter!("checkout_aborted_total", "reason" => error.reason()).increment(1);
        tracing::warn!(%failed_in, error = %error, "checkout aborted");
        error
    }

    /// Prices the cart and marks it as held by `order_id`.
    ///
    /// The hold is written conditionally on the cart version that was priced,
    /// so the lines returned are exactly the lines held.
    async fn hold_and_price(&self, user_id: UserId, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let attempts = self.config.commit_attempts.max(1);
        let mut attempt = 1;
        loop {
            let stored = self
                .carts
                .get(&user_id.to_string())
                .await?
                .filter(|stored| !stored.record.is_empty())
                .ok_or(CheckoutError::EmptyCart)?;

            let now = Utc::now();
            let mut cart = stored.record.clone();
            cart.hold_for_checkout(order_id, now, self.hold_expiry(now))?;

            // Price from the catalog, never from the cached total
            let lines = self.price_lines(&stored.record).await?;

            match self
                .store
                .commit(vec![cart.write_op(stored.expect_unchanged())?])
                .await
            {
                Ok(_) => {
                    tracing::debug!(%order_id, version = %stored.version, "cart held for checkout");
                    return Ok(lines);
                }
                Err(e) if e.is_conflict() && attempt < attempts => {
                    tracing::debug!(%order_id, attempt, "cart changed while pricing, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn hold_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.config.hold_ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Clears the hold of an aborted checkout. Failures are logged; the hold
    /// expires on its own.
    async fn release_hold(&self, user_id: UserId, order_id: OrderId) {
        let result = self
            .carts
            .update(&user_id.to_string(), |current| {
                let mut cart = current.ok_or_else(|| DomainError::not_found("Cart", user_id))?;
                cart.release_hold(order_id);
                Ok(cart)
            })
            .await;
        match result {
            Ok(_) => tracing::debug!(%order_id, "cart hold released"),
            Err(e) => tracing::warn!(%order_id, error = %e, "failed to release cart hold"),
        }
    }

    /// Snapshots each cart line at the current catalog price.
    async fn price_lines(&self, cart: &Cart) -> Result<Vec<OrderLine>> {
        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let product = self
                .products
                .get(&line.product_id.to_string())
                .await?
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?
                .record;
            product.ensure_stock(line.quantity)?;
            lines.push(OrderLine {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: line.quantity,
            });
        }
        Ok(lines)
    }

    /// Captures the payment under the configured timeout.
    ///
    /// A zero amount is not sent to the gateway.
    async fn capture(
        &self,
        order_id: OrderId,
        amount: Money,
        request: &CheckoutRequest,
    ) -> Result<String> {
        if amount.is_zero() {
            tracing::info!(%order_id, "nothing to charge, skipping payment gateway");
            return Ok(format!("no-charge-{order_id}"));
        }

        let call = self.gateway.authorize_and_capture(
            amount.cents(),
            &request.currency,
            &request.payment_method_token,
        );
        match tokio::time::timeout(self.config.payment_timeout, call).await {
            Ok(Ok(capture)) => {
                tracing::info!(%order_id, reference = %capture.reference_id, %amount, "payment captured");
                Ok(capture.reference_id)
            }
            Ok(Err(e)) => Err(CheckoutError::PaymentFailed(e.to_string())),
            Err(_) => Err(CheckoutError::PaymentFailed(format!(
                "payment gateway did not answer within {} ms",
                self.config.payment_timeout.as_millis()
            ))),
        }
    }

    /// Runs the commit, re-reading state after each version conflict.
    async fn commit_with_retry(&self, pending: &PendingOrder) -> Result<Order> {
        let attempts = self.config.commit_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.commit(pending).await {
                Err(e) if e.is_conflict() && attempt < attempts => {
                    metrics::counter!("checkout_commit_conflicts_total").increment(1);
                    tracing::debug!(order_id = %pending.order_id, attempt, "version conflict, retrying commit");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Builds and applies the commit batch for a captured payment.
    ///
    /// Every document in the batch is written conditionally on the version
    /// read here, and the cart must still be held by this checkout.
    async fn commit(&self, pending: &PendingOrder) -> Result<Order> {
        let now = Utc::now();
        let mut writes: Vec<WriteOp> = Vec::with_capacity(pending.lines.len() + 3);

        if let Some(code) = &pending.coupon_code {
            let stored = self.coupons.get(code).await?.ok_or_else(|| {
                CheckoutError::InvalidCoupon(format!("coupon {code} no longer exists"))
            })?;
            let mut coupon = stored.record.clone();
            coupon.record_use(now)?;
            writes.push(coupon.write_op(stored.expect_unchanged())?);
        }

        for line in &pending.lines {
            let stored: Stored<Product> = self
                .products
                .get(&line.product_id.to_string())
                .await?
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;
            let mut product = stored.record.clone();
            product.decrement_stock(line.quantity)?;
            writes.push(product.write_op(stored.expect_unchanged())?);
        }

        let order = Order::paid(
            pending.order_id,
            pending.user_id,
            pending.lines.clone(),
            pending.amount,
            pending.currency.clone(),
            pending.payment_reference.clone(),
            pending.coupon_code.clone(),
        )?;
        writes.push(order.write_op(WriteOptions::expect_new())?);

        // Lines added while the payment was in flight stay in the cart
        let stored = self
            .carts
            .get(&pending.user_id.to_string())
            .await?
            .filter(|stored| stored.record.is_held_by(pending.order_id))
            .ok_or(CheckoutError::HoldLost(pending.order_id))?;
        let mut cart = stored.record.clone();
        cart.complete_checkout(
            pending.order_id,
            pending.lines.iter().map(|line| (line.product_id, line.quantity)),
        )?;
        writes.push(cart.write_op(stored.expect_unchanged())?);

        self.store.commit(writes).await?;
        Ok(order)
    }

    /// Persists a reconciliation for a payment whose order could not be written.
    async fn open_reconciliation(&self, pending: &PendingOrder, cause: CheckoutError) -> CheckoutError {
        metrics::counter!("checkout_post_payment_failures_total").increment(1);

        let reconciliation = Reconciliation {
            id: ReconciliationId::new(),
            user_id: pending.user_id,
            order_id: pending.order_id,
            payment_reference: pending.payment_reference.clone(),
            amount: pending.amount,
            currency: pending.currency.clone(),
            coupon_code: pending.coupon_code.clone(),
            lines: pending.lines.clone(),
            reason: cause.to_string(),
            created_at: Utc::now(),
        };

        tracing::error!(
            reconciliation_id = %reconciliation.id,
            order_id = %pending.order_id,
            user_id = %pending.user_id,
            payment_reference = %pending.payment_reference,
            amount = %pending.amount,
            currency = %pending.currency,
            coupon_code = ?pending.coupon_code,
            lines = ?pending.lines,
            error = %cause,
            "payment captured but order commit failed"
        );

        let reconciliation_id = reconciliation.id;
        if let Err(e) = self.reconciliations.record(reconciliation).await {
            tracing::error!(
                %reconciliation_id,
                payment_reference = %pending.payment_reference,
                error = %e,
                "failed to persist reconciliation record"
            );
        }

        CheckoutError::PostPaymentCommitFailure {
            reconciliation_id,
            payment_reference: pending.payment_reference.clone(),
            reason: cause.to_string(),
        }
    }
}

fn advance(state: &mut CheckoutState, next: CheckoutState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid checkout transition {state} -> {next}"
    );
    tracing::info!(from = %state, to = %next, "checkout state changed");
    *state = next;
}
