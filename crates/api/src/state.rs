//! Shared application state.

use std::sync::Arc;

use checkout::{CheckoutConfig, CheckoutCoordinator, PaymentGateway, ReconciliationService};
use document_store::DocumentStore;
use domain::{
    CartService, CatalogService, CouponService, NotificationService, OrderService,
    WishlistService,
};
use reporting::ReportService;

use crate::auth::TokenVerifier;

/// Notification sink shared by the order service and the checkout coordinator.
pub type Notifier<S> = Arc<NotificationService<S>>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub coupons: CouponService<S>,
    pub orders: OrderService<S, Notifier<S>>,
    pub notifications: Notifier<S>,
    pub wishlists: WishlistService<S>,
    pub checkout: CheckoutCoordinator<S, Arc<dyn PaymentGateway>, Notifier<S>>,
    pub reports: ReportService<S>,
    pub reconciliations: ReconciliationService<S>,
    pub tokens: Arc<dyn TokenVerifier>,
    /// Currency used when a checkout request omits one.
    pub default_currency: String,
}

impl<S: DocumentStore + Clone> AppState<S> {
    /// Wires every service over one document store.
    pub fn new(
        store: S,
        gateway: Arc<dyn PaymentGateway>,
        tokens: Arc<dyn TokenVerifier>,
        checkout_config: CheckoutConfig,
        default_currency: impl Into<String>,
    ) -> Self {
        let notifications = Arc::new(NotificationService::new(store.clone()));
        Self {
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            coupons: CouponService::new(store.clone()),
            orders: OrderService::new(store.clone(), notifications.clone()),
            wishlists: WishlistService::new(store.clone()),
            checkout: CheckoutCoordinator::with_config(
                store.clone(),
                gateway,
                notifications.clone(),
                checkout_config,
            ),
            reports: ReportService::new(store.clone()),
            reconciliations: ReconciliationService::new(store),
            notifications,
            tokens,
            default_currency: default_currency.into(),
        }
    }
}
