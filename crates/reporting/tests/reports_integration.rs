//! Report aggregation tests over orders placed on known days.

use chrono::{NaiveDate, TimeZone, Utc};
use common::{OrderId, ProductId, UserId};
use document_store::InMemoryDocumentStore;
use domain::{Identity, Money, Order, OrderLine, Repository};
use reporting::{DateRange, ReportError, ReportService};

fn line(product_id: ProductId, name: &str, cents: i64, quantity: u32) -> OrderLine {
    OrderLine {
        product_id,
        name: name.to_string(),
        unit_price: Money::from_cents(cents),
        quantity,
    }
}

async fn place(
    orders: &Repository<InMemoryDocumentStore, Order>,
    user_id: UserId,
    day: u32,
    currency: &str,
    lines: Vec<OrderLine>,
) -> Order {
    let total = OrderLine::subtotal(&lines).unwrap();
    let mut order = Order::paid(
        OrderId::new(),
        user_id,
        lines,
        total,
        currency,
        "PAY-TEST",
        None,
    )
    .unwrap();
    order.created_at = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
    order.updated_at = order.created_at;
    orders.insert(order).await.unwrap().record
}

fn march(from: u32, to: u32) -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, from),
        NaiveDate::from_ymd_opt(2024, 3, to),
    )
    .unwrap()
}

struct Fixture {
    reports: ReportService<InMemoryDocumentStore>,
    alice: Identity,
    bob: Identity,
    admin: Identity,
    lamp: ProductId,
    desk: ProductId,
    chair: ProductId,
}

/// alice: day 1 {lamp x2 @10.00}, day 10 {desk x1 @100.00, lamp x1 @10.00}
/// bob:   day 10 {chair x5 @20.00} in eur, day 20 {lamp x4 @10.00}
async fn fixture() -> Fixture {
    let store = InMemoryDocumentStore::new();
    let orders = Repository::new(store.clone());
    let (lamp, desk, chair) = (ProductId::new(), ProductId::new(), ProductId::new());
    let alice = Identity::user(UserId::new());
    let bob = Identity::user(UserId::new());

    place(&orders, alice.user_id, 1, "usd", vec![line(lamp, "Lamp", 1000, 2)]).await;
    place(
        &orders,
        alice.user_id,
        10,
        "usd",
        vec![line(desk, "Desk", 10000, 1), line(lamp, "Lamp", 1000, 1)],
    )
    .await;
    place(&orders, bob.user_id, 10, "eur", vec![line(chair, "Chair", 2000, 5)]).await;
    place(&orders, bob.user_id, 20, "usd", vec![line(lamp, "Lamp v2", 1000, 4)]).await;

    Fixture {
        reports: ReportService::new(store),
        alice,
        bob,
        admin: Identity::admin(UserId::new()),
        lamp,
        desk,
        chair,
    }
}

#[tokio::test]
async fn admin_revenue_covers_every_order_in_range() {
    let f = fixture().await;

    let report = f.reports.total_revenue(&f.admin, march(1, 31)).await.unwrap();
    assert_eq!(report.by_currency["usd"].cents(), 2000 + 11000 + 4000);
    assert_eq!(report.by_currency["eur"].cents(), 10000);

    let report = f.reports.total_revenue(&f.admin, march(10, 10)).await.unwrap();
    assert_eq!(report.by_currency["usd"].cents(), 11000);
    assert_eq!(report.by_currency["eur"].cents(), 10000);
}

#[tokio::test]
async fn mixed_currencies_have_no_single_total() {
    let f = fixture().await;

    let mixed = f.reports.total_revenue(&f.admin, march(1, 31)).await.unwrap();
    assert_eq!(mixed.total_revenue, None);

    let usd_only = f.reports.total_revenue(&f.admin, march(20, 20)).await.unwrap();
    assert_eq!(usd_only.total_revenue, Some(Money::from_cents(4000)));
}

#[tokio::test]
async fn users_only_see_their_own_orders() {
    let f = fixture().await;

    let alice = f.reports.total_revenue(&f.alice, DateRange::all()).await.unwrap();
    assert_eq!(alice.total_revenue, Some(Money::from_cents(13000)));

    let count = f.reports.order_count(&f.bob, DateRange::all()).await.unwrap();
    assert_eq!(count.total_orders, 2);

    let top = f
        .reports
        .top_selling_products(&f.alice, DateRange::all(), None)
        .await
        .unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].product_id, f.lamp);
    assert_eq!(top[0].total_sold, 3);
}

#[tokio::test]
async fn order_count_respects_inclusive_bounds() {
    let f = fixture().await;

    assert_eq!(
        f.reports.order_count(&f.admin, march(1, 10)).await.unwrap().total_orders,
        3
    );
    assert_eq!(
        f.reports.order_count(&f.admin, march(11, 19)).await.unwrap().total_orders,
        0
    );
}

#[tokio::test]
async fn top_selling_ranks_by_units_and_honors_limit() {
    let f = fixture().await;

    let top = f
        .reports
        .top_selling_products(&f.admin, DateRange::all(), None)
        .await
        .unwrap();
    let ids: Vec<ProductId> = top.iter().map(|p| p.product_id).collect();
    assert_eq!(ids, vec![f.lamp, f.chair, f.desk]);
    assert_eq!(top[0].total_sold, 7);
    assert_eq!(top[0].revenue.cents(), 7000);
    assert_eq!(top[0].name, "Lamp v2");

    let top = f
        .reports
        .top_selling_products(&f.admin, DateRange::all(), Some(1))
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].product_id, f.lamp);
}

#[tokio::test]
async fn empty_range_yields_zero_reports() {
    let f = fixture().await;
    let range = DateRange::parse(Some("2023-01-01"), Some("2023-12-31")).unwrap();

    let revenue = f.reports.total_revenue(&f.admin, range).await.unwrap();
    assert_eq!(revenue.total_revenue, Some(Money::zero()));
    assert!(revenue.by_currency.is_empty());
    assert!(
        f.reports
            .top_selling_products(&f.admin, range, None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[test]
fn reversed_range_is_rejected() {
    let result = DateRange::parse(Some("2024-03-10"), Some("2024-03-01"));
    assert!(matches!(result, Err(ReportError::InvalidRange(_))));
}
