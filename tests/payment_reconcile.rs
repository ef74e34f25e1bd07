mod common;

use std::sync::atomic::Ordering;

use commerce_backend::entities::commissions::CommissionStatus;
use commerce_backend::entities::orders::{DeliveryStatus, PaymentProvider, PaymentStatus};
use commerce_backend::entities::users::UserRole;
use commerce_backend::entities::{commissions, orders, payment_events, products};
use commerce_backend::models::*;
use chrono::{Duration, Utc};
use commerce_backend::error::AppError;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

use common::*;

fn settlement(order_code: &str, event: &str, status: PaymentStatus) -> PaymentNotification {
    PaymentNotification {
        provider: PaymentProvider::Midtrans,
        order_code: order_code.to_string(),
        event_key: Some(event.to_string()),
        provider_status: "settlement".to_string(),
        status,
        provider_transaction_id: Some("MT-123".to_string()),
        payment_method: Some("bank_transfer".to_string()),
    }
}

async fn order_with_referral(app: &TestApp) -> (orders::Model, i64, i64, i64) {
    let buyer = seed_user(&app.db, "buyer@test.id", UserRole::Buyer).await;
    let partner = seed_user(&app.db, "partner@test.id", UserRole::Affiliate).await;
    let affiliate = seed_affiliate(&app.db, partner.id, "KOPI2025", 0).await;
    let a = seed_product(&app.db, "Kopi Arabika", 28_000, 10).await;
    let b = seed_product(&app.db, "Teh Melati", 47_000, 5).await;

    let (order, _) = app
        .orders
        .create_order(
            buyer.id,
            CreateOrderRequest {
                items: vec![
                    NewOrderItem {
                        product_id: a.id,
                        quantity: 2,
                        referral_code: Some("kopi2025".to_string()),
                    },
                    NewOrderItem {
                        product_id: b.id,
                        quantity: 1,
                        referral_code: None,
                    },
                ],
                provider: PaymentProvider::Midtrans,
                shipping: shipping(),
                shipping_cost: 15_000,
            },
        )
        .await
        .unwrap();
    (order, affiliate.id, a.id, b.id)
}

#[tokio::test]
async fn settlement_applies_side_effects_exactly_once() {
    let app = TestApp::new().await;
    let (order, affiliate_id, a, b) = order_with_referral(&app).await;

    let outcome = app
        .payments
        .reconcile(settlement(&order.order_code, "MT-123:settlement", PaymentStatus::Success))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied { status: PaymentStatus::Success });

    // 同一事件重发
    let outcome = app
        .payments
        .reconcile(settlement(&order.order_code, "MT-123:settlement", PaymentStatus::Success))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Duplicate);

    // 不同事件但状态相同
    let outcome = app
        .payments
        .reconcile(settlement(&order.order_code, "MT-123:capture", PaymentStatus::Success))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Unchanged);

    assert_eq!(product(&app.db, a).await.stock, 8);
    assert_eq!(product(&app.db, b).await.stock, 4);

    let rows = commissions::Entity::find().all(&app.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    // 只有带推广码的那一行计佣：28000 × 2 × 10%
    assert_eq!(rows[0].purchase_value, 56_000);
    assert_eq!(rows[0].commission_amount, 5_600);
    assert_eq!(rows[0].status, CommissionStatus::Pending);
    assert_eq!(affiliate_balance(&app.db, affiliate_id).await, 5_600);

    let paid = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Success);
    assert_eq!(paid.provider_transaction_id.as_deref(), Some("MT-123"));
    assert_eq!(paid.payment_method.as_deref(), Some("bank_transfer"));
    assert!(paid.paid_at.is_some());
    assert_eq!(paid.total_amount, 118_000);

    // 付款成功后自动下物流单
    assert_eq!(app.logistics.shipments.load(Ordering::SeqCst), 1);
    assert_eq!(paid.delivery_status, DeliveryStatus::ReadyToShip);
    assert!(paid.tracking_id.is_some());

    assert_eq!(payment_events::Entity::find().count(&app.db).await.unwrap(), 2);
}

#[tokio::test]
async fn racing_deliveries_apply_once() {
    let app = TestApp::new().await;
    let (order, affiliate_id, a, _) = order_with_referral(&app).await;

    let first = app
        .payments
        .reconcile(settlement(&order.order_code, "evt-1", PaymentStatus::Success));
    let second = app
        .payments
        .reconcile(settlement(&order.order_code, "evt-2", PaymentStatus::Success));
    let (first, second) = tokio::join!(first, second);

    let applied = [first.unwrap(), second.unwrap()]
        .iter()
        .filter(|o| matches!(o, ReconcileOutcome::Applied { .. }))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(product(&app.db, a).await.stock, 8);
    assert_eq!(affiliate_balance(&app.db, affiliate_id).await, 5_600);
}

#[tokio::test]
async fn success_never_regresses() {
    let app = TestApp::new().await;
    let (order, _, _, _) = order_with_referral(&app).await;

    app.payments
        .reconcile(settlement(&order.order_code, "evt-1", PaymentStatus::Success))
        .await
        .unwrap();

    let mut expire = settlement(&order.order_code, "evt-2", PaymentStatus::Expired);
    expire.provider_status = "expire".to_string();
    let outcome = app.payments.reconcile(expire).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Rejected {
            current: PaymentStatus::Success,
            requested: PaymentStatus::Expired,
        }
    );

    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Success);
}

#[tokio::test]
async fn failed_payment_has_no_side_effects() {
    let app = TestApp::new().await;
    let (order, affiliate_id, a, _) = order_with_referral(&app).await;

    let outcome = app
        .payments
        .reconcile(settlement(&order.order_code, "evt-deny", PaymentStatus::Failed))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied { status: PaymentStatus::Failed });

    assert_eq!(product(&app.db, a).await.stock, 10);
    assert_eq!(affiliate_balance(&app.db, affiliate_id).await, 0);
    assert_eq!(commissions::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(app.logistics.shipments.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_order_is_a_no_op() {
    let app = TestApp::new().await;
    let outcome = app
        .payments
        .reconcile(settlement("ORD-0-deadbeef", "evt-x", PaymentStatus::Success))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::OrderNotFound);
}

#[tokio::test]
async fn oversold_stock_is_clamped() {
    let app = TestApp::new().await;
    let (order, _, a, _) = order_with_referral(&app).await;

    // 建单后库存被别的订单用掉
    let mut p: products::ActiveModel = product(&app.db, a).await.into();
    p.stock = Set(1);
    p.update(&app.db).await.unwrap();

    let outcome = app
        .payments
        .reconcile(settlement(&order.order_code, "evt-1", PaymentStatus::Success))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied { status: PaymentStatus::Success });
    assert_eq!(product(&app.db, a).await.stock, 0);
}

#[tokio::test]
async fn shipment_failure_is_retried_without_repeating_effects() {
    let app = TestApp::new().await;
    let (order, affiliate_id, a, _) = order_with_referral(&app).await;
    app.logistics.fail_shipment.store(true, Ordering::SeqCst);

    app.payments
        .reconcile(settlement(&order.order_code, "evt-1", PaymentStatus::Success))
        .await
        .unwrap();
    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Success);
    assert!(stored.tracking_id.is_none());

    app.logistics.fail_shipment.store(false, Ordering::SeqCst);
    let booked = app.shipments.retry_pending_shipments().await.unwrap();
    assert_eq!(booked, 1);

    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert!(stored.tracking_id.is_some());
    assert_eq!(stored.delivery_status, DeliveryStatus::ReadyToShip);
    assert_eq!(product(&app.db, a).await.stock, 8);
    assert_eq!(affiliate_balance(&app.db, affiliate_id).await, 5_600);

    assert_eq!(app.shipments.retry_pending_shipments().await.unwrap(), 0);
}

async fn paid_without_shipment(app: &TestApp) -> orders::Model {
    let (order, _, _, _) = order_with_referral(app).await;
    app.logistics.fail_shipment.store(true, Ordering::SeqCst);
    app.payments
        .reconcile(settlement(&order.order_code, "evt-1", PaymentStatus::Success))
        .await
        .unwrap();
    app.logistics.fail_shipment.store(false, Ordering::SeqCst);
    order
}

#[tokio::test]
async fn concurrent_shipment_requests_book_once() {
    let app = TestApp::new().await;
    let order = paid_without_shipment(&app).await;

    let (direct, retried) = tokio::join!(
        app.shipments.request_shipment(order.id),
        app.shipments.retry_pending_shipments()
    );
    let booked = usize::from(direct.is_ok()) + retried.unwrap();
    assert_eq!(booked, 1);
    assert_eq!(app.logistics.shipments.load(Ordering::SeqCst), 1);

    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert!(stored.tracking_id.is_some());
    assert_eq!(stored.delivery_status, DeliveryStatus::ReadyToShip);
}

#[tokio::test]
async fn shipment_lease_blocks_retry_until_stale() {
    let app = TestApp::new().await;
    let order = paid_without_shipment(&app).await;

    // 另一个进程刚开始下单
    let mut held: orders::ActiveModel = orders::Entity::find_by_id(order.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    held.shipment_requested_at = Set(Some(Utc::now()));
    held.update(&app.db).await.unwrap();

    assert_eq!(app.shipments.retry_pending_shipments().await.unwrap(), 0);
    let err = app.shipments.request_shipment(order.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(app.logistics.shipments.load(Ordering::SeqCst), 0);

    // 租约过期后可以接手
    let mut stale: orders::ActiveModel = orders::Entity::find_by_id(order.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    stale.shipment_requested_at = Set(Some(Utc::now() - Duration::hours(1)));
    stale.update(&app.db).await.unwrap();

    assert_eq!(app.shipments.retry_pending_shipments().await.unwrap(), 1);
    assert_eq!(app.logistics.shipments.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sync_payment_status_uses_reconcile_path() {
    let app = TestApp::new().await;
    let (order, _, a, _) = order_with_referral(&app).await;
    app.midtrans.set_status("settlement", PaymentStatus::Success);

    let (outcome, updated) = app
        .payments
        .sync_payment_status(order.user_id, &order.order_code)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied { status: PaymentStatus::Success });
    assert_eq!(updated.payment_status, PaymentStatus::Success);
    assert_eq!(updated.provider_transaction_id.as_deref(), Some("TX-POLL"));
    assert_eq!(product(&app.db, a).await.stock, 8);

    // 主动查询没有事件标识，不写事件表
    assert_eq!(payment_events::Entity::find().count(&app.db).await.unwrap(), 0);
}
