mod common;

use std::sync::atomic::Ordering;

use commerce_backend::entities::commissions::CommissionStatus;
use commerce_backend::entities::orders::{DeliveryStatus, PaymentProvider, PaymentStatus};
use commerce_backend::entities::users::UserRole;
use commerce_backend::entities::{commissions, orders};
use commerce_backend::error::AppError;
use commerce_backend::models::*;
use sea_orm::EntityTrait;

use common::*;

async fn referred_order(app: &TestApp) -> orders::Model {
    let buyer = seed_user(&app.db, "buyer@test.id", UserRole::Buyer).await;
    let partner = seed_user(&app.db, "partner@test.id", UserRole::Affiliate).await;
    seed_affiliate(&app.db, partner.id, "PARTNER1", 0).await;
    let p = seed_product(&app.db, "Kopi", 40_000, 10).await;

    let (order, _) = app
        .orders
        .create_order(
            buyer.id,
            CreateOrderRequest {
                items: vec![NewOrderItem {
                    product_id: p.id,
                    quantity: 1,
                    referral_code: Some("PARTNER1".to_string()),
                }],
                provider: PaymentProvider::Xendit,
                shipping: shipping(),
                shipping_cost: 9_000,
            },
        )
        .await
        .unwrap();
    order
}

fn update(order: &orders::Model, status: &str) -> CarrierUpdate {
    CarrierUpdate {
        order_code: Some(order.order_code.clone()),
        tracking_id: None,
        status: status.to_string(),
        waybill_number: None,
    }
}

async fn reload(app: &TestApp, id: i64) -> orders::Model {
    orders::Entity::find_by_id(id).one(&app.db).await.unwrap().unwrap()
}

#[tokio::test]
async fn request_shipment_is_booked_once() {
    let app = TestApp::new().await;
    let order = referred_order(&app).await;

    let err = app.shipments.request_shipment(order.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "unpaid order");
    assert_eq!(app.logistics.shipments.load(Ordering::SeqCst), 0);

    app.orders.update_status(order.id, "success").await.unwrap();
    assert_eq!(app.logistics.shipments.load(Ordering::SeqCst), 1);

    let err = app.shipments.request_shipment(order.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(app.logistics.shipments.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn carrier_progress_and_delivery_settle_commissions() {
    let app = TestApp::new().await;
    let order = referred_order(&app).await;
    app.orders.update_status(order.id, "success").await.unwrap();
    let booked = reload(&app, order.id).await;
    let tracking_id = booked.tracking_id.clone().unwrap();

    // 按运单号匹配
    let outcome = app
        .orders
        .handle_carrier_update(CarrierUpdate {
            order_code: None,
            tracking_id: Some(tracking_id),
            status: "picked".to_string(),
            waybill_number: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Applied { status: DeliveryStatus::Shipped });

    let outcome = app.orders.handle_carrier_update(update(&order, "picked")).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Unchanged);

    let outcome = app.orders.handle_carrier_update(update(&order, "allocated")).await.unwrap();
    assert_eq!(
        outcome,
        DeliveryOutcome::Rejected {
            current: DeliveryStatus::Shipped,
            requested: DeliveryStatus::ReadyToShip,
        }
    );

    let outcome = app.orders.handle_carrier_update(update(&order, "delivered")).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Applied { status: DeliveryStatus::Delivered });

    let rows = commissions::Entity::find().all(&app.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, CommissionStatus::Paid);

    let outcome = app.orders.handle_carrier_update(update(&order, "returned")).await.unwrap();
    assert!(matches!(outcome, DeliveryOutcome::Rejected { .. }), "delivered is terminal");
}

#[tokio::test]
async fn delivery_confirms_pending_payment() {
    let app = TestApp::new().await;
    let order = referred_order(&app).await;

    let outcome = app.orders.handle_carrier_update(update(&order, "delivered")).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Applied { status: DeliveryStatus::Delivered });

    let stored = reload(&app, order.id).await;
    assert_eq!(stored.payment_status, PaymentStatus::Success);
    assert_eq!(stored.delivery_status, DeliveryStatus::Delivered);

    let rows = commissions::Entity::find().all(&app.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].commission_amount, 4_000);
    assert_eq!(rows[0].status, CommissionStatus::Paid);
}

#[tokio::test]
async fn carrier_updates_for_unpaid_or_unknown_orders() {
    let app = TestApp::new().await;
    let order = referred_order(&app).await;

    let outcome = app.orders.handle_carrier_update(update(&order, "picked")).await.unwrap();
    assert!(matches!(outcome, DeliveryOutcome::Rejected { .. }));
    assert_eq!(reload(&app, order.id).await.delivery_status, DeliveryStatus::Idle);

    let outcome = app
        .orders
        .handle_carrier_update(update(&order, "courier_not_found"))
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Ignored);

    let outcome = app
        .orders
        .handle_carrier_update(CarrierUpdate {
            order_code: Some("ORD-missing".to_string()),
            tracking_id: Some("TRK-missing".to_string()),
            status: "delivered".to_string(),
            waybill_number: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::OrderNotFound);
}

#[tokio::test]
async fn shipping_lookups_validate_input() {
    let app = TestApp::new().await;

    let err = app.shipments.search_areas("ab").await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    let areas = app.shipments.search_areas("Menteng").await.unwrap();
    assert_eq!(areas.len(), 1);
}
