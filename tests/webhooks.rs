mod common;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::{Value, json};

use commerce_backend::entities::orders::{DeliveryStatus, PaymentProvider, PaymentStatus};
use commerce_backend::entities::users::UserRole;
use commerce_backend::entities::orders;
use commerce_backend::external::midtrans;
use commerce_backend::handlers::{WebhookSecrets, webhook_config};
use commerce_backend::models::*;
use sea_orm::EntityTrait;

use common::*;

const SERVER_KEY: &str = "SB-Mid-server-test";
const CALLBACK_TOKEN: &str = "xnd-callback-test";
const BITESHIP_TOKEN: &str = "biteship-test";

fn secrets() -> WebhookSecrets {
    WebhookSecrets {
        midtrans_server_key: SERVER_KEY.to_string(),
        xendit_callback_token: CALLBACK_TOKEN.to_string(),
        biteship_webhook_token: BITESHIP_TOKEN.to_string(),
    }
}

async fn pending_order(app: &TestApp, provider: PaymentProvider) -> orders::Model {
    let buyer = seed_user(&app.db, "buyer@test.id", UserRole::Buyer).await;
    let p = seed_product(&app.db, "Kopi", 28_000, 10).await;
    let (order, _) = app
        .orders
        .create_order(
            buyer.id,
            CreateOrderRequest {
                items: vec![NewOrderItem {
                    product_id: p.id,
                    quantity: 2,
                    referral_code: None,
                }],
                provider,
                shipping: shipping(),
                shipping_cost: 15_000,
            },
        )
        .await
        .unwrap();
    order
}

fn midtrans_body(order_id: &str, status: &str, key: &str) -> Value {
    let status_code = "200";
    let gross_amount = "71000.00";
    json!({
        "order_id": order_id,
        "status_code": status_code,
        "gross_amount": gross_amount,
        "signature_key": midtrans::signature(order_id, status_code, gross_amount, key),
        "transaction_status": status,
        "transaction_id": "mt-tx-1",
        "payment_type": "bank_transfer",
    })
}

fn midtrans_capture(order_id: &str, fraud_status: &str) -> Value {
    let mut body = midtrans_body(order_id, "capture", SERVER_KEY);
    body["fraud_status"] = json!(fraud_status);
    body["payment_type"] = json!("credit_card");
    body
}

macro_rules! init_app {
    ($app:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(secrets()))
                .app_data(web::Data::new($app.payments.clone()))
                .app_data(web::Data::new($app.orders.clone()))
                .configure(webhook_config),
        )
        .await
    };
}

#[actix_web::test]
async fn midtrans_bad_signature_is_unauthorized() {
    let app = TestApp::new().await;
    let order = pending_order(&app, PaymentProvider::Midtrans).await;
    let service = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/webhook/midtrans")
        .set_json(midtrans_body(&order.order_code, "settlement", "wrong-key"))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn midtrans_settlement_marks_order_paid() {
    let app = TestApp::new().await;
    let order = pending_order(&app, PaymentProvider::Midtrans).await;
    let service = init_app!(app);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/webhook/midtrans")
            .set_json(midtrans_body(&order.order_code, "settlement", SERVER_KEY))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Success);
    assert_eq!(stored.payment_method.as_deref(), Some("bank_transfer"));
    assert_eq!(product(&app.db, 1).await.stock, 8);
}

#[actix_web::test]
async fn midtrans_challenged_capture_settles_after_review() {
    let app = TestApp::new().await;
    let order = pending_order(&app, PaymentProvider::Midtrans).await;
    let service = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/webhook/midtrans")
        .set_json(midtrans_capture(&order.order_code, "challenge"))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(resp["data"]["outcome"], "unchanged");

    let req = test::TestRequest::post()
        .uri("/webhook/midtrans")
        .set_json(midtrans_capture(&order.order_code, "accept"))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(resp["data"]["outcome"], "applied");
    assert_eq!(resp["data"]["status"], "success");

    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Success);
    assert_eq!(stored.payment_method.as_deref(), Some("credit_card"));
    assert_eq!(product(&app.db, 1).await.stock, 8);
}

#[actix_web::test]
async fn midtrans_unknown_order_and_malformed_payload_are_acknowledged() {
    let app = TestApp::new().await;
    let service = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/webhook/midtrans")
        .set_json(midtrans_body("ORD-0-00000000", "settlement", SERVER_KEY))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(resp["success"], true);
    assert_eq!(resp["data"]["outcome"], "order_not_found");

    let req = test::TestRequest::post()
        .uri("/webhook/midtrans")
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn xendit_requires_callback_token() {
    let app = TestApp::new().await;
    let order = pending_order(&app, PaymentProvider::Xendit).await;
    let service = init_app!(app);
    let body = json!({
        "id": "inv-1",
        "external_id": order.order_code,
        "status": "PAID",
        "payment_method": "BANK_TRANSFER",
    });

    let req = test::TestRequest::post()
        .uri("/webhook/xendit")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/webhook/xendit")
        .insert_header(("x-callback-token", CALLBACK_TOKEN))
        .set_json(&body)
        .to_request();
    let resp: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(resp["data"]["outcome"], "applied");
    assert_eq!(resp["data"]["status"], "success");

    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Success);
    assert_eq!(stored.provider_transaction_id.as_deref(), Some("inv-1"));
}

#[actix_web::test]
async fn biteship_webhook_updates_delivery() {
    let app = TestApp::new().await;
    let order = pending_order(&app, PaymentProvider::Xendit).await;
    let service = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/webhook/biteship")
        .insert_header(("x-biteship-token", "nope"))
        .set_json(json!({ "status": "delivered", "reference_id": order.order_code }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // 连通性检查
    let req = test::TestRequest::post()
        .uri("/webhook/biteship")
        .insert_header(("x-biteship-token", BITESHIP_TOKEN))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/webhook/biteship")
        .insert_header(("x-biteship-token", BITESHIP_TOKEN))
        .set_json(json!({
            "event": "order.status",
            "reference_id": order.order_code,
            "courier_waybill_id": "WB-9",
            "status": "delivered",
        }))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(resp["data"]["outcome"], "applied");

    let stored = orders::Entity::find_by_id(order.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Success);
    assert_eq!(stored.delivery_status, DeliveryStatus::Delivered);
    assert_eq!(stored.waybill_number.as_deref(), Some("WB-9"));
}
