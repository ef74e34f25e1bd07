//! 支付渠道和物流商的回调入口
//!
//! 验签失败返回 401；报文格式错误、订单不存在、重复事件都回 200 并记日志，
//! 避免对方无限重试；数据库或上游错误返回 5xx，让对方稍后重试。

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::external::midtrans::MidtransNotification;
use crate::external::xendit::{self, XenditCallback};
use crate::external::biteship;
use crate::models::{ApiResponse, CarrierUpdate};
use crate::services::{OrderService, PaymentService};

/// 各渠道的验签密钥
#[derive(Debug, Clone)]
pub struct WebhookSecrets {
    pub midtrans_server_key: String,
    pub xendit_callback_token: String,
    pub biteship_webhook_token: String,
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn ack(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ack(message))
}

pub async fn midtrans_webhook(
    body: web::Bytes,
    secrets: web::Data<WebhookSecrets>,
    payment_service: web::Data<PaymentService>,
) -> AppResult<HttpResponse> {
    let notification: MidtransNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            log::warn!("Malformed Midtrans notification ignored: {e}");
            return Ok(ack("ignored"));
        }
    };

    if !notification.verify(&secrets.midtrans_server_key) {
        log::warn!("Midtrans signature mismatch for order {}", notification.order_id);
        return Err(AppError::Unauthorized("Invalid signature".to_string()));
    }

    log::info!(
        "Midtrans notification: order {} status {}",
        notification.order_id,
        notification.transaction_status
    );
    let outcome = payment_service.reconcile(notification.to_notification()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

pub async fn xendit_webhook(
    req: HttpRequest,
    body: web::Bytes,
    secrets: web::Data<WebhookSecrets>,
    payment_service: web::Data<PaymentService>,
) -> AppResult<HttpResponse> {
    if !xendit::verify_callback_token(
        header(&req, "x-callback-token"),
        &secrets.xendit_callback_token,
    ) {
        log::warn!("Xendit callback token mismatch");
        return Err(AppError::Unauthorized("Invalid callback token".to_string()));
    }

    let callback: XenditCallback = match serde_json::from_slice(&body) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Malformed Xendit callback ignored: {e}");
            return Ok(ack("ignored"));
        }
    };

    log::info!(
        "Xendit callback: invoice {} order {} status {}",
        callback.id,
        callback.external_id,
        callback.status
    );
    let outcome = payment_service.reconcile(callback.to_notification()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

/// Biteship order.status 推送
#[derive(Debug, Deserialize)]
struct BiteshipWebhook {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    reference_id: Option<String>,
    #[serde(default)]
    courier_tracking_id: Option<String>,
    #[serde(default)]
    courier_waybill_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

pub async fn biteship_webhook(
    req: HttpRequest,
    body: web::Bytes,
    secrets: web::Data<WebhookSecrets>,
    order_service: web::Data<OrderService>,
) -> AppResult<HttpResponse> {
    if !biteship::verify_webhook_token(
        header(&req, "x-biteship-token"),
        &secrets.biteship_webhook_token,
    ) {
        log::warn!("Biteship webhook token mismatch");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    // Biteship 注册 webhook 时会发一个空请求做连通性检查
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ack("ok"));
    }

    let payload: BiteshipWebhook = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("Malformed Biteship webhook ignored: {e}");
            return Ok(ack("ignored"));
        }
    };

    let Some(status) = payload.status else {
        log::info!("Biteship webhook without status ignored (event {:?})", payload.event);
        return Ok(ack("ignored"));
    };

    let outcome = order_service
        .handle_carrier_update(CarrierUpdate {
            order_code: payload.reference_id,
            tracking_id: payload.courier_tracking_id,
            status,
            waybill_number: payload.courier_waybill_id,
        })
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhook")
            .route("/midtrans", web::post().to(midtrans_webhook))
            .route("/xendit", web::post().to(xendit_webhook))
            .route("/biteship", web::post().to(biteship_webhook)),
    );
}
