//! Xendit Invoice 支付

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::midtrans::constant_time_eq;
use super::payment::{GatewayStatus, PaymentGateway, PaymentIntent, PaymentRequest};
use super::read_json;
use crate::config::XenditConfig;
use crate::entities::orders::{PaymentProvider, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::models::PaymentNotification;

const INVOICE_DURATION_SECS: i64 = 86_400;

/// Xendit 发票回调
#[derive(Debug, Clone, Deserialize)]
pub struct XenditCallback {
    pub id: String,
    pub external_id: String,
    pub status: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_channel: Option<String>,
}

impl XenditCallback {
    pub fn event_key(&self) -> String {
        format!("{}:{}", self.id, self.status)
    }

    pub fn payment_method(&self) -> Option<String> {
        self.payment_method.clone().or_else(|| self.payment_channel.clone())
    }

    pub fn to_notification(&self) -> PaymentNotification {
        PaymentNotification {
            provider: PaymentProvider::Xendit,
            order_code: self.external_id.clone(),
            event_key: Some(self.event_key()),
            provider_status: self.status.clone(),
            status: map_status(&self.status),
            provider_transaction_id: Some(self.id.clone()),
            payment_method: self.payment_method(),
        }
    }
}

/// x-callback-token 与配置比对，未配置时一律拒绝
pub fn verify_callback_token(header: Option<&str>, expected: &str) -> bool {
    match header {
        Some(token) if !expected.is_empty() => constant_time_eq(token.as_bytes(), expected.as_bytes()),
        _ => false,
    }
}

pub fn map_status(status: &str) -> PaymentStatus {
    match status {
        "PAID" | "SETTLED" => PaymentStatus::Success,
        "EXPIRED" => PaymentStatus::Expired,
        "PENDING" => PaymentStatus::Pending,
        _ => PaymentStatus::Failed,
    }
}

#[derive(Debug, Deserialize)]
struct Invoice {
    id: String,
    #[serde(default)]
    invoice_url: Option<String>,
    status: String,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    payment_channel: Option<String>,
}

#[derive(Clone)]
pub struct XenditGateway {
    client: Client,
    config: XenditConfig,
    frontend_url: String,
}

impl XenditGateway {
    pub fn new(client: Client, config: XenditConfig, frontend_url: String) -> Self {
        Self {
            client,
            config,
            frontend_url,
        }
    }

    async fn find_invoice(&self, order_code: &str, invoice_id: Option<&str>) -> AppResult<Invoice> {
        if let Some(id) = invoice_id {
            let url = format!("{}/v2/invoices/{}", self.config.api_url, id);
            let response = self
                .client
                .get(&url)
                .basic_auth(&self.config.secret_key, Some(""))
                .send()
                .await?;
            return read_json("xendit", response).await;
        }

        let url = format!("{}/v2/invoices", self.config.api_url);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.secret_key, Some(""))
            .query(&[("external_id", order_code)])
            .send()
            .await?;
        let invoices: Vec<Invoice> = read_json("xendit", response).await?;
        invoices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::UpstreamError(format!("xendit has no invoice for {order_code}")))
    }
}

#[async_trait]
impl PaymentGateway for XenditGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Xendit
    }

    async fn create_payment(&self, request: &PaymentRequest) -> AppResult<PaymentIntent> {
        let url = format!("{}/v2/invoices", self.config.api_url);
        let items: Vec<_> = request
            .items
            .iter()
            .map(|item| json!({ "name": item.name, "quantity": item.quantity, "price": item.price }))
            .collect();

        let body = json!({
            "external_id": request.order_code,
            "amount": request.amount,
            "payer_email": request.customer.email,
            "description": format!("Payment for {}", request.order_code),
            "invoice_duration": INVOICE_DURATION_SECS,
            "currency": "IDR",
            "items": items,
            "success_redirect_url": format!("{}/payment/success", self.frontend_url),
            "failure_redirect_url": format!("{}/payment/failed", self.frontend_url),
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.secret_key, Some(""))
            .json(&body)
            .send()
            .await?;

        let invoice: Invoice = read_json("xendit", response).await?;
        let payment_url = invoice
            .invoice_url
            .ok_or_else(|| AppError::UpstreamError("xendit invoice has no url".to_string()))?;
        log::info!("Xendit invoice {} created for order {}", invoice.id, request.order_code);

        Ok(PaymentIntent {
            payment_url,
            provider_transaction_id: Some(invoice.id),
        })
    }

    async fn get_status(
        &self,
        order_code: &str,
        provider_transaction_id: Option<&str>,
    ) -> AppResult<GatewayStatus> {
        let invoice = self.find_invoice(order_code, provider_transaction_id).await?;
        Ok(GatewayStatus {
            status: map_status(&invoice.status),
            raw_status: invoice.status,
            provider_transaction_id: Some(invoice.id),
            payment_method: invoice.payment_method.or(invoice.payment_channel),
        })
    }

    async fn cancel(&self, order_code: &str, provider_transaction_id: Option<&str>) -> AppResult<()> {
        let invoice_id = match provider_transaction_id {
            Some(id) => id.to_string(),
            None => self.find_invoice(order_code, None).await?.id,
        };
        let url = format!("{}/invoices/{}/expire!", self.config.api_url, invoice_id);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.secret_key, Some(""))
            .send()
            .await?;

        let _: serde_json::Value = read_json("xendit", response).await?;
        Ok(())
    }
}
