//! Midtrans Snap 支付

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha512};

use super::payment::{GatewayStatus, PaymentGateway, PaymentIntent, PaymentRequest};
use super::read_json;
use crate::config::MidtransConfig;
use crate::entities::orders::{PaymentProvider, PaymentStatus};
use crate::error::AppResult;
use crate::models::PaymentNotification;

/// Midtrans 异步通知
#[derive(Debug, Clone, Deserialize)]
pub struct MidtransNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
}

impl MidtransNotification {
    /// 同一笔交易的同一状态只处理一次
    ///
    /// capture 会先以 challenge 到达、审核后以 accept 再次到达，
    /// 所以 fraud_status 也是键的一部分。
    pub fn event_key(&self) -> String {
        let id = self.transaction_id.as_deref().unwrap_or(&self.order_id);
        match self.fraud_status.as_deref() {
            Some(fraud) => format!("{id}:{}:{fraud}", self.transaction_status),
            None => format!("{id}:{}", self.transaction_status),
        }
    }

    pub fn verify(&self, server_key: &str) -> bool {
        if server_key.is_empty() {
            return false;
        }
        let expected = signature(&self.order_id, &self.status_code, &self.gross_amount, server_key);
        constant_time_eq(expected.as_bytes(), self.signature_key.to_ascii_lowercase().as_bytes())
    }

    pub fn to_notification(&self) -> PaymentNotification {
        PaymentNotification {
            provider: PaymentProvider::Midtrans,
            order_code: self.order_id.clone(),
            event_key: Some(self.event_key()),
            provider_status: self.transaction_status.clone(),
            status: map_status(&self.transaction_status, self.fraud_status.as_deref()),
            provider_transaction_id: self.transaction_id.clone(),
            payment_method: self.payment_type.clone(),
        }
    }
}

/// sha512(order_id + status_code + gross_amount + server_key)，十六进制
pub fn signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn map_status(transaction_status: &str, fraud_status: Option<&str>) -> PaymentStatus {
    match transaction_status {
        "capture" => match fraud_status {
            Some("accept") => PaymentStatus::Success,
            // 等待人工审核
            Some("challenge") => PaymentStatus::Pending,
            Some(_) | None => PaymentStatus::Failed,
        },
        "settlement" => PaymentStatus::Success,
        "pending" => PaymentStatus::Pending,
        _ => PaymentStatus::Failed,
    }
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    transaction_status: String,
    #[serde(default)]
    fraud_status: Option<String>,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    payment_type: Option<String>,
}

#[derive(Clone)]
pub struct MidtransGateway {
    client: Client,
    config: MidtransConfig,
    frontend_url: String,
}

impl MidtransGateway {
    pub fn new(client: Client, config: MidtransConfig, frontend_url: String) -> Self {
        Self {
            client,
            config,
            frontend_url,
        }
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Midtrans
    }

    async fn create_payment(&self, request: &PaymentRequest) -> AppResult<PaymentIntent> {
        let url = format!("{}/transactions", self.config.snap_url);
        let item_details: Vec<_> = request
            .items
            .iter()
            .map(|item| {
                json!({
                    "id": item.id,
                    "price": item.price,
                    "quantity": item.quantity,
                    // Midtrans 限制商品名 50 字符
                    "name": item.name.chars().take(50).collect::<String>(),
                })
            })
            .collect();

        let body = json!({
            "transaction_details": {
                "order_id": request.order_code,
                "gross_amount": request.amount,
            },
            "customer_details": {
                "first_name": request.customer.name,
                "email": request.customer.email,
                "phone": request.customer.phone.clone().unwrap_or_default(),
            },
            "item_details": item_details,
            "callbacks": {
                "finish": format!("{}/payment/finish", self.frontend_url),
            },
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.server_key, None::<&str>)
            .json(&body)
            .send()
            .await?;

        let snap: SnapResponse = read_json("midtrans", response).await?;
        log::info!("Midtrans snap created for order {}", request.order_code);

        Ok(PaymentIntent {
            payment_url: snap.redirect_url,
            provider_transaction_id: None,
        })
    }

    async fn get_status(
        &self,
        order_code: &str,
        _provider_transaction_id: Option<&str>,
    ) -> AppResult<GatewayStatus> {
        let url = format!("{}/{}/status", self.config.api_url, order_code);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.server_key, None::<&str>)
            .send()
            .await?;

        let body: StatusResponse = read_json("midtrans", response).await?;
        Ok(GatewayStatus {
            status: map_status(&body.transaction_status, body.fraud_status.as_deref()),
            raw_status: body.transaction_status,
            provider_transaction_id: body.transaction_id,
            payment_method: body.payment_type,
        })
    }

    async fn cancel(&self, order_code: &str, _provider_transaction_id: Option<&str>) -> AppResult<()> {
        let url = format!("{}/{}/cancel", self.config.api_url, order_code);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.server_key, None::<&str>)
            .send()
            .await?;

        let _: serde_json::Value = read_json("midtrans", response).await?;
        Ok(())
    }
}
