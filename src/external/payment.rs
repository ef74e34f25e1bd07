use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::entities::orders::{PaymentProvider, PaymentStatus};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct PaymentCustomer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentLineItem {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
}

/// 金额必须等于 items 的合计（含运费行）
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_code: String,
    pub amount: i64,
    pub items: Vec<PaymentLineItem>,
    pub customer: PaymentCustomer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub payment_url: String,
    pub provider_transaction_id: Option<String>,
}

/// 渠道查询到的状态，已映射到内部支付状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayStatus {
    pub raw_status: String,
    pub status: PaymentStatus,
    pub provider_transaction_id: Option<String>,
    pub payment_method: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn create_payment(&self, request: &PaymentRequest) -> AppResult<PaymentIntent>;

    async fn get_status(
        &self,
        order_code: &str,
        provider_transaction_id: Option<&str>,
    ) -> AppResult<GatewayStatus>;

    async fn cancel(&self, order_code: &str, provider_transaction_id: Option<&str>) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PaymentGateways {
    midtrans: Arc<dyn PaymentGateway>,
    xendit: Arc<dyn PaymentGateway>,
}

impl PaymentGateways {
    pub fn new(midtrans: Arc<dyn PaymentGateway>, xendit: Arc<dyn PaymentGateway>) -> AppResult<Self> {
        if midtrans.provider() != PaymentProvider::Midtrans || xendit.provider() != PaymentProvider::Xendit {
            return Err(AppError::ConfigError(
                "payment gateways registered under the wrong provider".to_string(),
            ));
        }
        Ok(Self { midtrans, xendit })
    }

    pub fn get(&self, provider: PaymentProvider) -> Arc<dyn PaymentGateway> {
        match provider {
            PaymentProvider::Midtrans => self.midtrans.clone(),
            PaymentProvider::Xendit => self.xendit.clone(),
        }
    }
}
