use serde::Serialize;

use crate::entities::orders::{PaymentProvider, PaymentStatus};

/// webhook 或主动查询得到的一次支付状态变化
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    pub provider: PaymentProvider,
    pub order_code: String,
    /// 主动查询时没有事件标识
    pub event_key: Option<String>,
    pub provider_status: String,
    pub status: PaymentStatus,
    pub provider_transaction_id: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Applied { status: PaymentStatus },
    Unchanged,
    Duplicate,
    OrderNotFound,
    Rejected {
        current: PaymentStatus,
        requested: PaymentStatus,
    },
}
