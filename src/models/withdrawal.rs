use crate::entities::withdraw_request_entity::{self, WithdrawStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWithdrawRequest {
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequestResponse {
    pub id: i64,
    pub affiliate_id: i64,
    pub amount: i64,
    pub status: WithdrawStatus,
    pub proof_image_url: Option<String>,
    pub rejection_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<withdraw_request_entity::Model> for WithdrawRequestResponse {
    fn from(m: withdraw_request_entity::Model) -> Self {
        Self {
            id: m.id,
            affiliate_id: m.affiliate_id,
            amount: m.amount,
            status: m.status,
            proof_image_url: m.proof_image_url,
            rejection_reason: m.rejection_reason,
            processed_at: m.processed_at,
            created_at: m.created_at,
        }
    }
}
