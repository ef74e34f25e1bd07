use crate::entities::affiliate_application_entity::{self, ApplicationStatus};
use crate::entities::commission_entity::{self, CommissionStatus};
use crate::entities::affiliate_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyAffiliateRequest {
    pub bank_type: String,
    pub account_name: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateApplicationResponse {
    pub id: i64,
    pub user_id: i64,
    pub status: ApplicationStatus,
    pub bank_type: String,
    pub account_name: String,
    pub account_number: String,
    pub bank_book_image_url: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<affiliate_application_entity::Model> for AffiliateApplicationResponse {
    fn from(m: affiliate_application_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            status: m.status,
            bank_type: m.bank_type,
            account_name: m.account_name,
            account_number: m.account_number,
            bank_book_image_url: m.bank_book_image_url,
            reviewed_at: m.reviewed_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateResponse {
    pub id: i64,
    pub user_id: i64,
    pub referral_code: String,
    pub bank_type: String,
    pub account_name: String,
    pub account_number: String,
    pub total_commission: i64,
}

impl From<affiliate_entity::Model> for AffiliateResponse {
    fn from(m: affiliate_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            referral_code: m.referral_code,
            bank_type: m.bank_type,
            account_name: m.account_name,
            account_number: m.account_number,
            total_commission: m.total_commission,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionResponse {
    pub id: i64,
    pub order_code: String,
    pub purchase_value: i64,
    pub commission_amount: i64,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<commission_entity::Model> for CommissionResponse {
    fn from(m: commission_entity::Model) -> Self {
        Self {
            id: m.id,
            order_code: m.order_code,
            purchase_value: m.purchase_value,
            commission_amount: m.commission_amount,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateSummary {
    pub referral_code: String,
    /// 当前可提现余额
    pub balance: i64,
    pub lifetime_commission: i64,
    pub pending_withdrawal: i64,
    pub total_withdrawn: i64,
    pub commission_count: u64,
}
