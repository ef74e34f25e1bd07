use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    #[sea_orm(string_value = "midtrans")]
    Midtrans,
    #[sea_orm(string_value = "xendit")]
    Xendit,
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProvider::Midtrans => write!(f, "midtrans"),
            PaymentProvider::Xendit => write!(f, "xendit"),
        }
    }
}

/// 支付轴：pending 只能流向一个终态，终态不可再变
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// 同状态不算迁移，由调用方当作 no-op 处理
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        *self == Self::Pending && next != Self::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Success => write!(f, "success"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Expired => write!(f, "expired"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 物流轴：只能按顺序前进，发货后可转为退回
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "idle")]
    Idle,
    #[sea_orm(string_value = "packing")]
    Packing,
    #[sea_orm(string_value = "packed")]
    Packed,
    #[sea_orm(string_value = "ready_to_ship")]
    ReadyToShip,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "on_delivery")]
    OnDelivery,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "returned")]
    Returned,
}

impl DeliveryStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "packing" => Some(Self::Packing),
            "packed" => Some(Self::Packed),
            "ready_to_ship" => Some(Self::ReadyToShip),
            "shipped" => Some(Self::Shipped),
            "on_delivery" => Some(Self::OnDelivery),
            "delivered" => Some(Self::Delivered),
            "returned" => Some(Self::Returned),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Packing => 1,
            Self::Packed => 2,
            Self::ReadyToShip => 3,
            Self::Shipped => 4,
            Self::OnDelivery => 5,
            Self::Delivered => 6,
            Self::Returned => 7,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Returned)
    }

    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        match (self, next) {
            (Self::Delivered | Self::Returned, _) => false,
            (Self::ReadyToShip | Self::Shipped | Self::OnDelivery, Self::Returned) => true,
            (_, Self::Returned) => false,
            _ => next.rank() > self.rank(),
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliveryStatus::Idle => "idle",
            DeliveryStatus::Packing => "packing",
            DeliveryStatus::Packed => "packed",
            DeliveryStatus::ReadyToShip => "ready_to_ship",
            DeliveryStatus::Shipped => "shipped",
            DeliveryStatus::OnDelivery => "on_delivery",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Returned => "returned",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub order_code: String,
    pub user_id: i64,
    pub total_amount: i64,
    pub shipping_cost: i64,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub payment_provider: PaymentProvider,
    pub provider_transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub payment_url: Option<String>,
    pub tracking_id: Option<String>,
    pub waybill_number: Option<String>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_address: String,
    pub recipient_city: Option<String>,
    pub recipient_postal_code: Option<String>,
    pub recipient_area_id: Option<String>,
    pub courier_company: String,
    pub courier_service: String,
    pub paid_at: Option<DateTime<Utc>>,
    /// 物流下单租约，避免并发重复下单
    pub shipment_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
