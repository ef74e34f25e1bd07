use crate::entities::order_entity::{self, DeliveryStatus, PaymentProvider, PaymentStatus};
use crate::entities::order_item_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_address: String,
    pub recipient_city: Option<String>,
    pub recipient_postal_code: Option<String>,
    pub recipient_area_id: Option<String>,
    pub courier_company: String,
    pub courier_service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub provider: PaymentProvider,
    pub shipping: ShippingDetails,
    pub shipping_cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i32,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<NewOrderItem>,
    pub provider: PaymentProvider,
    pub shipping: ShippingDetails,
    pub shipping_cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: i64,
    pub order_code: String,
    pub total_amount: i64,
    pub shipping_cost: i64,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub payment_provider: PaymentProvider,
    pub payment_method: Option<String>,
    pub payment_url: Option<String>,
    pub tracking_id: Option<String>,
    pub waybill_number: Option<String>,
    pub shipping: ShippingDetails,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<order_entity::Model> for OrderResponse {
    fn from(m: order_entity::Model) -> Self {
        Self {
            id: m.id,
            order_code: m.order_code,
            total_amount: m.total_amount,
            shipping_cost: m.shipping_cost,
            payment_status: m.payment_status,
            delivery_status: m.delivery_status,
            payment_provider: m.payment_provider,
            payment_method: m.payment_method,
            payment_url: m.payment_url,
            tracking_id: m.tracking_id,
            waybill_number: m.waybill_number,
            shipping: ShippingDetails {
                recipient_name: m.recipient_name,
                recipient_phone: m.recipient_phone,
                recipient_address: m.recipient_address,
                recipient_city: m.recipient_city,
                recipient_postal_code: m.recipient_postal_code,
                recipient_area_id: m.recipient_area_id,
                courier_company: m.courier_company,
                courier_service: m.courier_service,
            },
            paid_at: m.paid_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub subtotal: i64,
    pub referral_code: Option<String>,
}

impl From<order_item_entity::Model> for OrderItemResponse {
    fn from(m: order_item_entity::Model) -> Self {
        Self {
            subtotal: m.subtotal(),
            product_id: m.product_id,
            product_name: m.product_name,
            unit_price: m.unit_price,
            quantity: m.quantity,
            referral_code: m.referral_code,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimelineSource {
    Order,
    Carrier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub source: TimelineSource,
    pub status: String,
    pub note: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailResponse {
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub payment_url: Option<String>,
}

/// 物流商推送的一次状态更新
#[derive(Debug, Clone, Default)]
pub struct CarrierUpdate {
    pub order_code: Option<String>,
    pub tracking_id: Option<String>,
    pub status: String,
    pub waybill_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Applied { status: DeliveryStatus },
    Unchanged,
    /// 无法映射到本地配送状态
    Ignored,
    OrderNotFound,
    Rejected {
        current: DeliveryStatus,
        requested: DeliveryStatus,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}
