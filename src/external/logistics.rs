use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Area {
    pub id: String,
    pub name: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub name: String,
    pub value: i64,
    pub quantity: i32,
    pub weight_grams: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuery {
    pub origin_area_id: Option<String>,
    pub origin_postal_code: Option<String>,
    pub destination_area_id: Option<String>,
    pub destination_postal_code: Option<String>,
    /// 逗号分隔，例如 "jne,sicepat"
    pub couriers: String,
    pub items: Vec<ShipmentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourierRate {
    pub courier_company: String,
    pub courier_service: String,
    pub courier_name: Option<String>,
    pub price: i64,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentContact {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub postal_code: Option<String>,
    pub area_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentRequest {
    pub reference_id: String,
    pub origin: ShipmentContact,
    pub destination: ShipmentContact,
    pub courier_company: String,
    pub courier_service: String,
    pub items: Vec<ShipmentItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentBooking {
    pub tracking_id: String,
    pub waybill_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackingEvent {
    pub status: String,
    pub note: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackingInfo {
    pub status: Option<String>,
    pub waybill_number: Option<String>,
    pub history: Vec<TrackingEvent>,
}

#[async_trait]
pub trait LogisticsProvider: Send + Sync {
    async fn search_areas(&self, query: &str) -> AppResult<Vec<Area>>;

    async fn get_rates(&self, query: &RateQuery) -> AppResult<Vec<CourierRate>>;

    async fn create_shipment(&self, request: &ShipmentRequest) -> AppResult<ShipmentBooking>;

    async fn get_tracking(&self, tracking_id: &str) -> AppResult<TrackingInfo>;
}
