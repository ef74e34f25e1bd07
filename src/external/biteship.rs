//! Biteship 物流 API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::logistics::{
    Area, CourierRate, LogisticsProvider, RateQuery, ShipmentBooking, ShipmentRequest,
    TrackingEvent, TrackingInfo,
};
use super::read_json;
use crate::config::BiteshipConfig;
use crate::entities::orders::DeliveryStatus;
use crate::error::{AppError, AppResult};

/// Biteship 状态映射到内部物流状态，无关状态返回 None
pub fn map_status(status: &str) -> Option<DeliveryStatus> {
    match status.to_ascii_lowercase().as_str() {
        "confirmed" | "scheduled" | "allocated" | "picking_up" => Some(DeliveryStatus::ReadyToShip),
        "picked" | "picked_up" => Some(DeliveryStatus::Shipped),
        "dropping_off" | "on_delivery" => Some(DeliveryStatus::OnDelivery),
        "delivered" => Some(DeliveryStatus::Delivered),
        "return_in_transit" | "returned" | "rejected" | "disposed" | "cancelled" => {
            Some(DeliveryStatus::Returned)
        }
        _ => None,
    }
}

/// webhook 请求头里的共享 token，未配置时一律拒绝
pub fn verify_webhook_token(header: Option<&str>, expected: &str) -> bool {
    match header {
        Some(token) if !expected.is_empty() => {
            super::midtrans::constant_time_eq(token.as_bytes(), expected.as_bytes())
        }
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct AreasResponse {
    #[serde(default)]
    areas: Vec<BiteshipArea>,
}

#[derive(Debug, Deserialize)]
struct BiteshipArea {
    id: String,
    name: String,
    #[serde(default)]
    postal_code: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    pricing: Vec<BiteshipRate>,
}

#[derive(Debug, Deserialize)]
struct BiteshipRate {
    courier_code: String,
    courier_service_code: String,
    #[serde(default)]
    courier_name: Option<String>,
    price: i64,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    #[serde(default)]
    courier: Option<OrderCourier>,
}

#[derive(Debug, Deserialize)]
struct OrderCourier {
    #[serde(default)]
    tracking_id: Option<String>,
    #[serde(default)]
    waybill_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackingResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    waybill_id: Option<String>,
    #[serde(default)]
    history: Vec<TrackingHistory>,
}

#[derive(Debug, Deserialize)]
struct TrackingHistory {
    status: String,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Clone)]
pub struct BiteshipClient {
    client: Client,
    config: BiteshipConfig,
}

impl BiteshipClient {
    pub fn new(client: Client, config: BiteshipConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.base_url, path)
    }
}

#[async_trait]
impl LogisticsProvider for BiteshipClient {
    async fn search_areas(&self, query: &str) -> AppResult<Vec<Area>> {
        let response = self
            .client
            .get(self.url("/maps/areas"))
            .bearer_auth(&self.config.api_key)
            .query(&[("countries", "ID"), ("input", query), ("type", "single")])
            .send()
            .await?;

        let body: AreasResponse = read_json("biteship", response).await?;
        Ok(body
            .areas
            .into_iter()
            .map(|a| Area {
                id: a.id,
                name: a.name,
                postal_code: a.postal_code.and_then(|v| match v {
                    Value::Number(n) => Some(n.to_string()),
                    Value::String(s) => Some(s),
                    _ => None,
                }),
            })
            .collect())
    }

    async fn get_rates(&self, query: &RateQuery) -> AppResult<Vec<CourierRate>> {
        let items: Vec<_> = query
            .items
            .iter()
            .map(|i| {
                json!({
                    "name": i.name,
                    "value": i.value,
                    "quantity": i.quantity,
                    "weight": i.weight_grams,
                })
            })
            .collect();

        let mut body = json!({ "couriers": query.couriers, "items": items });
        if let Some(id) = &query.origin_area_id {
            body["origin_area_id"] = json!(id);
        }
        if let Some(code) = &query.origin_postal_code {
            body["origin_postal_code"] = json!(code);
        }
        if let Some(id) = &query.destination_area_id {
            body["destination_area_id"] = json!(id);
        }
        if let Some(code) = &query.destination_postal_code {
            body["destination_postal_code"] = json!(code);
        }

        let response = self
            .client
            .post(self.url("/rates/couriers"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let body: RatesResponse = read_json("biteship", response).await?;
        Ok(body
            .pricing
            .into_iter()
            .map(|r| CourierRate {
                courier_company: r.courier_code,
                courier_service: r.courier_service_code,
                courier_name: r.courier_name,
                price: r.price,
                duration: r.duration,
            })
            .collect())
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> AppResult<ShipmentBooking> {
        let items: Vec<_> = request
            .items
            .iter()
            .map(|i| {
                json!({
                    "name": i.name,
                    "value": i.value,
                    "quantity": i.quantity,
                    "weight": i.weight_grams,
                })
            })
            .collect();

        let body = json!({
            "reference_id": request.reference_id,
            "shipper_contact_name": request.origin.name,
            "shipper_contact_phone": request.origin.phone,
            "origin_contact_name": request.origin.name,
            "origin_contact_phone": request.origin.phone,
            "origin_address": request.origin.address,
            "origin_postal_code": request.origin.postal_code,
            "origin_area_id": request.origin.area_id,
            "destination_contact_name": request.destination.name,
            "destination_contact_phone": request.destination.phone,
            "destination_address": request.destination.address,
            "destination_postal_code": request.destination.postal_code,
            "destination_area_id": request.destination.area_id,
            "courier_company": request.courier_company,
            "courier_type": request.courier_service,
            "delivery_type": "now",
            "items": items,
        });

        let response = self
            .client
            .post(self.url("/orders"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let order: OrderResponse = read_json("biteship", response).await?;
        let courier = order
            .courier
            .ok_or_else(|| AppError::UpstreamError("biteship order has no courier".to_string()))?;
        let tracking_id = courier
            .tracking_id
            .ok_or_else(|| AppError::UpstreamError("biteship order has no tracking id".to_string()))?;

        log::info!(
            "Biteship shipment booked for {}: tracking {}",
            request.reference_id,
            tracking_id
        );

        Ok(ShipmentBooking {
            tracking_id,
            waybill_number: courier.waybill_id,
        })
    }

    async fn get_tracking(&self, tracking_id: &str) -> AppResult<TrackingInfo> {
        let response = self
            .client
            .get(self.url(&format!("/trackings/{tracking_id}")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let body: TrackingResponse = read_json("biteship", response).await?;
        Ok(TrackingInfo {
            status: body.status,
            waybill_number: body.waybill_id,
            history: body
                .history
                .into_iter()
                .map(|h| TrackingEvent {
                    status: h.status,
                    note: h.note,
                    updated_at: h.updated_at,
                })
                .collect(),
        })
    }
}
