use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::config::ShipperConfig;
use crate::entities::order_entity::{self as orders, DeliveryStatus, PaymentStatus};
use crate::entities::order_item_entity as order_items;
use crate::error::{AppError, AppResult};
use crate::external::{
    Area, CourierRate, LogisticsProvider, RateQuery, ShipmentBooking, ShipmentContact,
    ShipmentItem, ShipmentRequest, TrackingInfo,
};

const RETRY_BATCH_SIZE: u64 = 50;
/// 下单租约时长，超过后视为上一次下单已中断
const SHIPMENT_LEASE_SECS: i64 = 300;

#[derive(Clone)]
pub struct ShipmentService {
    pool: DatabaseConnection,
    logistics: Arc<dyn LogisticsProvider>,
    shipper: ShipperConfig,
}

impl ShipmentService {
    pub fn new(
        pool: DatabaseConnection,
        logistics: Arc<dyn LogisticsProvider>,
        shipper: ShipperConfig,
    ) -> Self {
        Self {
            pool,
            logistics,
            shipper,
        }
    }

    /// 向物流商下单
    ///
    /// 只有已支付且还没有运单号的订单可以下单。调用物流商之前先用
    /// `shipment_requested_at` 抢占租约，同一订单同时只有一个下单请求；
    /// 物流商调用失败时释放租约，之后可以重试。
    pub async fn request_shipment(&self, order_id: i64) -> AppResult<orders::Model> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

        if let Some(tracking_id) = &order.tracking_id {
            return Err(AppError::Conflict(format!(
                "Order {} already has tracking id {tracking_id}",
                order.order_code
            )));
        }
        if order.payment_status != PaymentStatus::Success {
            return Err(AppError::Conflict(format!(
                "Order {} is not paid (payment status {})",
                order.order_code, order.payment_status
            )));
        }
        if !order
            .delivery_status
            .can_transition_to(DeliveryStatus::ReadyToShip)
        {
            return Err(AppError::Conflict(format!(
                "Order {} cannot be shipped from delivery status {}",
                order.order_code, order.delivery_status
            )));
        }

        self.claim_lease(&order).await?;

        let booking = match self.book(&order).await {
            Ok(booking) => booking,
            Err(e) => {
                self.release_lease(order.id).await;
                return Err(e);
            }
        };

        let result = orders::Entity::update_many()
            .col_expr(orders::Column::TrackingId, Expr::value(booking.tracking_id.clone()))
            .col_expr(
                orders::Column::WaybillNumber,
                Expr::value(booking.waybill_number.clone()),
            )
            .col_expr(
                orders::Column::DeliveryStatus,
                Expr::value(DeliveryStatus::ReadyToShip),
            )
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::TrackingId.is_null())
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Success))
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 0 {
            log::error!(
                "Shipment {} booked for order {} but the order was changed concurrently",
                booking.tracking_id,
                order.order_code
            );
            return Err(AppError::Conflict(format!(
                "Order {} was updated while booking the shipment",
                order.order_code
            )));
        }

        log::info!(
            "Shipment booked for order {}: tracking {}",
            order.order_code,
            booking.tracking_id
        );

        orders::Entity::find_by_id(order.id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))
    }

    async fn claim_lease(&self, order: &orders::Model) -> AppResult<()> {
        let now = Utc::now();
        let stale = now - Duration::seconds(SHIPMENT_LEASE_SECS);
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::ShipmentRequestedAt, Expr::value(Some(now)))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::TrackingId.is_null())
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Success))
            .filter(
                Condition::any()
                    .add(orders::Column::ShipmentRequestedAt.is_null())
                    .add(orders::Column::ShipmentRequestedAt.lt(stale)),
            )
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Shipment for order {} is already being booked",
                order.order_code
            )));
        }
        Ok(())
    }

    async fn release_lease(&self, order_id: i64) {
        let released = orders::Entity::update_many()
            .col_expr(
                orders::Column::ShipmentRequestedAt,
                Expr::value(Option::<chrono::DateTime<Utc>>::None),
            )
            .filter(orders::Column::Id.eq(order_id))
            .filter(orders::Column::TrackingId.is_null())
            .exec(&self.pool)
            .await;
        if let Err(e) = released {
            log::error!("Failed to release shipment lease for order {order_id}: {e}");
        }
    }

    async fn book(&self, order: &orders::Model) -> AppResult<ShipmentBooking> {
        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order.id))
            .order_by_asc(order_items::Column::Id)
            .all(&self.pool)
            .await?;

        let request = self.build_request(order, &items);
        self.logistics.create_shipment(&request).await
    }

    fn build_request(&self, order: &orders::Model, items: &[order_items::Model]) -> ShipmentRequest {
        ShipmentRequest {
            reference_id: order.order_code.clone(),
            origin: ShipmentContact {
                name: self.shipper.contact_name.clone(),
                phone: self.shipper.contact_phone.clone(),
                address: self.shipper.address.clone(),
                postal_code: Some(self.shipper.postal_code.clone()),
                area_id: self.shipper.area_id.clone(),
            },
            destination: ShipmentContact {
                name: order.recipient_name.clone(),
                phone: order.recipient_phone.clone(),
                address: order.recipient_address.clone(),
                postal_code: order.recipient_postal_code.clone(),
                area_id: order.recipient_area_id.clone(),
            },
            courier_company: order.courier_company.clone(),
            courier_service: order.courier_service.clone(),
            items: items
                .iter()
                .map(|i| ShipmentItem {
                    name: i.product_name.clone(),
                    value: i.unit_price,
                    quantity: i.quantity,
                    weight_grams: i.weight_grams,
                })
                .collect(),
        }
    }

    /// 补发之前下单失败的物流单，返回成功数量
    ///
    /// 持有未过期租约的订单正在下单，跳过。
    pub async fn retry_pending_shipments(&self) -> AppResult<usize> {
        let stale = Utc::now() - Duration::seconds(SHIPMENT_LEASE_SECS);
        let pending = orders::Entity::find()
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Success))
            .filter(orders::Column::TrackingId.is_null())
            .filter(
                Condition::any()
                    .add(orders::Column::ShipmentRequestedAt.is_null())
                    .add(orders::Column::ShipmentRequestedAt.lt(stale)),
            )
            .filter(orders::Column::DeliveryStatus.is_in([
                DeliveryStatus::Idle,
                DeliveryStatus::Packing,
                DeliveryStatus::Packed,
            ]))
            .order_by_asc(orders::Column::PaidAt)
            .limit(RETRY_BATCH_SIZE)
            .all(&self.pool)
            .await?;

        let mut booked = 0;
        for order in pending {
            match self.request_shipment(order.id).await {
                Ok(_) => booked += 1,
                Err(AppError::Conflict(msg)) => log::debug!("Shipment retry skipped: {msg}"),
                Err(e) => log::warn!(
                    "Shipment retry failed for order {}: {e}",
                    order.order_code
                ),
            }
        }
        Ok(booked)
    }

    pub async fn search_areas(&self, query: &str) -> AppResult<Vec<Area>> {
        let query = query.trim();
        if query.len() < 3 {
            return Err(AppError::ValidationError(
                "Area query must be at least 3 characters".to_string(),
            ));
        }
        self.logistics.search_areas(query).await
    }

    pub async fn get_rates(&self, query: &RateQuery) -> AppResult<Vec<CourierRate>> {
        if query.items.is_empty() {
            return Err(AppError::ValidationError("Rate query needs items".to_string()));
        }
        if query.destination_area_id.is_none() && query.destination_postal_code.is_none() {
            return Err(AppError::ValidationError(
                "Destination area or postal code is required".to_string(),
            ));
        }
        let mut query = query.clone();
        if query.origin_area_id.is_none() && query.origin_postal_code.is_none() {
            query.origin_area_id = self.shipper.area_id.clone();
            query.origin_postal_code = Some(self.shipper.postal_code.clone());
        }
        self.logistics.get_rates(&query).await
    }

    pub async fn tracking(&self, tracking_id: &str) -> AppResult<TrackingInfo> {
        self.logistics.get_tracking(tracking_id).await
    }
}
