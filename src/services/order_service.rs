use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entities::order_entity::{self as orders, DeliveryStatus, PaymentProvider, PaymentStatus};
use crate::entities::{order_item_entity as order_items, product_entity as products, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::external::{PaymentCustomer, biteship};
use crate::models::*;
use crate::services::affiliate_service::{mark_commissions_paid, resolve_referral};
use crate::services::cart_service::{clear_cart, load_cart};
use crate::services::{PaymentService, ShipmentService};
use crate::utils::{generate_order_code, normalize_phone, require_non_empty, validate_phone};

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
    payments: PaymentService,
    shipments: ShipmentService,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, payments: PaymentService, shipments: ShipmentService) -> Self {
        Self {
            pool,
            payments,
            shipments,
        }
    }

    /// 创建订单；此时不扣库存，付款成功后才扣
    pub async fn create_order(
        &self,
        user_id: i64,
        request: CreateOrderRequest,
    ) -> AppResult<(orders::Model, Vec<order_items::Model>)> {
        let txn = self.pool.begin().await?;
        let created = create_order_in(
            &txn,
            user_id,
            &request.items,
            request.provider,
            &request.shipping,
            request.shipping_cost,
        )
        .await?;
        txn.commit().await?;

        log::info!(
            "Order {} created for user {user_id}, total {}",
            created.0.order_code,
            created.0.total_amount
        );
        Ok(created)
    }

    /// 购物车结算：建单并清空购物车，然后向支付渠道申请支付链接
    pub async fn checkout(&self, user_id: i64, request: CheckoutRequest) -> AppResult<CheckoutResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        let txn = self.pool.begin().await?;
        let lines = load_cart(&txn, user_id).await?;
        if lines.is_empty() {
            return Err(AppError::ValidationError("Cart is empty".to_string()));
        }
        let items: Vec<NewOrderItem> = lines
            .iter()
            .map(|l| NewOrderItem {
                product_id: l.product_id,
                quantity: l.quantity,
                referral_code: l.referral_code.clone(),
            })
            .collect();

        let (order, order_items) = create_order_in(
            &txn,
            user_id,
            &items,
            request.provider,
            &request.shipping,
            request.shipping_cost,
        )
        .await?;
        clear_cart(&txn, user_id).await?;
        txn.commit().await?;

        log::info!(
            "Checkout created order {} for user {user_id}, total {}",
            order.order_code,
            order.total_amount
        );

        let customer = PaymentCustomer {
            name: user.name,
            email: user.email,
            phone: user.phone.or_else(|| Some(order.recipient_phone.clone())),
        };
        let order = match self.payments.start_payment(&order, &order_items, customer).await {
            Ok(order) => order,
            Err(e) => {
                log::warn!(
                    "Payment initiation failed for order {}, left pending: {e}",
                    order.order_code
                );
                return Err(e);
            }
        };

        Ok(CheckoutResponse {
            payment_url: order.payment_url.clone(),
            order: order.into(),
        })
    }

    pub async fn list_orders(
        &self,
        user_id: i64,
        params: PaginationParams,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        let paginator = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .paginate(&self.pool, params.page_size());

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(params.page_index()).await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(Into::into).collect(),
            params.page(),
            params.page_size(),
            total,
        ))
    }

    /// 订单详情，时间线合并本地状态和物流轨迹
    pub async fn order_detail(&self, user_id: i64, order_code: &str) -> AppResult<OrderDetailResponse> {
        let order = orders::Entity::find()
            .filter(orders::Column::OrderCode.eq(order_code))
            .filter(orders::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_code} not found")))?;

        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order.id))
            .order_by_asc(order_items::Column::Id)
            .all(&self.pool)
            .await?;

        let mut timeline = local_timeline(&order);
        if let Some(tracking_id) = &order.tracking_id {
            match self.shipments.tracking(tracking_id).await {
                Ok(info) => timeline.extend(info.history.into_iter().map(|e| TimelineEntry {
                    source: TimelineSource::Carrier,
                    status: e.status,
                    note: e.note,
                    timestamp: e.updated_at,
                })),
                Err(e) => log::warn!(
                    "Tracking lookup for order {} failed, showing local timeline only: {e}",
                    order.order_code
                ),
            }
        }

        Ok(OrderDetailResponse {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
            timeline,
        })
    }

    /// 管理员修改订单状态
    ///
    /// `ready_to_ship` 走物流下单；物流状态和支付状态各自按迁移表校验。
    pub async fn update_status(&self, order_id: i64, target: &str) -> AppResult<orders::Model> {
        let target = target.trim().to_ascii_lowercase();
        let order = self.find_order(order_id).await?;

        if target == "ready_to_ship" {
            return self.shipments.request_shipment(order_id).await;
        }

        if let Some(next) = DeliveryStatus::parse(&target) {
            if next != DeliveryStatus::Idle && order.payment_status != PaymentStatus::Success {
                return Err(AppError::Conflict(format!(
                    "Order {} is not paid (payment status {})",
                    order.order_code, order.payment_status
                )));
            }
            let txn = self.pool.begin().await?;
            let outcome = apply_delivery(&txn, &order, next, None).await?;
            txn.commit().await?;
            if let DeliveryOutcome::Rejected { current, requested } = outcome {
                return Err(AppError::Conflict(format!(
                    "Delivery status cannot move from {current} to {requested}"
                )));
            }
            log::info!("Admin set order {} delivery status to {next}", order.order_code);
            return self.find_order(order_id).await;
        }

        if let Some(next) = PaymentStatus::parse(&target) {
            let outcome = self
                .payments
                .reconcile(PaymentNotification {
                    provider: order.payment_provider,
                    order_code: order.order_code.clone(),
                    event_key: None,
                    provider_status: "manual".to_string(),
                    status: next,
                    provider_transaction_id: None,
                    payment_method: None,
                })
                .await?;
            if let ReconcileOutcome::Rejected { current, requested } = outcome {
                return Err(AppError::Conflict(format!(
                    "Payment status cannot move from {current} to {requested}"
                )));
            }
            return self.find_order(order_id).await;
        }

        Err(AppError::ValidationError(format!("Unknown order status: {target}")))
    }

    /// 取消未付款订单；渠道侧取消失败不影响本地取消
    pub async fn cancel_order(&self, user_id: i64, order_code: &str) -> AppResult<orders::Model> {
        let order = orders::Entity::find()
            .filter(orders::Column::OrderCode.eq(order_code))
            .filter(orders::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_code} not found")))?;

        if order.payment_status != PaymentStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Order {order_code} cannot be cancelled (payment status {})",
                order.payment_status
            )));
        }

        self.payments.cancel_upstream(&order).await;

        let result = orders::Entity::update_many()
            .col_expr(orders::Column::PaymentStatus, Expr::value(PaymentStatus::Cancelled))
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Pending))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Order {order_code} changed while cancelling"
            )));
        }

        log::info!("Order {order_code} cancelled by user {user_id}");
        self.find_order(order.id).await
    }

    /// 处理物流商推送
    pub async fn handle_carrier_update(&self, update: CarrierUpdate) -> AppResult<DeliveryOutcome> {
        let Some(next) = biteship::map_status(&update.status) else {
            log::info!("Carrier status {} ignored", update.status);
            return Ok(DeliveryOutcome::Ignored);
        };

        let txn = self.pool.begin().await?;
        let Some(mut order) = find_by_reference(&txn, &update).await? else {
            txn.commit().await?;
            log::warn!(
                "Carrier update for unknown order (reference {:?}, tracking {:?})",
                update.order_code,
                update.tracking_id
            );
            return Ok(DeliveryOutcome::OrderNotFound);
        };

        if next == DeliveryStatus::Delivered && order.payment_status == PaymentStatus::Pending {
            // 妥投视为已付款
            if self.payments.confirm_payment(&txn, &order, None, None).await? {
                log::info!("Order {} payment confirmed by delivery", order.order_code);
            }
            order = orders::Entity::find_by_id(order.id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order.order_code)))?;
        }

        let outcome = if order.payment_status != PaymentStatus::Success {
            DeliveryOutcome::Rejected {
                current: order.delivery_status,
                requested: next,
            }
        } else {
            apply_delivery(&txn, &order, next, update.waybill_number.as_deref()).await?
        };
        txn.commit().await?;

        match outcome {
            DeliveryOutcome::Applied { status } => {
                log::info!("Order {} delivery status -> {status}", order.order_code)
            }
            DeliveryOutcome::Rejected { current, requested } => log::warn!(
                "Order {} rejected carrier transition {current} -> {requested} (payment {})",
                order.order_code,
                order.payment_status
            ),
            _ => {}
        }
        Ok(outcome)
    }

    async fn find_order(&self, order_id: i64) -> AppResult<orders::Model> {
        orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))
    }
}

/// 商品小计加运费，溢出视为非法输入
fn order_total(lines: impl IntoIterator<Item = (i64, i32)>, shipping_cost: i64) -> AppResult<i64> {
    let overflow = || AppError::ValidationError("Order total is out of range".to_string());
    let items_total = lines.into_iter().try_fold(0i64, |acc, (price, qty)| {
        price
            .checked_mul(i64::from(qty))
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(overflow)
    })?;
    items_total.checked_add(shipping_cost).ok_or_else(overflow)
}

/// 在调用方事务内建单：校验商品、库存、推广码，快照价格
pub(crate) async fn create_order_in(
    txn: &DatabaseTransaction,
    user_id: i64,
    items: &[NewOrderItem],
    provider: PaymentProvider,
    shipping: &ShippingDetails,
    shipping_cost: i64,
) -> AppResult<(orders::Model, Vec<order_items::Model>)> {
    validate_order_input(items, shipping, shipping_cost)?;

    let mut requested: HashMap<i64, i32> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = products::Entity::find_by_id(item.product_id)
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", item.product_id)))?;

        let total_qty = requested.entry(product.id).or_default();
        *total_qty = total_qty.saturating_add(item.quantity);
        if *total_qty > product.stock {
            return Err(AppError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: *total_qty,
            });
        }

        let referral = resolve_referral(txn, item.referral_code.as_deref(), user_id).await?;
        lines.push((product, item.quantity, referral.map(|a| a.referral_code)));
    }

    let total_amount = order_total(
        lines.iter().map(|(p, qty, _)| (p.price, *qty)),
        shipping_cost,
    )?;
    let now = Utc::now();

    let order = orders::ActiveModel {
        order_code: Set(generate_order_code()),
        user_id: Set(user_id),
        total_amount: Set(total_amount),
        shipping_cost: Set(shipping_cost),
        payment_status: Set(PaymentStatus::Pending),
        delivery_status: Set(DeliveryStatus::Idle),
        payment_provider: Set(provider),
        provider_transaction_id: Set(None),
        payment_method: Set(None),
        payment_url: Set(None),
        tracking_id: Set(None),
        waybill_number: Set(None),
        recipient_name: Set(shipping.recipient_name.trim().to_string()),
        recipient_phone: Set(normalize_phone(&shipping.recipient_phone)),
        recipient_address: Set(shipping.recipient_address.trim().to_string()),
        recipient_city: Set(shipping.recipient_city.clone()),
        recipient_postal_code: Set(shipping.recipient_postal_code.clone()),
        recipient_area_id: Set(shipping.recipient_area_id.clone()),
        courier_company: Set(shipping.courier_company.trim().to_string()),
        courier_service: Set(shipping.courier_service.trim().to_string()),
        paid_at: Set(None),
        shipment_requested_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let mut saved = Vec::with_capacity(lines.len());
    for (product, quantity, referral_code) in lines {
        let item = order_items::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_name: Set(product.name),
            unit_price: Set(product.price),
            quantity: Set(quantity),
            weight_grams: Set(product.weight_grams),
            referral_code: Set(referral_code),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        saved.push(item);
    }

    Ok((order, saved))
}

fn validate_order_input(
    items: &[NewOrderItem],
    shipping: &ShippingDetails,
    shipping_cost: i64,
) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::ValidationError("Order must contain at least one item".to_string()));
    }
    if let Some(bad) = items.iter().find(|i| i.quantity < 1) {
        return Err(AppError::ValidationError(format!(
            "Quantity for product {} must be at least 1",
            bad.product_id
        )));
    }
    if shipping_cost < 0 {
        return Err(AppError::ValidationError("Shipping cost must not be negative".to_string()));
    }
    require_non_empty("recipient_name", &shipping.recipient_name)?;
    require_non_empty("recipient_address", &shipping.recipient_address)?;
    require_non_empty("courier_company", &shipping.courier_company)?;
    require_non_empty("courier_service", &shipping.courier_service)?;
    validate_phone(&normalize_phone(&shipping.recipient_phone))?;
    Ok(())
}

/// 物流状态迁移，条件更新保证并发下只生效一次
async fn apply_delivery<C: ConnectionTrait>(
    db: &C,
    order: &orders::Model,
    next: DeliveryStatus,
    waybill_number: Option<&str>,
) -> AppResult<DeliveryOutcome> {
    if order.delivery_status == next {
        return Ok(DeliveryOutcome::Unchanged);
    }
    if !order.delivery_status.can_transition_to(next) {
        return Ok(DeliveryOutcome::Rejected {
            current: order.delivery_status,
            requested: next,
        });
    }

    let mut update = orders::Entity::update_many()
        .col_expr(orders::Column::DeliveryStatus, Expr::value(next))
        .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()));
    if order.waybill_number.is_none()
        && let Some(waybill) = waybill_number
    {
        update = update.col_expr(orders::Column::WaybillNumber, Expr::value(waybill));
    }
    let result = update
        .filter(orders::Column::Id.eq(order.id))
        .filter(orders::Column::DeliveryStatus.eq(order.delivery_status))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Ok(DeliveryOutcome::Unchanged);
    }

    if next == DeliveryStatus::Delivered {
        let paid = mark_commissions_paid(db, order.id).await?;
        if paid > 0 {
            log::info!("Order {} delivered, {paid} commission(s) settled", order.order_code);
        }
    }
    Ok(DeliveryOutcome::Applied { status: next })
}

async fn find_by_reference<C: ConnectionTrait>(
    db: &C,
    update: &CarrierUpdate,
) -> AppResult<Option<orders::Model>> {
    if let Some(code) = update.order_code.as_deref().filter(|c| !c.is_empty()) {
        let order = orders::Entity::find()
            .filter(orders::Column::OrderCode.eq(code))
            .one(db)
            .await?;
        if order.is_some() {
            return Ok(order);
        }
    }
    if let Some(tracking_id) = update.tracking_id.as_deref().filter(|t| !t.is_empty()) {
        return Ok(orders::Entity::find()
            .filter(orders::Column::TrackingId.eq(tracking_id))
            .one(db)
            .await?);
    }
    Ok(None)
}

fn local_timeline(order: &orders::Model) -> Vec<TimelineEntry> {
    let mut timeline = vec![TimelineEntry {
        source: TimelineSource::Order,
        status: "created".to_string(),
        note: None,
        timestamp: Some(order.created_at.to_rfc3339()),
    }];
    if order.payment_status != PaymentStatus::Pending {
        timeline.push(TimelineEntry {
            source: TimelineSource::Order,
            status: format!("payment_{}", order.payment_status),
            note: order.payment_method.clone(),
            timestamp: Some(order.paid_at.unwrap_or(order.updated_at).to_rfc3339()),
        });
    }
    if order.delivery_status != DeliveryStatus::Idle {
        timeline.push(TimelineEntry {
            source: TimelineSource::Order,
            status: order.delivery_status.to_string(),
            note: order.waybill_number.clone(),
            timestamp: Some(order.updated_at.to_rfc3339()),
        });
    }
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            recipient_name: "Budi".to_string(),
            recipient_phone: "0812-3456-7890".to_string(),
            recipient_address: "Jl. Merdeka 1".to_string(),
            recipient_city: Some("Jakarta".to_string()),
            recipient_postal_code: Some("10110".to_string()),
            recipient_area_id: None,
            courier_company: "jne".to_string(),
            courier_service: "reg".to_string(),
        }
    }

    fn item(quantity: i32) -> NewOrderItem {
        NewOrderItem {
            product_id: 1,
            quantity,
            referral_code: None,
        }
    }

    #[test]
    fn test_validate_order_input() {
        assert!(validate_order_input(&[item(1)], &shipping(), 0).is_ok());
        assert!(validate_order_input(&[], &shipping(), 0).is_err());
        assert!(validate_order_input(&[item(0)], &shipping(), 0).is_err());
        assert!(validate_order_input(&[item(1)], &shipping(), -1).is_err());

        let mut missing = shipping();
        missing.courier_service = " ".to_string();
        assert!(validate_order_input(&[item(1)], &missing, 0).is_err());
    }

    #[test]
    fn test_order_total_overflow() {
        assert_eq!(order_total([(28_000, 2), (47_000, 1)], 15_000).unwrap(), 118_000);
        assert!(matches!(
            order_total([(i64::MAX / 2, 3)], 0),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            order_total([(i64::MAX - 10, 1)], 11),
            Err(AppError::ValidationError(_))
        ));
    }
}
