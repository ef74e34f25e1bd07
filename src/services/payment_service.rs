use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entities::commission_entity::{self as commissions, CommissionStatus, compute_commission};
use crate::entities::order_entity::{self as orders, PaymentStatus};
use crate::entities::{
    affiliate_entity as affiliates, order_item_entity as order_items,
    payment_event_entity as payment_events, product_entity as products,
};
use crate::error::{AppError, AppResult};
use crate::external::{PaymentCustomer, PaymentGateways, PaymentLineItem, PaymentRequest};
use crate::models::{PaymentNotification, ReconcileOutcome};
use crate::services::ShipmentService;
use crate::services::ledger;

#[derive(Clone)]
pub struct PaymentService {
    pool: DatabaseConnection,
    gateways: PaymentGateways,
    shipments: ShipmentService,
    commission_rate_bps: u32,
}

impl PaymentService {
    pub fn new(
        pool: DatabaseConnection,
        gateways: PaymentGateways,
        shipments: ShipmentService,
        commission_rate_bps: u32,
    ) -> Self {
        Self {
            pool,
            gateways,
            shipments,
            commission_rate_bps,
        }
    }

    /// 处理一次支付状态变化（webhook 或主动查询）
    ///
    /// 事件去重、状态迁移、库存扣减、佣金入账在同一个事务里提交；
    /// 物流下单在提交之后尝试，失败由后台任务重试。
    pub async fn reconcile(&self, notification: PaymentNotification) -> AppResult<ReconcileOutcome> {
        let (outcome, order_id) = self.apply_notification(&notification).await?;

        match outcome {
            ReconcileOutcome::Applied { status } => log::info!(
                "Order {} payment status -> {status} ({} {})",
                notification.order_code,
                notification.provider,
                notification.provider_status
            ),
            ReconcileOutcome::Duplicate => log::info!(
                "Duplicate {} notification for order {} ignored",
                notification.provider,
                notification.order_code
            ),
            ReconcileOutcome::OrderNotFound => log::warn!(
                "{} notification for unknown order {}",
                notification.provider,
                notification.order_code
            ),
            ReconcileOutcome::Rejected { current, requested } => log::warn!(
                "Order {} rejected payment transition {current} -> {requested}",
                notification.order_code
            ),
            ReconcileOutcome::Unchanged => {}
        }

        if let (ReconcileOutcome::Applied { status: PaymentStatus::Success }, Some(id)) =
            (outcome, order_id)
        {
            self.book_shipment(id).await;
        }

        Ok(outcome)
    }

    async fn apply_notification(
        &self,
        n: &PaymentNotification,
    ) -> AppResult<(ReconcileOutcome, Option<i64>)> {
        let txn = self.pool.begin().await?;

        if let Some(event_key) = &n.event_key
            && !record_event(&txn, n, event_key).await?
        {
            txn.rollback().await?;
            return Ok((ReconcileOutcome::Duplicate, None));
        }

        let Some(order) = orders::Entity::find()
            .filter(orders::Column::OrderCode.eq(n.order_code.as_str()))
            .one(&txn)
            .await?
        else {
            txn.commit().await?;
            return Ok((ReconcileOutcome::OrderNotFound, None));
        };

        if order.payment_status == n.status {
            txn.commit().await?;
            return Ok((ReconcileOutcome::Unchanged, Some(order.id)));
        }
        if !order.payment_status.can_transition_to(n.status) {
            txn.commit().await?;
            return Ok((
                ReconcileOutcome::Rejected {
                    current: order.payment_status,
                    requested: n.status,
                },
                Some(order.id),
            ));
        }

        let applied = match n.status {
            PaymentStatus::Success => {
                self.confirm_payment(
                    &txn,
                    &order,
                    n.provider_transaction_id.as_deref(),
                    n.payment_method.as_deref(),
                )
                .await?
            }
            next => close_payment(&txn, &order, next, n.payment_method.as_deref()).await?,
        };

        txn.commit().await?;

        if applied {
            Ok((ReconcileOutcome::Applied { status: n.status }, Some(order.id)))
        } else {
            // 另一个请求已经抢先完成了迁移
            Ok((ReconcileOutcome::Unchanged, Some(order.id)))
        }
    }

    /// pending -> success，以及随之而来的库存扣减和佣金入账
    ///
    /// 返回 false 表示订单已不是 pending，副作用没有执行。
    pub(crate) async fn confirm_payment(
        &self,
        txn: &DatabaseTransaction,
        order: &orders::Model,
        provider_transaction_id: Option<&str>,
        payment_method: Option<&str>,
    ) -> AppResult<bool> {
        let now = Utc::now();
        let mut update = orders::Entity::update_many()
            .col_expr(orders::Column::PaymentStatus, Expr::value(PaymentStatus::Success))
            .col_expr(orders::Column::PaidAt, Expr::value(Some(now)))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now));
        if let Some(id) = provider_transaction_id {
            update = update.col_expr(orders::Column::ProviderTransactionId, Expr::value(id));
        }
        if let Some(method) = payment_method {
            update = update.col_expr(orders::Column::PaymentMethod, Expr::value(method));
        }
        let result = update
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Pending))
            .exec(txn)
            .await?;
        if result.rows_affected == 0 {
            return Ok(false);
        }

        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order.id))
            .order_by_asc(order_items::Column::Id)
            .all(txn)
            .await?;

        for item in &items {
            decrement_stock(txn, &order.order_code, item).await?;
        }

        self.accrue_commissions(txn, order, &items).await?;
        Ok(true)
    }

    async fn accrue_commissions(
        &self,
        txn: &DatabaseTransaction,
        order: &orders::Model,
        items: &[order_items::Model],
    ) -> AppResult<()> {
        let mut by_code: BTreeMap<&str, i64> = BTreeMap::new();
        for item in items {
            if let Some(code) = item.referral_code.as_deref() {
                *by_code.entry(code).or_default() += item.subtotal();
            }
        }

        for (code, purchase_value) in by_code {
            let Some(affiliate) = affiliates::Entity::find()
                .filter(affiliates::Column::ReferralCode.eq(code))
                .one(txn)
                .await?
            else {
                log::warn!(
                    "Order {} references unknown referral code {code}",
                    order.order_code
                );
                continue;
            };
            if affiliate.user_id == order.user_id {
                log::warn!("Order {} carries a self-referral, skipped", order.order_code);
                continue;
            }

            let amount = compute_commission(purchase_value, self.commission_rate_bps);
            if amount <= 0 {
                continue;
            }

            let now = Utc::now();
            commissions::ActiveModel {
                affiliate_id: Set(affiliate.id),
                order_id: Set(order.id),
                order_code: Set(order.order_code.clone()),
                purchase_value: Set(purchase_value),
                commission_amount: Set(amount),
                status: Set(CommissionStatus::Pending),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            ledger::credit(txn, affiliate.id, amount).await?;
            log::info!(
                "Commission {amount} accrued to affiliate {} for order {}",
                affiliate.id,
                order.order_code
            );
        }
        Ok(())
    }

    async fn book_shipment(&self, order_id: i64) {
        if let Err(e) = self.shipments.request_shipment(order_id).await {
            log::warn!("Shipment booking for order {order_id} failed, will retry: {e}");
        }
    }

    /// 向支付渠道创建支付，并把支付链接写回订单
    pub async fn start_payment(
        &self,
        order: &orders::Model,
        items: &[order_items::Model],
        customer: PaymentCustomer,
    ) -> AppResult<orders::Model> {
        let gateway = self.gateways.get(order.payment_provider);

        let mut lines: Vec<PaymentLineItem> = items
            .iter()
            .map(|i| PaymentLineItem {
                id: i.product_id.to_string(),
                name: i.product_name.clone(),
                price: i.unit_price,
                quantity: i.quantity,
            })
            .collect();
        if order.shipping_cost > 0 {
            lines.push(PaymentLineItem {
                id: "SHIPPING".to_string(),
                name: format!("Shipping {} {}", order.courier_company, order.courier_service),
                price: order.shipping_cost,
                quantity: 1,
            });
        }

        let request = PaymentRequest {
            order_code: order.order_code.clone(),
            amount: order.total_amount,
            items: lines,
            customer,
        };
        let intent = gateway.create_payment(&request).await?;

        orders::Entity::update_many()
            .col_expr(orders::Column::PaymentUrl, Expr::value(intent.payment_url.clone()))
            .col_expr(
                orders::Column::ProviderTransactionId,
                Expr::value(intent.provider_transaction_id.clone()),
            )
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Pending))
            .exec(&self.pool)
            .await?;

        orders::Entity::find_by_id(order.id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order.order_code)))
    }

    /// 主动向支付渠道查询状态，走与 webhook 相同的处理流程
    pub async fn sync_payment_status(
        &self,
        user_id: i64,
        order_code: &str,
    ) -> AppResult<(ReconcileOutcome, orders::Model)> {
        let order = orders::Entity::find()
            .filter(orders::Column::OrderCode.eq(order_code))
            .filter(orders::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_code} not found")))?;

        let gateway = self.gateways.get(order.payment_provider);
        let status = gateway
            .get_status(&order.order_code, order.provider_transaction_id.as_deref())
            .await?;

        let outcome = self
            .reconcile(PaymentNotification {
                provider: order.payment_provider,
                order_code: order.order_code.clone(),
                event_key: None,
                provider_status: status.raw_status,
                status: status.status,
                provider_transaction_id: status.provider_transaction_id,
                payment_method: status.payment_method,
            })
            .await?;

        let order = orders::Entity::find_by_id(order.id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_code} not found")))?;
        Ok((outcome, order))
    }

    /// 渠道侧取消失败不阻止本地取消
    pub async fn cancel_upstream(&self, order: &orders::Model) {
        let gateway = self.gateways.get(order.payment_provider);
        if let Err(e) = gateway
            .cancel(&order.order_code, order.provider_transaction_id.as_deref())
            .await
        {
            log::warn!(
                "Failed to cancel order {} at {}: {e}",
                order.order_code,
                order.payment_provider
            );
        }
    }
}

/// 记录事件，已存在时返回 false
async fn record_event(
    txn: &DatabaseTransaction,
    n: &PaymentNotification,
    event_key: &str,
) -> AppResult<bool> {
    let event = payment_events::ActiveModel {
        provider: Set(n.provider),
        event_key: Set(event_key.to_string()),
        order_code: Set(n.order_code.clone()),
        provider_status: Set(n.provider_status.clone()),
        received_at: Set(Utc::now()),
        ..Default::default()
    };

    let inserted = payment_events::Entity::insert(event)
        .on_conflict(
            OnConflict::columns([
                payment_events::Column::Provider,
                payment_events::Column::EventKey,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(txn)
        .await;

    match inserted {
        Ok(0) | Err(DbErr::RecordNotInserted) => Ok(false),
        Ok(_) => Ok(true),
        Err(e) => Err(e.into()),
    }
}

/// pending -> failed / expired / cancelled
async fn close_payment(
    txn: &DatabaseTransaction,
    order: &orders::Model,
    next: PaymentStatus,
    payment_method: Option<&str>,
) -> AppResult<bool> {
    let mut update = orders::Entity::update_many()
        .col_expr(orders::Column::PaymentStatus, Expr::value(next))
        .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()));
    if let Some(method) = payment_method {
        update = update.col_expr(orders::Column::PaymentMethod, Expr::value(method));
    }
    let result = update
        .filter(orders::Column::Id.eq(order.id))
        .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Pending))
        .exec(txn)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn decrement_stock(
    txn: &DatabaseTransaction,
    order_code: &str,
    item: &order_items::Model,
) -> AppResult<()> {
    let result = products::Entity::update_many()
        .col_expr(
            products::Column::Stock,
            Expr::col(products::Column::Stock).sub(item.quantity),
        )
        .col_expr(products::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(products::Column::Id.eq(item.product_id))
        .filter(products::Column::Stock.gte(item.quantity))
        .exec(txn)
        .await?;
    if result.rows_affected == 1 {
        return Ok(());
    }

    // 付款已成立，库存不够时清零并告警
    let clamped = products::Entity::update_many()
        .col_expr(products::Column::Stock, Expr::value(0))
        .col_expr(products::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(products::Column::Id.eq(item.product_id))
        .exec(txn)
        .await?;
    if clamped.rows_affected == 0 {
        log::warn!(
            "Order {order_code}: product {} no longer exists, stock not adjusted",
            item.product_id
        );
    } else {
        log::warn!(
            "Order {order_code}: product {} oversold by payment, stock clamped to 0",
            item.product_id
        );
    }
    Ok(())
}
