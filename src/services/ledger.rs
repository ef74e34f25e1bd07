//! 推广人佣金余额的原子增减
//!
//! `total_commission` 只允许通过这里修改。两个函数都接受任意连接，
//! 调用方负责把它们放进同一个事务里和其它写操作一起提交。

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entities::affiliate_entity as affiliates;
use crate::error::{AppError, AppResult};

pub async fn credit<C: ConnectionTrait>(db: &C, affiliate_id: i64, amount: i64) -> AppResult<()> {
    if amount < 0 {
        return Err(AppError::ValidationError(format!(
            "credit amount must not be negative: {amount}"
        )));
    }
    if amount == 0 {
        return Ok(());
    }

    let result = affiliates::Entity::update_many()
        .col_expr(
            affiliates::Column::TotalCommission,
            Expr::col(affiliates::Column::TotalCommission).add(amount),
        )
        .col_expr(affiliates::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(affiliates::Column::Id.eq(affiliate_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Affiliate {affiliate_id} not found")));
    }
    Ok(())
}

/// 余额不足时不做任何修改
pub async fn debit<C: ConnectionTrait>(db: &C, affiliate_id: i64, amount: i64) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::ValidationError(format!(
            "debit amount must be positive: {amount}"
        )));
    }

    let result = affiliates::Entity::update_many()
        .col_expr(
            affiliates::Column::TotalCommission,
            Expr::col(affiliates::Column::TotalCommission).sub(amount),
        )
        .col_expr(affiliates::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(affiliates::Column::Id.eq(affiliate_id))
        .filter(affiliates::Column::TotalCommission.gte(amount))
        .exec(db)
        .await?;

    if result.rows_affected == 1 {
        return Ok(());
    }

    match affiliates::Entity::find_by_id(affiliate_id).one(db).await? {
        Some(affiliate) => Err(AppError::InsufficientBalance {
            available: affiliate.total_commission,
            requested: amount,
        }),
        None => Err(AppError::NotFound(format!("Affiliate {affiliate_id} not found"))),
    }
}

pub async fn balance<C: ConnectionTrait>(db: &C, affiliate_id: i64) -> AppResult<i64> {
    affiliates::Entity::find_by_id(affiliate_id)
        .one(db)
        .await?
        .map(|a| a.total_commission)
        .ok_or_else(|| AppError::NotFound(format!("Affiliate {affiliate_id} not found")))
}
