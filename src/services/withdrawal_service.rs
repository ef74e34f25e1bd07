use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::withdraw_request_entity::{self as withdraw_requests, WithdrawStatus};
use crate::entities::affiliate_entity as affiliates;
use crate::error::{AppError, AppResult};
use crate::external::{ObjectStorage, UploadFile};
use crate::models::*;
use crate::services::ledger;

const PROOF_FOLDER: &str = "withdraw-proofs";

#[derive(Clone)]
pub struct WithdrawalService {
    pool: DatabaseConnection,
    storage: Arc<dyn ObjectStorage>,
    min_withdrawal_amount: i64,
}

impl WithdrawalService {
    pub fn new(
        pool: DatabaseConnection,
        storage: Arc<dyn ObjectStorage>,
        min_withdrawal_amount: i64,
    ) -> Self {
        Self {
            pool,
            storage,
            min_withdrawal_amount,
        }
    }

    /// 申请提现：扣余额和创建申请在同一个事务里
    pub async fn request_withdrawal(
        &self,
        user_id: i64,
        amount: i64,
    ) -> AppResult<WithdrawRequestResponse> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Withdrawal amount must be positive".to_string(),
            ));
        }
        if amount < self.min_withdrawal_amount {
            return Err(AppError::ValidationError(format!(
                "Minimum withdrawal amount is {}",
                self.min_withdrawal_amount
            )));
        }

        let affiliate = affiliates::Entity::find()
            .filter(affiliates::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Affiliate profile not found".to_string()))?;

        let txn = self.pool.begin().await?;
        ledger::debit(&txn, affiliate.id, amount).await?;

        let now = Utc::now();
        let request = withdraw_requests::ActiveModel {
            affiliate_id: Set(affiliate.id),
            amount: Set(amount),
            status: Set(WithdrawStatus::Pending),
            proof_image_url: Set(None),
            proof_image_key: Set(None),
            rejection_reason: Set(None),
            processed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        log::info!(
            "Affiliate {} requested withdrawal {} of {amount}",
            affiliate.id,
            request.id
        );
        Ok(request.into())
    }

    /// 审核通过：先上传转账凭证，再做条件更新
    pub async fn approve_withdrawal(
        &self,
        request_id: i64,
        proof: UploadFile,
    ) -> AppResult<WithdrawRequestResponse> {
        let request = self.find_request(request_id).await?;
        if request.status != WithdrawStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Withdrawal {request_id} is already {}",
                request.status
            )));
        }

        let stored = self.storage.upload(&proof, PROOF_FOLDER).await?;

        let now = Utc::now();
        let result = withdraw_requests::Entity::update_many()
            .col_expr(withdraw_requests::Column::Status, Expr::value(WithdrawStatus::Approved))
            .col_expr(withdraw_requests::Column::ProofImageUrl, Expr::value(Some(stored.url.clone())))
            .col_expr(withdraw_requests::Column::ProofImageKey, Expr::value(Some(stored.key.clone())))
            .col_expr(withdraw_requests::Column::ProcessedAt, Expr::value(Some(now)))
            .col_expr(withdraw_requests::Column::UpdatedAt, Expr::value(now))
            .filter(withdraw_requests::Column::Id.eq(request_id))
            .filter(withdraw_requests::Column::Status.eq(WithdrawStatus::Pending))
            .exec(&self.pool)
            .await;

        let rows = match result {
            Ok(r) => r.rows_affected,
            Err(e) => {
                self.discard_upload(&stored.key).await;
                return Err(e.into());
            }
        };
        if rows == 0 {
            self.discard_upload(&stored.key).await;
            return Err(AppError::Conflict(format!(
                "Withdrawal {request_id} was processed concurrently"
            )));
        }

        log::info!("Withdrawal {request_id} approved ({})", request.amount);
        self.find_request(request_id).await.map(Into::into)
    }

    /// 审核拒绝：退回余额
    pub async fn reject_withdrawal(
        &self,
        request_id: i64,
        reason: Option<String>,
    ) -> AppResult<WithdrawRequestResponse> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let txn = self.pool.begin().await?;
        let request = withdraw_requests::Entity::find_by_id(request_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Withdrawal {request_id} not found")))?;

        let now = Utc::now();
        let result = withdraw_requests::Entity::update_many()
            .col_expr(withdraw_requests::Column::Status, Expr::value(WithdrawStatus::Rejected))
            .col_expr(withdraw_requests::Column::RejectionReason, Expr::value(reason))
            .col_expr(withdraw_requests::Column::ProcessedAt, Expr::value(Some(now)))
            .col_expr(withdraw_requests::Column::UpdatedAt, Expr::value(now))
            .filter(withdraw_requests::Column::Id.eq(request_id))
            .filter(withdraw_requests::Column::Status.eq(WithdrawStatus::Pending))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Withdrawal {request_id} is no longer pending"
            )));
        }

        ledger::credit(&txn, request.affiliate_id, request.amount).await?;

        let rejected = withdraw_requests::Entity::find_by_id(request_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Withdrawal {request_id} not found")))?;
        txn.commit().await?;

        log::info!(
            "Withdrawal {request_id} rejected, {} returned to affiliate {}",
            request.amount,
            request.affiliate_id
        );
        Ok(rejected.into())
    }

    pub async fn list_withdrawals(
        &self,
        user_id: i64,
        params: PaginationParams,
    ) -> AppResult<PaginatedResponse<WithdrawRequestResponse>> {
        let affiliate = affiliates::Entity::find()
            .filter(affiliates::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Affiliate profile not found".to_string()))?;

        let paginator = withdraw_requests::Entity::find()
            .filter(withdraw_requests::Column::AffiliateId.eq(affiliate.id))
            .order_by_desc(withdraw_requests::Column::CreatedAt)
            .order_by_desc(withdraw_requests::Column::Id)
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

    /// 管理后台：按状态筛选所有提现申请
    pub async fn list_all_withdrawals(
        &self,
        status: Option<WithdrawStatus>,
        params: PaginationParams,
    ) -> AppResult<PaginatedResponse<WithdrawRequestResponse>> {
        let mut query = withdraw_requests::Entity::find();
        if let Some(status) = status {
            query = query.filter(withdraw_requests::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_asc(withdraw_requests::Column::CreatedAt)
            .order_by_asc(withdraw_requests::Column::Id)
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

    async fn find_request(&self, request_id: i64) -> AppResult<withdraw_requests::Model> {
        withdraw_requests::Entity::find_by_id(request_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Withdrawal {request_id} not found")))
    }

    async fn discard_upload(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            log::warn!("Failed to delete withdrawal proof {key}: {e}");
        }
    }
}
