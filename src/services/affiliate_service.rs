use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entities::affiliate_application_entity::{self as applications, ApplicationStatus};
use crate::entities::commission_entity::{self as commissions, CommissionStatus};
use crate::entities::user_entity::{self as users, UserRole};
use crate::entities::withdraw_request_entity::{self as withdraw_requests, WithdrawStatus};
use crate::entities::affiliate_entity as affiliates;
use crate::error::{AppError, AppResult};
use crate::external::{ObjectStorage, StoredObject, UploadFile};
use crate::models::*;
use crate::utils::{generate_unique_referral_code, require_non_empty};

const BANK_BOOK_FOLDER: &str = "bank-books";

/// 解析购物车/订单行上的推广码
///
/// 空字符串视为没有推广码；不存在的推广码和自己的推广码都返回 `InvalidReferral`。
pub async fn resolve_referral<C: ConnectionTrait>(
    db: &C,
    code: Option<&str>,
    shopper_id: i64,
) -> AppResult<Option<affiliates::Model>> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let code = code.to_ascii_uppercase();

    let affiliate = affiliates::Entity::find()
        .filter(affiliates::Column::ReferralCode.eq(code.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::InvalidReferral(format!("Referral code {code} does not exist")))?;

    if affiliate.user_id == shopper_id {
        return Err(AppError::InvalidReferral(
            "You cannot use your own referral code".to_string(),
        ));
    }
    Ok(Some(affiliate))
}

/// 订单妥投后把该订单的佣金标记为已结算，返回更新条数
pub async fn mark_commissions_paid<C: ConnectionTrait>(db: &C, order_id: i64) -> AppResult<u64> {
    let result = commissions::Entity::update_many()
        .col_expr(commissions::Column::Status, Expr::value(CommissionStatus::Paid))
        .col_expr(commissions::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(commissions::Column::OrderId.eq(order_id))
        .filter(commissions::Column::Status.eq(CommissionStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[derive(Clone)]
pub struct AffiliateService {
    pool: DatabaseConnection,
    storage: Arc<dyn ObjectStorage>,
}

impl AffiliateService {
    pub fn new(pool: DatabaseConnection, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { pool, storage }
    }

    /// 申请成为推广人
    pub async fn apply(
        &self,
        user_id: i64,
        request: ApplyAffiliateRequest,
        bank_book_image: UploadFile,
    ) -> AppResult<AffiliateApplicationResponse> {
        require_non_empty("bank_type", &request.bank_type)?;
        require_non_empty("account_name", &request.account_name)?;
        require_non_empty("account_number", &request.account_number)?;
        let account_number = request.account_number.trim().to_string();

        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        if !user.has_complete_profile() {
            return Err(AppError::ValidationError(
                "Phone and address must be filled in before applying".to_string(),
            ));
        }

        let is_affiliate = user.role == UserRole::Affiliate
            || affiliates::Entity::find()
                .filter(affiliates::Column::UserId.eq(user_id))
                .count(&self.pool)
                .await?
                > 0;
        if is_affiliate {
            return Err(AppError::Conflict("User is already an affiliate".to_string()));
        }

        let pending = applications::Entity::find()
            .filter(applications::Column::UserId.eq(user_id))
            .filter(applications::Column::Status.eq(ApplicationStatus::Pending))
            .count(&self.pool)
            .await?;
        if user.role == UserRole::PendingAffiliate || pending > 0 {
            return Err(AppError::Conflict(
                "An affiliate application is already pending".to_string(),
            ));
        }

        self.ensure_account_unused(&self.pool, &account_number).await?;

        let stored = self.storage.upload(&bank_book_image, BANK_BOOK_FOLDER).await?;

        match self
            .insert_application(&user, &request, &account_number, &stored)
            .await
        {
            Ok(application) => {
                log::info!("User {user_id} applied for affiliate (application {})", application.id);
                Ok(application.into())
            }
            Err(e) => {
                self.discard_upload(&stored.key).await;
                Err(e)
            }
        }
    }

    async fn insert_application(
        &self,
        user: &users::Model,
        request: &ApplyAffiliateRequest,
        account_number: &str,
        stored: &StoredObject,
    ) -> AppResult<applications::Model> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let application = applications::ActiveModel {
            user_id: Set(user.id),
            status: Set(ApplicationStatus::Pending),
            previous_role: Set(user.role),
            bank_type: Set(request.bank_type.trim().to_string()),
            account_name: Set(request.account_name.trim().to_string()),
            account_number: Set(account_number.to_string()),
            bank_book_image_url: Set(stored.url.clone()),
            bank_book_image_key: Set(stored.key.clone()),
            reviewed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let result = users::Entity::update_many()
            .col_expr(users::Column::Role, Expr::value(UserRole::PendingAffiliate))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user.id))
            .filter(users::Column::Role.eq(user.role))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "User role changed while applying".to_string(),
            ));
        }

        txn.commit().await?;
        Ok(application)
    }

    async fn ensure_account_unused<C: ConnectionTrait>(
        &self,
        db: &C,
        account_number: &str,
    ) -> AppResult<()> {
        let used_by_affiliate = affiliates::Entity::find()
            .filter(affiliates::Column::AccountNumber.eq(account_number))
            .count(db)
            .await?;
        let used_by_application = applications::Entity::find()
            .filter(applications::Column::AccountNumber.eq(account_number))
            .filter(applications::Column::Status.eq(ApplicationStatus::Pending))
            .count(db)
            .await?;
        if used_by_affiliate + used_by_application > 0 {
            return Err(AppError::Conflict(
                "Bank account number is already registered".to_string(),
            ));
        }
        Ok(())
    }

    async fn discard_upload(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            log::warn!("Failed to delete uploaded object {key}: {e}");
        }
    }

    /// 审核通过：创建推广人并分配推广码
    pub async fn approve_application(&self, application_id: i64) -> AppResult<AffiliateResponse> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let application = applications::Entity::find_by_id(application_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;

        let result = applications::Entity::update_many()
            .col_expr(applications::Column::Status, Expr::value(ApplicationStatus::Approved))
            .col_expr(applications::Column::ReviewedAt, Expr::value(Some(now)))
            .col_expr(applications::Column::UpdatedAt, Expr::value(now))
            .filter(applications::Column::Id.eq(application_id))
            .filter(applications::Column::Status.eq(ApplicationStatus::Pending))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Application {application_id} is not pending"
            )));
        }

        let existing = affiliates::Entity::find()
            .filter(affiliates::Column::UserId.eq(application.user_id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(AppError::Conflict("User is already an affiliate".to_string()));
        }
        let duplicate_account = affiliates::Entity::find()
            .filter(affiliates::Column::AccountNumber.eq(application.account_number.as_str()))
            .count(&txn)
            .await?;
        if duplicate_account > 0 {
            return Err(AppError::Conflict(
                "Bank account number is already registered".to_string(),
            ));
        }

        let referral_code = generate_unique_referral_code(&txn).await?;
        let affiliate = affiliates::ActiveModel {
            user_id: Set(application.user_id),
            referral_code: Set(referral_code),
            bank_type: Set(application.bank_type.clone()),
            account_name: Set(application.account_name.clone()),
            account_number: Set(application.account_number.clone()),
            bank_book_image_url: Set(Some(application.bank_book_image_url.clone())),
            bank_book_image_key: Set(Some(application.bank_book_image_key.clone())),
            total_commission: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        users::Entity::update_many()
            .col_expr(users::Column::Role, Expr::value(UserRole::Affiliate))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(application.user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        log::info!(
            "Application {application_id} approved, user {} is affiliate {} ({})",
            application.user_id,
            affiliate.id,
            affiliate.referral_code
        );
        Ok(affiliate.into())
    }

    /// 审核拒绝：恢复原角色，提交后删除银行卡照片
    pub async fn reject_application(
        &self,
        application_id: i64,
    ) -> AppResult<AffiliateApplicationResponse> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let application = applications::Entity::find_by_id(application_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;

        let result = applications::Entity::update_many()
            .col_expr(applications::Column::Status, Expr::value(ApplicationStatus::Rejected))
            .col_expr(applications::Column::ReviewedAt, Expr::value(Some(now)))
            .col_expr(applications::Column::UpdatedAt, Expr::value(now))
            .filter(applications::Column::Id.eq(application_id))
            .filter(applications::Column::Status.eq(ApplicationStatus::Pending))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Application {application_id} is not pending"
            )));
        }

        users::Entity::update_many()
            .col_expr(users::Column::Role, Expr::value(application.previous_role))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(application.user_id))
            .filter(users::Column::Role.eq(UserRole::PendingAffiliate))
            .exec(&txn)
            .await?;

        let rejected = applications::Entity::find_by_id(application_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;

        txn.commit().await?;

        self.discard_upload(&application.bank_book_image_key).await;
        log::info!(
            "Application {application_id} rejected, user {} restored to {}",
            application.user_id,
            application.previous_role
        );
        Ok(rejected.into())
    }

    pub async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        params: PaginationParams,
    ) -> AppResult<PaginatedResponse<AffiliateApplicationResponse>> {
        let mut query = applications::Entity::find();
        if let Some(status) = status {
            query = query.filter(applications::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(applications::Column::CreatedAt)
            .order_by_desc(applications::Column::Id)
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

    pub async fn get_affiliate(&self, user_id: i64) -> AppResult<affiliates::Model> {
        affiliates::Entity::find()
            .filter(affiliates::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Affiliate profile not found".to_string()))
    }

    pub async fn list_commissions(
        &self,
        user_id: i64,
        params: PaginationParams,
    ) -> AppResult<PaginatedResponse<CommissionResponse>> {
        let affiliate = self.get_affiliate(user_id).await?;

        let paginator = commissions::Entity::find()
            .filter(commissions::Column::AffiliateId.eq(affiliate.id))
            .order_by_desc(commissions::Column::CreatedAt)
            .order_by_desc(commissions::Column::Id)
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

    pub async fn affiliate_summary(&self, user_id: i64) -> AppResult<AffiliateSummary> {
        let affiliate = self.get_affiliate(user_id).await?;

        let earned = commissions::Entity::find()
            .filter(commissions::Column::AffiliateId.eq(affiliate.id))
            .filter(commissions::Column::Status.ne(CommissionStatus::Cancelled))
            .all(&self.pool)
            .await?;
        let withdrawals = withdraw_requests::Entity::find()
            .filter(withdraw_requests::Column::AffiliateId.eq(affiliate.id))
            .filter(withdraw_requests::Column::Status.ne(WithdrawStatus::Rejected))
            .all(&self.pool)
            .await?;

        let sum_withdrawn = |status: WithdrawStatus| -> i64 {
            withdrawals
                .iter()
                .filter(|w| w.status == status)
                .map(|w| w.amount)
                .sum()
        };

        Ok(AffiliateSummary {
            referral_code: affiliate.referral_code,
            balance: affiliate.total_commission,
            lifetime_commission: earned.iter().map(|c| c.commission_amount).sum(),
            pending_withdrawal: sum_withdrawn(WithdrawStatus::Pending),
            total_withdrawn: sum_withdrawn(WithdrawStatus::Approved),
            commission_count: earned.len() as u64,
        })
    }
}
