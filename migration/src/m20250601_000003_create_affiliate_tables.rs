use sea_orm_migration::prelude::*;

use crate::m20250601_000001_create_users_and_catalog::Users;
use crate::m20250601_000002_create_order_tables::Orders;

#[derive(DeriveIden)]
enum Affiliates {
    Table,
    Id,
    UserId,
    ReferralCode,
    BankType,
    AccountName,
    AccountNumber,
    BankBookImageUrl,
    BankBookImageKey,
    TotalCommission,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AffiliateApplications {
    Table,
    Id,
    UserId,
    Status,
    PreviousRole,
    BankType,
    AccountName,
    AccountNumber,
    BankBookImageUrl,
    BankBookImageKey,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Commissions {
    Table,
    Id,
    AffiliateId,
    OrderId,
    OrderCode,
    PurchaseValue,
    CommissionAmount,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WithdrawRequests {
    Table,
    Id,
    AffiliateId,
    Amount,
    Status,
    ProofImageUrl,
    ProofImageKey,
    RejectionReason,
    ProcessedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Affiliates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Affiliates::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::UserId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::ReferralCode)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Affiliates::BankType).string_len(64).not_null())
                    .col(ColumnDef::new(Affiliates::AccountName).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Affiliates::AccountNumber)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Affiliates::BankBookImageUrl).text().null())
                    .col(
                        ColumnDef::new(Affiliates::BankBookImageKey)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::TotalCommission)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_affiliates_user")
                            .from(Affiliates::Table, Affiliates::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AffiliateApplications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateApplications::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::PreviousRole)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::BankType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::AccountName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::AccountNumber)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::BankBookImageUrl)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::BankBookImageKey)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::ReviewedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateApplications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_affiliate_applications_user")
                            .from(AffiliateApplications::Table, AffiliateApplications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Commissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Commissions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Commissions::AffiliateId).big_integer().not_null())
                    .col(ColumnDef::new(Commissions::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(Commissions::OrderCode).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Commissions::PurchaseValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Commissions::CommissionAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Commissions::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Commissions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Commissions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_commissions_affiliate")
                            .from(Commissions::Table, Commissions::AffiliateId)
                            .to(Affiliates::Table, Affiliates::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_commissions_order")
                            .from(Commissions::Table, Commissions::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 一个订单对同一推广人最多一条佣金
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_commissions_order_affiliate")
                    .table(Commissions::Table)
                    .col(Commissions::OrderId)
                    .col(Commissions::AffiliateId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WithdrawRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WithdrawRequests::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WithdrawRequests::AffiliateId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WithdrawRequests::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(WithdrawRequests::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(WithdrawRequests::ProofImageUrl).text().null())
                    .col(
                        ColumnDef::new(WithdrawRequests::ProofImageKey)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(WithdrawRequests::RejectionReason).text().null())
                    .col(
                        ColumnDef::new(WithdrawRequests::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdraw_requests_affiliate")
                            .from(WithdrawRequests::Table, WithdrawRequests::AffiliateId)
                            .to(Affiliates::Table, Affiliates::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WithdrawRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffiliateApplications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Affiliates::Table).to_owned())
            .await?;
        Ok(())
    }
}
