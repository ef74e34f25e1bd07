use sea_orm_migration::prelude::*;

use crate::m20250601_000001_create_users_and_catalog::{Products, Users};

#[derive(DeriveIden)]
pub(crate) enum Orders {
    Table,
    Id,
    OrderCode,
    UserId,
    TotalAmount,
    ShippingCost,
    PaymentStatus,
    DeliveryStatus,
    PaymentProvider,
    ProviderTransactionId,
    PaymentMethod,
    PaymentUrl,
    TrackingId,
    WaybillNumber,
    RecipientName,
    RecipientPhone,
    RecipientAddress,
    RecipientCity,
    RecipientPostalCode,
    RecipientAreaId,
    CourierCompany,
    CourierService,
    PaidAt,
    ShipmentRequestedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    ProductName,
    UnitPrice,
    Quantity,
    WeightGrams,
    ReferralCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PaymentEvents {
    Table,
    Id,
    Provider,
    EventKey,
    OrderCode,
    ProviderStatus,
    ReceivedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Orders::OrderCode)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Orders::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::TotalAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Orders::ShippingCost)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::DeliveryStatus)
                            .string_len(16)
                            .not_null()
                            .default("idle"),
                    )
                    .col(ColumnDef::new(Orders::PaymentProvider).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Orders::ProviderTransactionId)
                            .string_len(128)
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::PaymentMethod).string_len(64).null())
                    .col(ColumnDef::new(Orders::PaymentUrl).text().null())
                    .col(ColumnDef::new(Orders::TrackingId).string_len(128).null())
                    .col(ColumnDef::new(Orders::WaybillNumber).string_len(128).null())
                    .col(ColumnDef::new(Orders::RecipientName).string_len(255).not_null())
                    .col(ColumnDef::new(Orders::RecipientPhone).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::RecipientAddress).text().not_null())
                    .col(ColumnDef::new(Orders::RecipientCity).string_len(128).null())
                    .col(
                        ColumnDef::new(Orders::RecipientPostalCode)
                            .string_len(16)
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::RecipientAreaId).string_len(128).null())
                    .col(ColumnDef::new(Orders::CourierCompany).string_len(64).not_null())
                    .col(ColumnDef::new(Orders::CourierService).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Orders::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::ShipmentRequestedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_user")
                            .from(Orders::Table, Orders::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        // 物流 webhook 按 tracking_id 反查订单
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_tracking_id")
                    .table(Orders::Table)
                    .col(Orders::TrackingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(OrderItems::ProductId).big_integer().not_null())
                    .col(
                        ColumnDef::new(OrderItems::ProductName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderItems::UnitPrice).big_integer().not_null())
                    .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(OrderItems::WeightGrams)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrderItems::ReferralCode).string_len(32).null())
                    .col(
                        ColumnDef::new(OrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_product")
                            .from(OrderItems::Table, OrderItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentEvents::Provider).string_len(16).not_null())
                    .col(
                        ColumnDef::new(PaymentEvents::EventKey)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentEvents::OrderCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentEvents::ProviderStatus)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentEvents::ReceivedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一个通知只处理一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payment_events_provider_key")
                    .table(PaymentEvents::Table)
                    .col(PaymentEvents::Provider)
                    .col(PaymentEvents::EventKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        Ok(())
    }
}
