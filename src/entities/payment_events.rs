use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use super::orders::PaymentProvider;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "payment_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub provider: PaymentProvider,
    pub event_key: String,
    pub order_code: String,
    pub provider_status: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
