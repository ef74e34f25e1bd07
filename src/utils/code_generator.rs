use chrono::Utc;
use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::affiliate_entity;
use crate::error::AppResult;

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 生成订单号：ORD-{毫秒时间戳}-{8位十六进制}
pub fn generate_order_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: u32 = rng.gen_range(0..=u32::MAX);
    format!("ORD-{}-{:08x}", Utc::now().timestamp_millis(), suffix)
}

fn random_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| REFERRAL_ALPHABET[rng.gen_range(0..REFERRAL_ALPHABET.len())] as char)
        .collect()
}

/// 生成唯一的推广码
pub async fn generate_unique_referral_code<C: ConnectionTrait>(db: &C) -> AppResult<String> {
    loop {
        let code = random_referral_code();

        // 检查是否已存在
        let exists = affiliate_entity::Entity::find()
            .filter(affiliate_entity::Column::ReferralCode.eq(code.as_str()))
            .count(db)
            .await?;

        if exists == 0 {
            return Ok(code);
        }
    }
}
