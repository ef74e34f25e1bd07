use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{cart_item_entity as cart_items, product_entity as products};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::affiliate_service::resolve_referral;

#[derive(Clone)]
pub struct CartService {
    pool: DatabaseConnection,
}

impl CartService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 加入购物车；同一商品累加数量，新的推广码覆盖旧的
    pub async fn add_item(&self, user_id: i64, request: AddCartItemRequest) -> AppResult<CartLine> {
        if request.quantity < 1 {
            return Err(AppError::ValidationError("Quantity must be at least 1".to_string()));
        }

        let product = find_product(&self.pool, request.product_id).await?;
        let referral = resolve_referral(&self.pool, request.referral_code.as_deref(), user_id).await?;

        let existing = cart_items::Entity::find()
            .filter(cart_items::Column::UserId.eq(user_id))
            .filter(cart_items::Column::ProductId.eq(product.id))
            .one(&self.pool)
            .await?;

        let in_cart = existing.as_ref().map_or(0, |i| i.quantity);
        let requested = in_cart.saturating_add(request.quantity);
        ensure_stock(&product, requested)?;

        let now = Utc::now();
        let item = match existing {
            Some(item) => {
                let referral_code = referral
                    .map(|a| a.referral_code)
                    .or_else(|| item.referral_code.clone());
                let mut active: cart_items::ActiveModel = item.into();
                active.quantity = Set(requested);
                active.referral_code = Set(referral_code);
                active.updated_at = Set(now);
                active.update(&self.pool).await?
            }
            None => {
                cart_items::ActiveModel {
                    user_id: Set(user_id),
                    product_id: Set(product.id),
                    quantity: Set(requested),
                    referral_code: Set(referral.map(|a| a.referral_code)),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?
            }
        };

        Ok(cart_line(item, &product))
    }

    /// 修改数量；传入推广码时一并替换
    pub async fn update_item(
        &self,
        user_id: i64,
        item_id: i64,
        request: UpdateCartItemRequest,
    ) -> AppResult<CartLine> {
        if request.quantity < 1 {
            return Err(AppError::ValidationError("Quantity must be at least 1".to_string()));
        }

        let item = find_item(&self.pool, user_id, item_id).await?;
        let product = find_product(&self.pool, item.product_id).await?;
        ensure_stock(&product, request.quantity)?;

        let referral_code = match request.referral_code.as_deref() {
            Some(code) => resolve_referral(&self.pool, Some(code), user_id)
                .await?
                .map(|a| a.referral_code),
            None => item.referral_code.clone(),
        };

        let mut active: cart_items::ActiveModel = item.into();
        active.quantity = Set(request.quantity);
        active.referral_code = Set(referral_code);
        active.updated_at = Set(Utc::now());
        let item = active.update(&self.pool).await?;

        Ok(cart_line(item, &product))
    }

    pub async fn remove_item(&self, user_id: i64, item_id: i64) -> AppResult<()> {
        let result = cart_items::Entity::delete_many()
            .filter(cart_items::Column::Id.eq(item_id))
            .filter(cart_items::Column::UserId.eq(user_id))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Cart item {item_id} not found")));
        }
        Ok(())
    }

    pub async fn get_cart(&self, user_id: i64) -> AppResult<CartResponse> {
        let lines = load_cart(&self.pool, user_id).await?;
        Ok(CartResponse::new(lines))
    }

    pub async fn clear(&self, user_id: i64) -> AppResult<u64> {
        clear_cart(&self.pool, user_id).await
    }
}

/// 读取购物车，价格按商品当前价格计算；已下架的商品跳过
pub(crate) async fn load_cart<C: ConnectionTrait>(db: &C, user_id: i64) -> AppResult<Vec<CartLine>> {
    let items = cart_items::Entity::find()
        .filter(cart_items::Column::UserId.eq(user_id))
        .order_by_asc(cart_items::Column::Id)
        .all(db)
        .await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
    let products: HashMap<i64, products::Model> = products::Entity::find()
        .filter(products::Column::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        match products.get(&item.product_id) {
            Some(product) => lines.push(cart_line(item, product)),
            None => log::warn!(
                "Cart item {} references missing product {}",
                item.id,
                item.product_id
            ),
        }
    }
    Ok(lines)
}

pub(crate) async fn clear_cart<C: ConnectionTrait>(db: &C, user_id: i64) -> AppResult<u64> {
    let result = cart_items::Entity::delete_many()
        .filter(cart_items::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn find_product<C: ConnectionTrait>(db: &C, product_id: i64) -> AppResult<products::Model> {
    products::Entity::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id} not found")))
}

async fn find_item<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    item_id: i64,
) -> AppResult<cart_items::Model> {
    cart_items::Entity::find_by_id(item_id)
        .filter(cart_items::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cart item {item_id} not found")))
}

fn ensure_stock(product: &products::Model, requested: i32) -> AppResult<()> {
    if requested > product.stock {
        return Err(AppError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested,
        });
    }
    Ok(())
}

fn cart_line(item: cart_items::Model, product: &products::Model) -> CartLine {
    CartLine {
        id: item.id,
        product_id: product.id,
        product_name: product.name.clone(),
        unit_price: product.price,
        quantity: item.quantity,
        stock: product.stock,
        subtotal: product.price * i64::from(item.quantity),
        weight_grams: product.weight_grams,
        referral_code: item.referral_code,
    }
}
