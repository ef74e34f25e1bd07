use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{normalize_phone, validate_phone};

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn get_profile(&self, user_id: i64) -> AppResult<UserProfile> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(user.into())
    }

    /// 更新个人资料；空字符串表示清空可选字段
    pub async fn update_profile(
        &self,
        user_id: i64,
        request: UpdateProfileRequest,
    ) -> AppResult<UserProfile> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut active: users::ActiveModel = user.into();
        let mut changed = false;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() || name.chars().count() > 100 {
                return Err(AppError::ValidationError(
                    "Name must be between 1 and 100 characters".to_string(),
                ));
            }
            active.name = Set(name);
            changed = true;
        }
        if let Some(phone) = request.phone {
            let phone = normalize_phone(&phone);
            if !phone.is_empty() {
                validate_phone(&phone)?;
            }
            active.phone = Set(non_empty(phone));
            changed = true;
        }
        if let Some(address) = request.address {
            active.address = Set(non_empty(address));
            changed = true;
        }
        if let Some(city) = request.city {
            active.city = Set(non_empty(city));
            changed = true;
        }
        if let Some(postal_code) = request.postal_code {
            active.postal_code = Set(non_empty(postal_code));
            changed = true;
        }

        if !changed {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }

        active.updated_at = Set(Utc::now());
        let user = active.update(&self.pool).await?;
        Ok(user.into())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
