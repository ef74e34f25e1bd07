use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("Invalid referral code: {0}")]
    InvalidReferral(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("HTTP request error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status_code_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::AuthError(_) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::InsufficientStock { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_STOCK")
            }
            AppError::InsufficientBalance { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_BALANCE")
            }
            AppError::InvalidReferral(_) => (StatusCode::BAD_REQUEST, "INVALID_REFERRAL"),
            AppError::UpstreamError(_) | AppError::HttpClientError(_) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            AppError::JwtError(_) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::SerdeJsonError(_) | AppError::ConfigError(_) | AppError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    /// 业务错误原样返回；基础设施错误只在 debug 构建下暴露细节
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(_)
            | AppError::AuthError(_)
            | AppError::Unauthorized(_)
            | AppError::NotFound(_)
            | AppError::Conflict(_)
            | AppError::InsufficientStock { .. }
            | AppError::InsufficientBalance { .. }
            | AppError::InvalidReferral(_) => self.to_string(),
            _ if cfg!(debug_assertions) => self.to_string(),
            AppError::UpstreamError(_) | AppError::HttpClientError(_) => {
                "Upstream service unavailable".to_string()
            }
            AppError::DatabaseError(_) => "Database error".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code_and_code().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code) = self.status_code_and_code();
        match self {
            AppError::ValidationError(msg) => log::warn!("Validation error: {msg}"),
            AppError::AuthError(msg) | AppError::Unauthorized(msg) => {
                log::warn!("Authentication error: {msg}")
            }
            AppError::UpstreamError(_) | AppError::HttpClientError(_) => {
                log::error!("Upstream error: {self}")
            }
            AppError::DatabaseError(err) => log::error!("Database error: {err}"),
            _ if status_code.is_server_error() => log::error!("Internal error: {self}"),
            _ => {}
        }

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": self.public_message()
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_keep_their_detail() {
        let err = AppError::InsufficientBalance {
            available: 50_000,
            requested: 60_000,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.public_message().contains("50000"));
        assert!(err.public_message().contains("60000"));

        let err = AppError::InsufficientStock {
            product: "Kopi Gayo".to_string(),
            available: 1,
            requested: 3,
        };
        assert!(err.public_message().contains("Kopi Gayo"));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::UpstreamError("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::DatabaseError(sea_orm::DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
