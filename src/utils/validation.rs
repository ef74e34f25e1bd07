use regex::Regex;

use crate::error::{AppError, AppResult};

fn compile(pattern: &str) -> AppResult<Regex> {
    Regex::new(pattern).map_err(|e| AppError::InternalError(format!("bad pattern: {e}")))
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !compile(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?.is_match(email) {
        return Err(AppError::ValidationError("Invalid email format".to_string()));
    }
    Ok(())
}

/// 手机号只保留数字和开头的 +
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

pub fn validate_phone(phone: &str) -> AppResult<()> {
    if !compile(r"^\+?[0-9]{8,15}$")?.is_match(phone) {
        return Err(AppError::ValidationError("Invalid phone number".to_string()));
    }
    Ok(())
}

pub fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(())
}
