pub mod biteship;
pub mod logistics;
pub mod midtrans;
pub mod payment;
pub mod storage;
pub mod xendit;

pub use biteship::BiteshipClient;
pub use logistics::*;
pub use midtrans::MidtransGateway;
pub use payment::*;
pub use storage::*;
pub use xendit::XenditGateway;

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

/// 所有出站请求共用一个带超时的客户端
pub fn build_http_client(timeout_secs: u64) -> AppResult<Client> {
    Client::builder()
        .user_agent("commerce-backend")
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::ConfigError(format!("failed to build http client: {e}")))
}

/// 非 2xx 统一转成 UpstreamError
pub(crate) async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        log::error!("{provider} request failed: HTTP {}: {error_text}", status.as_u16());
        return Err(AppError::UpstreamError(format!(
            "{provider} returned HTTP {}",
            status.as_u16()
        )));
    }
    response
        .json()
        .await
        .map_err(|e| AppError::UpstreamError(format!("{provider} sent an unreadable response: {e}")))
}
