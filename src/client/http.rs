// src/client/http.rs

//! HTTP client utilities.

use std::time::Duration;

use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, ApiResponse};

/// Create a configured asynchronous HTTP client.
pub fn create_http_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Resolve a request path against the base URL. Absolute URLs pass through.
pub fn resolve(base: &Url, path: &str) -> Result<Url> {
    match Url::parse(path) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Ok(base.join(path.trim_start_matches('/'))?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Buffer a response, turning any non-2xx status into [`AppError::Status`].
pub async fn read_response(response: reqwest::Response) -> Result<ApiResponse> {
    let status = response.status();
    let headers = response.headers().clone();

    if !status.is_success() {
        let body = body_text(response).await;
        return Err(AppError::status(status, body));
    }

    let body = response.bytes().await?.to_vec();
    Ok(ApiResponse {
        status,
        headers,
        body,
    })
}

/// Read an error response body. A body that cannot be read is reported as empty.
pub(crate) async fn body_text(response: reqwest::Response) -> String {
    let url = response.url().clone();
    match response.text().await {
        Ok(body) => body,
        Err(e) => {
            log::debug!("Could not read response body from {}: {}", url, e);
            String::new()
        }
    }
}
