//! Token refresh procedure.
//!
//! Exchanges the stored refresh token for a new pair at the refresh endpoint.
//! The store is written only after a well-formed 2xx response, and both tokens
//! are replaced in a single write.
//!
//! With single-flight enabled, refreshes run one at a time. A task that waited
//! for the guard compares the stored access token with the one its failed
//! request carried; if they differ, another task already refreshed and the
//! stored token is reused without calling the backend.

use std::sync::Arc;

use tokio::sync::Mutex;
use url::Url;

use crate::client::http;
use crate::error::RefreshError;
use crate::models::{RefreshRequest, TokenPair, decode_envelope};
use crate::session::SessionStore;

pub(crate) struct Refresher {
    http: reqwest::Client,
    url: Url,
    store: Arc<dyn SessionStore>,
    flight: Option<Mutex<()>>,
}

impl Refresher {
    pub(crate) fn new(
        http: reqwest::Client,
        url: Url,
        store: Arc<dyn SessionStore>,
        single_flight: bool,
    ) -> Self {
        Self {
            http,
            url,
            store,
            flight: single_flight.then(|| Mutex::new(())),
        }
    }

    /// Obtain a fresh access token.
    ///
    /// `rejected` is the access token the failed request was sent with.
    pub(crate) async fn refresh(
        &self,
        rejected: Option<&str>,
    ) -> std::result::Result<String, RefreshError> {
        let Some(flight) = &self.flight else {
            return self.refresh_now().await;
        };

        let _guard = flight.lock().await;
        if let Some(current) = self.store.access_token().await {
            if rejected != Some(current.as_str()) {
                log::debug!("Reusing access token refreshed by a concurrent request");
                return Ok(current);
            }
        }
        self.refresh_now().await
    }

    /// Call the refresh endpoint unconditionally.
    pub(crate) async fn refresh_now(&self) -> std::result::Result<String, RefreshError> {
        let Some(refresh_token) = self.store.refresh_token().await else {
            log::warn!("Token refresh skipped: no refresh token stored");
            return Err(RefreshError::MissingRefreshToken);
        };

        log::debug!("Refreshing access token at {}", self.url);
        let response = self
            .http
            .post(self.url.clone())
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(RefreshError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = http::body_text(response).await;
            log::warn!("Token refresh rejected with HTTP {}", status);
            return Err(RefreshError::Rejected { status, body });
        }

        let bytes = response.bytes().await.map_err(RefreshError::Transport)?;
        let pair: TokenPair = decode_envelope(&bytes)
            .map_err(|e| RefreshError::MalformedBody(e.to_string()))?;

        self.store.store_pair(&pair).await;
        log::info!("Access token refreshed");
        Ok(pair.access_token)
    }
}
