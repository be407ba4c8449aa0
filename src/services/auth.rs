// src/services/auth.rs

//! Login, logout and profile flows.
//!
//! These are the only writers of the session besides the refresh procedure:
//! login stores a fresh pair, logout clears it.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::{AppError, Result};
use crate::models::{ApiConfig, ApiRequest, Credentials, LogoutRequest, TokenPair};

/// Service for session lifecycle calls against the auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
    login_path: String,
    logout_path: String,
    profile_path: String,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>, config: &ApiConfig) -> Self {
        Self {
            client,
            login_path: config.login_path.clone(),
            logout_path: config.logout_path.clone(),
            profile_path: config.profile_path.clone(),
        }
    }

    /// Authenticate and store the returned token pair.
    ///
    /// Sent without a bearer token and outside the refresh cycle, so a
    /// rejected password surfaces as the backend's own status.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair> {
        let request = ApiRequest::post(&self.login_path).json(credentials)?;
        let response = self.client.execute(&request).await?;
        let pair: TokenPair = response
            .data()
            .map_err(|e| AppError::validation(format!("login response has no token pair: {e}")))?;

        self.client.store().store_pair(&pair).await;
        log::info!("Logged in as {}", credentials.username);
        Ok(pair)
    }

    /// Revoke the refresh token on the backend (best effort) and clear the session.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.client.store().refresh_token().await {
            let body = LogoutRequest {
                refresh_token: &refresh_token,
            };
            let result = match ApiRequest::post(&self.logout_path).json(&body) {
                Ok(request) => self.client.send(request).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!("Logout call failed, clearing local session anyway: {}", e);
            }
        }

        self.client.store().clear().await;
        log::info!("Session cleared");
    }

    /// Fetch the signed-in user's profile.
    pub async fn profile(&self) -> Result<serde_json::Value> {
        self.client.get(&self.profile_path).await?.data()
    }

    /// Both tokens present.
    pub async fn is_authenticated(&self) -> bool {
        self.client.store().tokens().await.is_some()
    }
}
