//! Authenticated request pipeline.
//!
//! Every API call goes through [`ApiClient::send`]:
//!
//! 1. **Request stage**: the stored access token, if any, is attached as
//!    `Authorization: Bearer <token>`. Only requests to the base URL's origin
//!    carry it; other origins are sent as given, with no refresh.
//! 2. **Response stage**: a 2xx response is returned. A 401 on a request that
//!    has not been retried triggers one refresh and one resend. Anything else
//!    (other statuses, a second 401, transport failures) goes back to the
//!    caller unchanged, and a failed refresh surfaces as
//!    [`AppError::Refresh`](crate::error::AppError::Refresh).

pub mod http;
mod refresh;

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::error::Result;
use crate::models::{ApiRequest, ApiResponse, Config};
use crate::session::SessionStore;

use refresh::Refresher;

/// API client that authenticates requests from a session store.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn SessionStore>,
    refresher: Refresher,
}

impl ApiClient {
    /// Create a client with an HTTP stack built from the configuration.
    pub fn new(config: &Config, store: Arc<dyn SessionStore>) -> Result<Self> {
        let http = http::create_http_client(&config.api)?;
        Self::with_http_client(config, store, http)
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_http_client(
        config: &Config,
        store: Arc<dyn SessionStore>,
        http: reqwest::Client,
    ) -> Result<Self> {
        let base_url = config.api.base_url()?;
        let refresh_url = http::resolve(&base_url, &config.api.refresh_path)?;
        let refresher = Refresher::new(
            http.clone(),
            refresh_url,
            Arc::clone(&store),
            config.session.single_flight,
        );

        Ok(Self {
            http,
            base_url,
            store,
            refresher,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session store this client reads tokens from.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Send a request, refreshing the session and resending once on a 401.
    ///
    /// Requests to another origin than the base URL go out without the
    /// session token and never trigger a refresh.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        if !self.is_same_origin(&request.path)? {
            log::debug!(
                "{} {} is outside {}, sending without session credentials",
                request.method,
                request.path,
                self.base_url.origin().ascii_serialization()
            );
            return self.execute(&request).await;
        }

        loop {
            self.authorize(&mut request).await?;

            let err = match self.execute(&request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !err.is_unauthorized() || request.retried() {
                return Err(err);
            }

            request.mark_retried();
            log::debug!(
                "{} {} returned 401, refreshing session",
                request.method,
                request.path
            );

            let token = self.refresher.refresh(request.bearer()).await?;
            request.set_bearer(&token)?;
        }
    }

    /// Send a request exactly as given: no token attached, no refresh on 401.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = http::resolve(&self.base_url, &request.path)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        http::read_response(response).await
    }

    /// Exchange the stored refresh token for a new pair without a failed request.
    pub async fn refresh_session(&self) -> Result<()> {
        self.refresher.refresh_now().await?;
        Ok(())
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ApiResponse> {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ApiResponse> {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    fn is_same_origin(&self, path: &str) -> Result<bool> {
        let url = http::resolve(&self.base_url, path)?;
        Ok(url.origin() == self.base_url.origin())
    }

    /// Request stage: attach the stored access token when there is one.
    async fn authorize(&self, request: &mut ApiRequest) -> Result<()> {
        if let Some(token) = self.store.access_token().await {
            request.set_bearer(&token)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
