//! Session token storage.
//!
//! The token pair lives under two fixed keys:
//!
//! ```text
//! accessToken   -> short-lived bearer credential
//! refreshToken  -> exchanged for a new pair when the access token expires
//! ```
//!
//! Stores never fail from the caller's point of view. A backend that cannot
//! persist keeps serving its in-memory view and logs the problem, so the worst
//! case is a session that does not survive a restart.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::models::TokenPair;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Trait for token storage backends.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn access_token(&self) -> Option<String>;

    async fn refresh_token(&self) -> Option<String>;

    /// Write the given tokens. A `None` leaves the stored value for that key untouched.
    async fn set_tokens(&self, access_token: Option<&str>, refresh_token: Option<&str>);

    /// Remove both tokens.
    async fn clear(&self);

    /// Both tokens, or `None` when the session is unauthenticated.
    async fn tokens(&self) -> Option<TokenPair> {
        let access = self.access_token().await?;
        let refresh = self.refresh_token().await?;
        Some(TokenPair::new(access, refresh))
    }

    /// Replace both tokens in one write.
    async fn store_pair(&self, pair: &TokenPair) {
        self.set_tokens(Some(&pair.access_token), Some(&pair.refresh_token))
            .await;
    }
}
