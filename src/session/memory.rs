//! In-process session store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::TokenPair;
use crate::session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SessionStore};

/// Session store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<&'static str, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a token pair.
    pub fn with_tokens(pair: TokenPair) -> Self {
        let mut entries = HashMap::new();
        entries.insert(ACCESS_TOKEN_KEY, pair.access_token);
        entries.insert(REFRESH_TOKEN_KEY, pair.refresh_token);
        Self {
            entries: RwLock::new(entries),
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY).await
    }

    async fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY).await
    }

    async fn set_tokens(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        let mut entries = self.entries.write().await;
        if let Some(token) = access_token {
            entries.insert(ACCESS_TOKEN_KEY, token.to_string());
        }
        if let Some(token) = refresh_token {
            entries.insert(REFRESH_TOKEN_KEY, token.to_string());
        }
    }

    async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.remove(ACCESS_TOKEN_KEY);
        entries.remove(REFRESH_TOKEN_KEY);
    }
}
