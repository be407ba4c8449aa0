//! File-backed session store, scoped to one API origin.
//!
//! ## Storage Layout
//!
//! ```text
//! {dir}/
//! └── session-{sha256(origin)[..16]}.json
//! ```
//!
//! The file holds the key/value entries and the time of the last write:
//!
//! ```json
//! { "updated_at": "2026-01-01T00:00:00Z", "entries": { "accessToken": "..." } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use url::Url;

use crate::error::Result;
use crate::session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SessionStore};

/// On-disk representation.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Durable session store persisted as JSON.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    state: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Open the store for the origin of `base_url` inside `dir`.
    pub async fn for_origin(dir: impl AsRef<Path>, base_url: &Url) -> Self {
        Self::open(dir.as_ref().join(Self::file_name(base_url))).await
    }

    /// Open the store at an explicit path.
    ///
    /// A missing or unreadable file yields an empty session.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_file(&path).await {
            Ok(Some(file)) => {
                log::debug!("Loaded session from {}", path.display());
                file.entries
            }
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable session file {}: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };

        Self {
            path,
            state: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name derived from the URL origin, e.g. `https://lib.example:443`.
    pub fn file_name(base_url: &Url) -> String {
        let origin = base_url.origin().ascii_serialization();
        let digest = Sha256::digest(origin.as_bytes());
        format!("session-{}.json", &hex::encode(digest)[..16])
    }

    async fn read_file(path: &Path) -> Result<Option<SessionFile>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the entries atomically (write to temp, then rename).
    async fn write_file(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = SessionFile {
            updated_at: Some(Utc::now()),
            entries: entries.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        // The mode only applies on creation, so a leftover temp file goes first.
        let tmp = self.path.with_extension("tmp");
        let _ = tokio::fs::remove_file(&tmp).await;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut handle = options.open(&tmp).await?;
        handle.write_all(&bytes).await?;
        handle.flush().await?;
        drop(handle);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) {
        if let Err(e) = self.write_file(entries).await {
            log::warn!(
                "Session not persisted to {}: {}. Tokens kept in memory only.",
                self.path.display(),
                e
            );
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.state.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY).await
    }

    async fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY).await
    }

    async fn set_tokens(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        if access_token.is_none() && refresh_token.is_none() {
            return;
        }

        // Held across the write so concurrent updates reach disk in order.
        let mut state = self.state.lock().await;
        if let Some(token) = access_token {
            state.insert(ACCESS_TOKEN_KEY.to_string(), token.to_string());
        }
        if let Some(token) = refresh_token {
            state.insert(REFRESH_TOKEN_KEY.to_string(), token.to_string());
        }
        self.persist(&state).await;
    }

    async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.remove(ACCESS_TOKEN_KEY);
        state.remove(REFRESH_TOKEN_KEY);
        self.persist(&state).await;
    }
}
