// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for loading configuration and
//! assembling the session store and client it describes.

use std::path::Path;
use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::{AppError, Result};
use crate::models::Config;
use crate::session::{FileSessionStore, SessionStore};

/// Load configuration and reject it if it cannot be parsed or fails validation.
///
/// Only a missing file falls back to defaults.
pub fn load_validated(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)
            .map_err(|e| AppError::config(format!("Cannot load configuration {path:?}: {e}")))?
    } else {
        log::warn!("Config file {:?} not found. Using defaults.", path);
        Config::default()
    };
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration in {path:?}: {e}")))?;
    Ok(config)
}

/// Open the persistent session store for the configured backend origin.
pub async fn open_session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let base_url = config.api.base_url()?;
    let store = FileSessionStore::for_origin(&config.session.dir, &base_url).await;
    log::debug!("Session file: {}", store.path().display());
    Ok(Arc::new(store))
}

/// Build a client backed by the persistent session store.
pub async fn connect(config: &Config) -> Result<ApiClient> {
    let store = open_session_store(config).await?;
    ApiClient::new(config, store)
}
