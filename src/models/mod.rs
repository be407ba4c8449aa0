// src/models/mod.rs

//! Domain models for the API client.
//!
//! Configuration, token payloads, and the request/response types that flow
//! through the authenticated pipeline.

mod config;
mod request;
mod token;

// Re-export all public types
pub use config::{ApiConfig, Config, LoggingConfig, SessionConfig};
pub use request::{ApiRequest, ApiResponse};
pub use token::{
    Credentials, Envelope, LogoutRequest, RefreshRequest, TokenPair, decode_envelope,
};
