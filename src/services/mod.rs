//! Service layer for the API client.
//!
//! This module contains the session lifecycle flows:
//! - Login / logout / profile (`AuthService`)

mod auth;

pub use auth::AuthService;
