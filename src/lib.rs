// src/lib.rs

//! Libris API client library
//!
//! Authenticated request pipeline and session storage for the Libris
//! library management backend.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

pub use client::ApiClient;
pub use error::{AppError, RefreshError, Result};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
