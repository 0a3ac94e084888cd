//! memorie-api: HTTP client for the memorie backend.
//!
//! Every backend operation is one async method on [`ApiClient`] returning
//! [`memorie_core::ApiResult`]. Transport failures collapse into
//! `ApiError::Network`; non-2xx responses carry the backend's message.

pub mod client;
pub mod config;

pub use client::ApiClient;
pub use config::ApiConfig;
