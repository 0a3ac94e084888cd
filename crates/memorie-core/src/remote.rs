//! Seams between the local state and the backend.
//!
//! The HTTP client in `memorie-api` implements these traits; tests implement
//! them with canned responses.

use crate::types::{
    LoginResponse, RecognitionResponse, RegisterResponse, TrustedContact, UserLoginRequest,
    UserRegistrationRequest,
};
use async_trait::async_trait;
use thiserror::Error;

/// Message shown for any transport failure.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your connection and try again.";
/// Message used when an error body parses but carries no message.
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";
/// Message used when an error body is not JSON.
pub const UNPARSEABLE_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// DNS failure, refused connection, reset, or an unreadable success body.
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network,
    /// Non-2xx response from the backend.
    #[error("{message}")]
    Backend { status: u16, message: String },
}

impl ApiError {
    /// Human-readable message suitable for inline display.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Network => NETWORK_ERROR_MESSAGE,
            ApiError::Backend { message, .. } => message,
        }
    }

    /// Build a backend error from a raw error body.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => value
                .get("message")
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .unwrap_or(REQUEST_FAILED_MESSAGE)
                .to_string(),
            Err(_) => UNPARSEABLE_ERROR_MESSAGE.to_string(),
        };
        ApiError::Backend { status, message }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Registration and login.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register_user(&self, request: &UserRegistrationRequest) -> ApiResult<RegisterResponse>;
    async fn login_user(&self, request: &UserLoginRequest) -> ApiResult<LoginResponse>;
    async fn logout_user(&self) -> ApiResult<()>;
}

/// Source of a user's trusted contacts.
#[async_trait]
pub trait ContactSource: Send + Sync {
    async fn get_trusted_contacts_by_user_id(&self, user_id: &str) -> ApiResult<Vec<TrustedContact>>;
}

/// Face-recognition endpoint: match a JPEG against the user's trusted-contact index.
#[async_trait]
pub trait FaceRecognizer: Send + Sync {
    async fn recognize_face(&self, jpeg: &[u8], user_id: &str) -> ApiResult<RecognitionResponse>;
}
