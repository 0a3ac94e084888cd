//! memorie-core: client state for the memorie face-recognition memory aid.
//!
//! Persists the signed-in user, trusted contacts and recognition log in a
//! local SQLite store, mirrors contacts in memory for display, gates routes
//! on authentication and drives the camera → recognition → scoring flow.
//! Network access is behind the traits in [`remote`].

pub mod capture;
pub mod config;
pub mod contacts;
pub mod insights;
pub mod remote;
pub mod session;
pub mod store;
pub mod types;
pub mod validate;

pub use capture::{CaptureError, CaptureFlow, CaptureState, FrameSource, Verdict};
pub use config::Config;
pub use contacts::{ContactRepository, RefreshError, ScoreChange};
pub use remote::{ApiError, ApiResult, AuthApi, ContactSource, FaceRecognizer};
pub use session::{Guard, GuardState, Route, Session, SessionError};
pub use store::{Store, StoreError};
pub use types::{Contact, RecognitionLog, StoredUser, TrustedContact};
