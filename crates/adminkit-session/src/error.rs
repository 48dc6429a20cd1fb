//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] adminkit_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// The server refused the login; carries the message meant for the user
    #[error("{0}")]
    LoginRejected(String),

    /// The server answered but would not hand out a profile for the token
    #[error("Profile unavailable: {0}")]
    ProfileUnavailable(String),

    #[error("Auth request failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SessionError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SessionError::Backend(Box::new(err))
    }
}
