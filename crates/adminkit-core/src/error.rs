//! Core error types

use thiserror::Error;

use adminkit_http::{ErrorKind, RequestError};
use adminkit_session::SessionError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] adminkit_storage::StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Transport error: {0}")]
    Transport(#[from] adminkit_http::TransportError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Message suitable for showing next to a login form
    pub fn login_message(&self) -> String {
        match self {
            CoreError::Session(SessionError::LoginRejected(message)) => message.clone(),
            CoreError::Session(SessionError::Backend(source)) => {
                match source.downcast_ref::<RequestError>() {
                    Some(e) if e.kind == ErrorKind::Network => "登录失败，请检查网络".to_string(),
                    Some(e) => e.message.clone(),
                    None => "登录失败".to_string(),
                }
            }
            _ => "登录失败".to_string(),
        }
    }
}
