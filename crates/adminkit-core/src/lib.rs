//! AdminKit Core
//!
//! Client for the admin panel API. Owns the session, routes every call
//! through the request pipeline, and exposes typed resource clients.

mod auth;
mod category;
mod client;
mod config;
mod error;

pub use auth::{ApiResponse, AuthApi};
pub use category::{parent_name, Category, CategoryApi, CreateCategory, CreatedId, UpdateCategory};
pub use client::AdminClient;
pub use config::Config;
pub use error::CoreError;

// Re-export the layers underneath
pub use adminkit_http::{
    ErrorKind, HttpTransport, Notice, NoticeLevel, NotificationBus, Notifier, RequestError,
    RequestOptions, RequestOutcome, RequestPipeline, Transport,
};
pub use adminkit_session::{
    LoginRequest, Session, SessionError, SessionEvent, SessionManager, SessionStatus,
    SessionStore, UserProfile,
};
pub use adminkit_storage::{CredentialStore, Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
