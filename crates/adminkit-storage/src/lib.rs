//! AdminKit Storage Layer
//!
//! Durable storage for the persisted credential (bearer token plus the cached
//! user profile). Nothing outside the session layer talks to this crate.

mod credentials;
mod database;
mod error;
mod migrations;

pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SqliteCredentialStore,
    StoredCredential, TOKEN_KEY, USER_KEY,
};
pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
