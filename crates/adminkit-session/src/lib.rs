//! AdminKit Session Management
//!
//! - A Session is the single owned record of the current authentication state
//! - Status moves Uninitialized -> Loading -> {Authenticated, Unauthenticated}
//! - Every transition is published atomically to subscribers
//! - The persisted credential is only touched from here

mod backend;
mod cache;
mod error;
mod manager;
mod session;
mod state;
mod store;
mod user;

pub use backend::AuthBackend;
pub use cache::{CredentialCache, PersistedCredential};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionEvent};
pub use state::SessionStatus;
pub use store::SessionStore;
pub use user::{LoginGrant, LoginRequest, UserProfile};

pub type Result<T> = std::result::Result<T, SessionError>;
