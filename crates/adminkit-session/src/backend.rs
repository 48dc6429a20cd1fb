//! Remote auth endpoints as seen by the session layer

use std::future::Future;

use crate::user::{LoginGrant, LoginRequest, UserProfile};
use crate::Result;

/// The three auth calls the session manager needs.
///
/// Implementations must not retry; a rejected login is reported as
/// [`SessionError::LoginRejected`](crate::SessionError::LoginRejected).
pub trait AuthBackend: Send + Sync + 'static {
    fn login(&self, request: &LoginRequest) -> impl Future<Output = Result<LoginGrant>> + Send;

    /// Fetch the profile for the token currently held by the session
    fn user_info(&self) -> impl Future<Output = Result<UserProfile>> + Send;

    fn logout(&self) -> impl Future<Output = Result<()>> + Send;
}
