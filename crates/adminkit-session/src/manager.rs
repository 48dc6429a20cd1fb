//! Session Manager
//!
//! Drives the session through login, logout and the optimistic
//! restore-then-validate startup. The store does the bookkeeping; this type
//! decides when to talk to the server.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::backend::AuthBackend;
use crate::session::{Session, SessionEvent};
use crate::store::SessionStore;
use crate::user::{LoginRequest, UserProfile};
use crate::Result;

pub struct SessionManager<B> {
    store: SessionStore,
    backend: Arc<B>,
}

impl<B: AuthBackend> SessionManager<B> {
    pub fn new(store: SessionStore, backend: B) -> Self {
        Self {
            store,
            backend: Arc::new(backend),
        }
    }

    /// Read the persisted credential and resolve the startup status.
    ///
    /// With a cached profile the session becomes Authenticated immediately
    /// and the token is validated in the background; the returned handle
    /// resolves when that validation has been applied. Without a credential
    /// the session is Unauthenticated on return and no task is spawned.
    pub async fn initialize(&self) -> Result<Option<JoinHandle<()>>> {
        let (generation, credential) = self.store.begin_loading()?;

        let Some(credential) = credential else {
            self.store.resolve_empty(generation);
            tracing::info!("No persisted credential, starting signed out");
            return Ok(None);
        };

        match credential.cached_user {
            Some(user) => {
                tracing::info!(
                    username = %user.username,
                    generation,
                    "Restored cached session, validating token"
                );
                self.store.restore(generation, credential.token, user);
            }
            None => {
                tracing::info!(generation, "Persisted token without profile, validating");
            }
        }

        let store = self.store.clone();
        let backend = Arc::clone(&self.backend);
        let handle = tokio::spawn(async move {
            validate(&store, backend.as_ref(), generation).await;
        });

        Ok(Some(handle))
    }

    /// Authenticate once against the server. On failure the previous session
    /// is left exactly as it was.
    pub async fn login(&self, request: &LoginRequest) -> Result<UserProfile> {
        // A grant that could not be applied would only be thrown away
        self.store.ensure_can_establish()?;

        let grant = match self.backend.login(request).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(username = %request.username, error = %e, "Login failed");
                return Err(e);
            }
        };

        let user = grant.user.clone();
        let session = self.store.establish(grant.token, grant.user)?;

        tracing::info!(
            username = %user.username,
            generation = session.generation,
            "Logged in"
        );

        Ok(user)
    }

    /// Tell the server (best effort), then clear everything locally.
    pub async fn logout(&self) {
        if self.store.token().is_some() {
            if let Err(e) = self.backend.logout().await {
                tracing::debug!(error = %e, "Ignoring logout notification failure");
            }
        }

        self.store.sign_out();
        tracing::info!("Logged out");
    }

    /// Local teardown after the server rejected the credential
    pub fn force_invalidate(&self) -> bool {
        self.store.force_invalidate()
    }

    /// Re-validate the current token and refresh the profile.
    ///
    /// Returns the resulting session. Signed-out sessions are returned as-is.
    pub async fn refresh_user(&self) -> Session {
        let current = self.store.snapshot();
        if !current.status.carries_token() || current.token.is_none() {
            return current;
        }

        validate(&self.store, self.backend.as_ref(), current.generation).await;
        self.store.snapshot()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.store.snapshot().user
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.store.events()
    }
}

impl<B> Clone for SessionManager<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            backend: Arc::clone(&self.backend),
        }
    }
}

async fn validate<B: AuthBackend>(store: &SessionStore, backend: &B, generation: u64) {
    match backend.user_info().await {
        Ok(user) => {
            if store.confirm(generation, user) {
                tracing::info!(generation, "Token validated");
            }
        }
        Err(e) => {
            if store.reject(generation) {
                tracing::warn!(generation, error = %e, "Token validation failed, signed out");
            }
        }
    }
}
