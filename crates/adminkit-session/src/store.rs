//! Session Store
//!
//! Owns the one `Session` record for a client instance. Writers serialize on
//! a mutex and publish a complete record through a watch channel, so readers
//! never observe a half-applied transition. Persistence happens under the
//! same lock as the publish it belongs to.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::cache::{CredentialCache, PersistedCredential};
use crate::error::SessionError;
use crate::session::{Session, SessionEvent};
use crate::state::SessionStatus;
use crate::user::UserProfile;
use crate::Result;

const EVENT_CAPACITY: usize = 64;

pub struct SessionStore {
    sender: Arc<watch::Sender<Session>>,
    events: broadcast::Sender<SessionEvent>,
    write_lock: Arc<Mutex<()>>,
    cache: CredentialCache,
}

impl SessionStore {
    pub fn new(cache: CredentialCache) -> Self {
        let (sender, _) = watch::channel(Session::uninitialized());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            sender: Arc::new(sender),
            events,
            write_lock: Arc::new(Mutex::new(())),
            cache,
        }
    }

    /// Current session record
    pub fn snapshot(&self) -> Session {
        self.sender.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.sender.borrow().status
    }

    /// Snapshot read of the bearer token
    pub fn token(&self) -> Option<String> {
        self.bearer().1
    }

    /// Generation and bearer token read together, for tagging an outbound
    /// request with the session it was sent under
    pub fn bearer(&self) -> (u64, Option<String>) {
        let session = self.sender.borrow();
        let token = if session.status.carries_token() {
            session.token.clone()
        } else {
            None
        };
        (session.generation, token)
    }

    pub fn generation(&self) -> u64 {
        self.sender.borrow().generation
    }

    pub fn is_authenticated(&self) -> bool {
        self.sender.borrow().is_authenticated()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sender.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Uninitialized -> Loading, reading the persisted credential once.
    ///
    /// Returns the generation the initialization runs under and the
    /// credential that was found.
    pub(crate) fn begin_loading(&self) -> Result<(u64, Option<PersistedCredential>)> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        ensure_transition(current.status, SessionStatus::Loading)?;

        let credential = self.cache.load()?;
        let generation = current.generation + 1;
        self.publish(Session::loading(
            generation,
            credential.as_ref().map(|c| c.token.clone()),
        ));

        Ok((generation, credential))
    }

    /// Loading -> Authenticated from the cached profile, before the server
    /// has confirmed the token.
    pub(crate) fn restore(&self, generation: u64, token: String, user: UserProfile) -> bool {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        if current.generation != generation || current.status != SessionStatus::Loading {
            return false;
        }

        self.publish(Session::authenticated(generation, token, user));
        self.emit(SessionEvent::Initialized {
            status: SessionStatus::Authenticated,
        });
        true
    }

    /// Loading -> Unauthenticated when nothing was persisted
    pub(crate) fn resolve_empty(&self, generation: u64) -> bool {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        if current.generation != generation || current.status != SessionStatus::Loading {
            return false;
        }

        self.publish(Session::unauthenticated(generation));
        self.emit(SessionEvent::Initialized {
            status: SessionStatus::Unauthenticated,
        });
        true
    }

    /// Whether a login could be applied right now
    pub(crate) fn ensure_can_establish(&self) -> Result<()> {
        ensure_transition(self.status(), SessionStatus::Authenticated)
    }

    /// A fresh login: persist first, publish only if persisting succeeded.
    pub(crate) fn establish(&self, token: String, user: UserProfile) -> Result<Session> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();

        // From Loading this supersedes the in-flight validation
        ensure_transition(current.status, SessionStatus::Authenticated)?;

        self.cache.persist(&token, &user)?;

        let session = Session::authenticated(current.generation + 1, token, user.clone());
        self.publish(session.clone());
        self.emit(SessionEvent::LoggedIn { user });

        Ok(session)
    }

    /// Validation succeeded for `generation`. Returns false when the session
    /// moved on while the validation was in flight.
    pub(crate) fn confirm(&self, generation: u64, user: UserProfile) -> bool {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        if current.generation != generation || !current.status.carries_token() {
            tracing::debug!(
                generation,
                current = current.generation,
                "Discarding stale validation result"
            );
            return false;
        }
        let Some(token) = current.token.clone() else {
            return false;
        };

        if let Err(e) = self.cache.persist(&token, &user) {
            tracing::warn!(error = %e, "Failed to re-persist validated credential");
        }

        let was_loading = current.status == SessionStatus::Loading;
        let previous = current.user.clone();
        self.publish(Session::authenticated(generation, token, user.clone()));

        if was_loading {
            self.emit(SessionEvent::Initialized {
                status: SessionStatus::Authenticated,
            });
        }
        if previous.as_ref() != Some(&user) && !(was_loading && previous.is_none()) {
            self.emit(SessionEvent::ProfileRefreshed {
                previous,
                current: user,
            });
        }
        true
    }

    /// Validation failed for `generation`
    pub(crate) fn reject(&self, generation: u64) -> bool {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        if current.generation != generation || !current.status.carries_token() {
            return false;
        }

        self.clear_locked(&current, SessionEvent::Invalidated);
        true
    }

    /// Local teardown for logout. Always lands in Unauthenticated (once
    /// initialized) and always clears the persisted credential.
    pub(crate) fn sign_out(&self) {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();

        match current.status {
            SessionStatus::Uninitialized | SessionStatus::Unauthenticated => {
                if let Err(e) = self.cache.clear() {
                    tracing::error!(error = %e, "Failed to clear persisted credential");
                }
            }
            SessionStatus::Loading | SessionStatus::Authenticated => {
                self.clear_locked(&current, SessionEvent::LoggedOut);
            }
        }
    }

    /// Server-driven teardown. Idempotent: returns false when there was no
    /// live session to invalidate.
    pub fn force_invalidate(&self) -> bool {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        self.invalidate_locked(&current)
    }

    /// Like [`force_invalidate`](Self::force_invalidate), but only while the
    /// session is still at `generation`. A rejection of a request sent under
    /// an earlier session leaves a newer one alone.
    pub fn force_invalidate_if(&self, generation: u64) -> bool {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        if current.generation != generation {
            tracing::debug!(
                generation,
                current = current.generation,
                "Ignoring rejection for a superseded session"
            );
            return false;
        }
        self.invalidate_locked(&current)
    }

    fn invalidate_locked(&self, current: &Session) -> bool {
        if !current.status.carries_token() {
            return false;
        }

        tracing::warn!(generation = current.generation, "Session invalidated by server");
        self.clear_locked(current, SessionEvent::Invalidated);
        true
    }

    fn clear_locked(&self, current: &Session, event: SessionEvent) {
        if let Err(e) = self.cache.clear() {
            tracing::error!(error = %e, "Failed to clear persisted credential");
        }
        self.publish(Session::unauthenticated(current.generation + 1));
        self.emit(event);
    }

    fn publish(&self, session: Session) {
        tracing::debug!(
            status = %session.status,
            generation = session.generation,
            "Publishing session"
        );
        self.sender.send_replace(session);
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            events: self.events.clone(),
            write_lock: Arc::clone(&self.write_lock),
            cache: self.cache.clone(),
        }
    }
}

fn ensure_transition(from: SessionStatus, to: SessionStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(SessionError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
