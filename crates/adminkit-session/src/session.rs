//! Session data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::SessionStatus;
use crate::user::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub status: SessionStatus,
    /// Bearer token; present while authenticated or while validating
    pub token: Option<String>,
    /// Last known profile
    pub user: Option<UserProfile>,
    /// Bumped whenever an in-flight validation must be discarded
    pub generation: u64,
    /// When this record was published
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn uninitialized() -> Self {
        Self {
            status: SessionStatus::Uninitialized,
            token: None,
            user: None,
            generation: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn loading(generation: u64, token: Option<String>) -> Self {
        Self {
            status: SessionStatus::Loading,
            token,
            user: None,
            generation,
            updated_at: Utc::now(),
        }
    }

    pub fn authenticated(generation: u64, token: String, user: UserProfile) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            token: Some(token),
            user: Some(user),
            generation,
            updated_at: Utc::now(),
        }
    }

    pub fn unauthenticated(generation: u64) -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            token: None,
            user: None,
            generation,
            updated_at: Utc::now(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Uninitialized | SessionStatus::Loading
        )
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::uninitialized()
    }
}

/// Broadcast alongside each publish so views can react to the cause.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Initialization reached its first settled or optimistic status
    Initialized { status: SessionStatus },
    LoggedIn { user: UserProfile },
    LoggedOut,
    /// Server rejected the credential, or validation failed
    Invalidated,
    /// Validation replaced the cached profile with a different one
    ProfileRefreshed {
        previous: Option<UserProfile>,
        current: UserProfile,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserProfile {
        serde_json::from_str(r#"{"Id": 1, "Username": "admin"}"#).unwrap()
    }

    #[test]
    fn test_constructors_hold_invariants() {
        let s = Session::authenticated(3, "t1".to_string(), user());
        assert!(s.is_authenticated());
        assert!(s.token.is_some() && s.user.is_some());
        assert_eq!(s.generation, 3);

        let s = Session::unauthenticated(4);
        assert!(!s.is_authenticated());
        assert!(s.token.is_none() && s.user.is_none());

        let s = Session::loading(1, Some("t1".to_string()));
        assert!(s.is_loading());
        assert!(s.user.is_none());
    }

    #[test]
    fn test_default_is_uninitialized() {
        let s = Session::default();
        assert_eq!(s.status, SessionStatus::Uninitialized);
        assert_eq!(s.generation, 0);
        assert!(s.is_loading());
    }
}
