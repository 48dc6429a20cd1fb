//! Session State Machine
//!
//! ```text
//! Uninitialized
//!   ↓ initialize
//! Loading ──────────────┐
//!   ↓ cached profile    ↓ no credential / validation failed
//! Authenticated ⇄ Unauthenticated
//!        login / logout / force-invalidate
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Process just started, nothing read yet
    Uninitialized,
    /// Persisted credential is being read or validated
    Loading,
    /// Token and profile are both present
    Authenticated,
    /// Token and profile are both absent
    Unauthenticated,
}

impl SessionStatus {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        use SessionStatus::*;

        match (self, target) {
            (Uninitialized, Loading) => true,
            // Initialization resolves exactly once
            (Loading, Authenticated) => true,
            (Loading, Unauthenticated) => true,
            (Authenticated, Unauthenticated) => true,
            (Unauthenticated, Authenticated) => true,
            // Re-login or profile refresh replaces the session in place
            (Authenticated, Authenticated) => true,
            _ => false,
        }
    }

    /// Whether a bearer token may be attached to outbound requests
    pub fn carries_token(&self) -> bool {
        matches!(self, SessionStatus::Loading | SessionStatus::Authenticated)
    }

    /// Whether initialization has resolved
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SessionStatus::Authenticated | SessionStatus::Unauthenticated
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Uninitialized => "uninitialized",
            SessionStatus::Loading => "loading",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Unauthenticated => "unauthenticated",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uninitialized" => Ok(SessionStatus::Uninitialized),
            "loading" => Ok(SessionStatus::Loading),
            "authenticated" => Ok(SessionStatus::Authenticated),
            "unauthenticated" => Ok(SessionStatus::Unauthenticated),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    #[test]
    fn test_valid_transitions() {
        assert!(Uninitialized.can_transition_to(Loading));
        assert!(Loading.can_transition_to(Authenticated));
        assert!(Loading.can_transition_to(Unauthenticated));
        assert!(Authenticated.can_transition_to(Unauthenticated));
        assert!(Unauthenticated.can_transition_to(Authenticated));
        assert!(Authenticated.can_transition_to(Authenticated));
    }

    #[test]
    fn test_invalid_transitions() {
        // No oscillation back into Loading
        assert!(!Authenticated.can_transition_to(Loading));
        assert!(!Unauthenticated.can_transition_to(Loading));
        assert!(!Loading.can_transition_to(Loading));
        // Must initialize before anything else
        assert!(!Uninitialized.can_transition_to(Authenticated));
        assert!(!Uninitialized.can_transition_to(Unauthenticated));
        assert!(!Authenticated.can_transition_to(Uninitialized));
    }

    #[test]
    fn test_parse_round_trip() {
        for status in [Uninitialized, Loading, Authenticated, Unauthenticated] {
            assert_eq!(status.as_str().parse::<SessionStatus>(), Ok(status));
        }
        assert!("expired".parse::<SessionStatus>().is_err());
    }
}
