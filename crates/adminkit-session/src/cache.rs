//! Typed view over the credential store
//!
//! The store keeps the profile as raw JSON. A profile that no longer decodes
//! is treated as absent rather than as an error.

use std::sync::Arc;

use adminkit_storage::{CredentialStore, StoredCredential};

use crate::user::UserProfile;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedCredential {
    pub token: String,
    pub cached_user: Option<UserProfile>,
}

#[derive(Clone)]
pub struct CredentialCache {
    store: Arc<dyn CredentialStore>,
}

impl CredentialCache {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Option<PersistedCredential>> {
        let Some(stored) = self.store.load()? else {
            return Ok(None);
        };

        let cached_user = stored.user.as_deref().and_then(decode_user);
        Ok(Some(PersistedCredential {
            token: stored.token,
            cached_user,
        }))
    }

    /// Write token and profile together
    pub fn persist(&self, token: &str, user: &UserProfile) -> Result<()> {
        let user_json = serde_json::to_string(user)?;
        self.store
            .save(&StoredCredential::new(token, Some(user_json)))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        Ok(self.store.clear()?)
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.store.load()?.map(|c| c.token))
    }

    pub fn get_cached_user(&self) -> Option<UserProfile> {
        match self.store.load_user() {
            Ok(raw) => raw.as_deref().and_then(decode_user),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached user");
                None
            }
        }
    }

    /// Replace the cached profile, keeping whatever token is stored
    pub fn set_cached_user(&self, user: &UserProfile) -> Result<()> {
        let user_json = serde_json::to_string(user)?;
        self.store.save_user(&user_json)?;
        Ok(())
    }
}

fn decode_user(raw: &str) -> Option<UserProfile> {
    match serde_json::from_str(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding corrupted cached user");
            None
        }
    }
}
