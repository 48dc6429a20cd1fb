//! Persisted credential backends
//!
//! A credential is two logical keys: the bearer token and the cached user
//! profile (kept as raw JSON so a corrupted profile never blocks the token).
//! Both keys are written and cleared together.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::database::Database;
use crate::Result;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "auth_user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Opaque bearer token
    pub token: String,
    /// Cached user profile as raw JSON
    pub user: Option<String>,
}

impl StoredCredential {
    pub fn new(token: impl Into<String>, user: Option<String>) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

/// Durable storage for the persisted credential.
///
/// `load` only reports a credential when a non-empty token is stored. The
/// profile key can be read and written on its own.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredCredential>>;

    fn save(&self, credential: &StoredCredential) -> Result<()>;

    /// Raw cached profile, whether or not a token is stored
    fn load_user(&self) -> Result<Option<String>>;

    /// Replace the cached profile, leaving the token key alone
    fn save_user(&self, user: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// SQLite-backed store using the `credentials` table.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    db: Database,
}

impl SqliteCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

}

fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM credentials WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

fn put_value(conn: &Connection, key: &str, value: &str, updated_at: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO credentials (key, value, updated_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![key, value, updated_at],
    )?;
    Ok(())
}

impl CredentialStore for SqliteCredentialStore {
    fn load(&self) -> Result<Option<StoredCredential>> {
        // Both keys under one lock
        self.db.with_connection(|conn| {
            let Some(token) = get_value(conn, TOKEN_KEY)?.filter(|t| !t.is_empty()) else {
                return Ok(None);
            };
            let user = get_value(conn, USER_KEY)?;

            Ok(Some(StoredCredential { token, user }))
        })
    }

    fn save(&self, credential: &StoredCredential) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();

        self.db.transaction(|conn| {
            put_value(conn, TOKEN_KEY, &credential.token, &updated_at)?;
            match &credential.user {
                Some(user) => put_value(conn, USER_KEY, user, &updated_at)?,
                None => {
                    conn.execute("DELETE FROM credentials WHERE key = ?1", [USER_KEY])?;
                }
            }
            Ok(())
        })?;

        tracing::debug!("Saved credential");
        Ok(())
    }

    fn load_user(&self) -> Result<Option<String>> {
        self.db.with_connection(|conn| get_value(conn, USER_KEY))
    }

    fn save_user(&self, user: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.db
            .with_connection(|conn| put_value(conn, USER_KEY, user, &updated_at))
    }

    fn clear(&self) -> Result<()> {
        self.db.transaction(|conn| {
            conn.execute(
                "DELETE FROM credentials WHERE key IN (?1, ?2)",
                [TOKEN_KEY, USER_KEY],
            )?;
            Ok(())
        })?;

        tracing::debug!("Cleared credential");
        Ok(())
    }
}

/// Token and profile slots, stored independently
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Slots {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<String>,
}

impl Slots {
    fn credential(&self) -> Option<StoredCredential> {
        let token = self.token.clone().filter(|t| !t.is_empty())?;
        Some(StoredCredential {
            token,
            user: self.user.clone(),
        })
    }
}

/// Process-local store, mainly for tests and ephemeral clients.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Mutex<Slots>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a credential, as if left by a previous run
    pub fn with_credential(credential: StoredCredential) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Slots {
                token: Some(credential.token),
                user: credential.user,
            })),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<StoredCredential>> {
        Ok(self.inner.lock().credential())
    }

    fn save(&self, credential: &StoredCredential) -> Result<()> {
        *self.inner.lock() = Slots {
            token: Some(credential.token.clone()),
            user: credential.user.clone(),
        };
        Ok(())
    }

    fn load_user(&self) -> Result<Option<String>> {
        Ok(self.inner.lock().user.clone())
    }

    fn save_user(&self, user: &str) -> Result<()> {
        self.inner.lock().user = Some(user.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock() = Slots::default();
        Ok(())
    }
}

/// Single JSON file; writes go through a temp file and rename.
#[derive(Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<Slots> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Slots::default()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Slots>(&content) {
            Ok(slots) => Ok(slots),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable credential file");
                Ok(Slots::default())
            }
        }
    }

    fn write_slots(&self, slots: &Slots) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(slots)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredCredential>> {
        Ok(self.read_slots()?.credential())
    }

    fn save(&self, credential: &StoredCredential) -> Result<()> {
        self.write_slots(&Slots {
            token: Some(credential.token.clone()),
            user: credential.user.clone(),
        })
    }

    fn load_user(&self) -> Result<Option<String>> {
        Ok(self.read_slots()?.user)
    }

    fn save_user(&self, user: &str) -> Result<()> {
        let mut slots = self.read_slots()?;
        slots.user = Some(user.to_string());
        self.write_slots(&slots)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
