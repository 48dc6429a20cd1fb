//! Database connection and operations

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode so a second client process can read while we write
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        tracing::debug!(path = %path.display(), "Opened credential database");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 =
                conn.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO credentials (key, value, updated_at) VALUES ('k', 'v', 'now')",
                [],
            )?;
            Err(rusqlite::Error::QueryReturnedNoRows.into())
        });
        assert!(result.is_err());

        db.with_connection(|conn| {
            let count: i32 =
                conn.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("adminkit-db-{}", std::process::id()));
        let path = dir.join("nested").join("adminkit.db");
        let _ = std::fs::remove_dir_all(&dir);

        let db = Database::open(&path).unwrap();
        drop(db);
        assert!(path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
