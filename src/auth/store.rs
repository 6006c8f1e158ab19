//! Persisted session store.
//!
//! Holds exactly two string entries: the raw bearer token and the
//! JSON-serialized user record. No validation happens here; callers
//! parse and check what they read back.
//!
//! Backends:
//! - [`MemorySessionStore`]: process-local, used by tests
//! - [`SqliteSessionStore`]: durable, one `session_kv` table

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::Path;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// Raw persisted session, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    /// Serialized user record. Not guaranteed to parse.
    pub user: String,
}

/// Durable key/value medium for the session.
///
/// `read` never fails on missing keys: it returns `Ok(None)`. A token
/// without a user record (or the reverse) also reads as empty.
pub trait SessionStore: Send + Sync {
    fn read(&self) -> Result<Option<StoredSession>>;

    /// Persist token and user together.
    fn write(&self, token: &str, user: &str) -> Result<()>;

    /// Remove both entries. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

// ── In-memory ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a session, as if left by a previous run.
    pub fn with_session(token: &str, user: &str) -> Self {
        Self {
            inner: Mutex::new(Some(StoredSession {
                token: token.to_string(),
                user: user.to_string(),
            })),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> Result<Option<StoredSession>> {
        Ok(self
            .inner
            .lock()
            .clone()
            .filter(|s| !s.token.is_empty() && !s.user.is_empty()))
    }

    fn write(&self, token: &str, user: &str) -> Result<()> {
        *self.inner.lock() = Some(StoredSession {
            token: token.to_string(),
            user: user.to_string(),
        });
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock() = None;
        Ok(())
    }
}

// ── SQLite ───────────────────────────────────────────────────────

/// SQLite-backed session store.
pub struct SqliteSessionStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteSessionStore {
    /// Open (or create) the session database at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating session dir {}", parent.display()))?;
        }

        let conn = rusqlite::Connection::open(db_path)
            .with_context(|| format!("opening session store {}", db_path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;

             CREATE TABLE IF NOT EXISTS session_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
             );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn get(conn: &rusqlite::Connection, key: &str) -> Result<Option<String>> {
        let row = conn.query_row(
            "SELECT value FROM session_kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get::<_, String>(0),
        );

        match row {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl SessionStore for SqliteSessionStore {
    fn read(&self) -> Result<Option<StoredSession>> {
        let conn = self.conn.lock();
        let token = Self::get(&conn, TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user = Self::get(&conn, USER_KEY)?.filter(|u| !u.is_empty());

        Ok(match (token, user) {
            (Some(token), Some(user)) => Some(StoredSession { token, user }),
            _ => None,
        })
    }

    fn write(&self, token: &str, user: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for (key, value) in [(TOKEN_KEY, token), (USER_KEY, user)] {
            tx.execute(
                "INSERT INTO session_kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                rusqlite::params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM session_kv WHERE key IN (?1, ?2)",
            rusqlite::params![TOKEN_KEY, USER_KEY],
        )?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
