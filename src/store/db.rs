//! SQLite connection and schema management
//!
//! One connection behind a mutex per process. Every write runs inside a
//! `BEGIN IMMEDIATE` transaction so other processes wait on SQLite's write
//! lock instead of interleaving with a half-applied award.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::domain::{CurioError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database wrapper shared by all stores
#[derive(Clone)]
pub struct CurioDb {
    conn: Arc<Mutex<Connection>>,
}

impl CurioDb {
    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CurioError::Unavailable(format!("create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)?;

        // WAL lets leaderboard reads proceed while an award commits
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::from_connection(conn)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CurioError::Unavailable("database lock poisoned".into()))
    }

    /// Run `f` in one immediate write transaction; rolls back on error.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Run `f` against one consistent read snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let out = f(&tx)?;
        tx.finish()?;
        Ok(out)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        self.run_migrations()
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: keep the raw trigger context next to each ledger entry
        if version < 2 {
            let has_context: bool = conn
                .prepare(
                    "SELECT COUNT(*) FROM pragma_table_info('ledger_entries')
                     WHERE name = 'context'",
                )
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_context {
                conn.execute_batch("ALTER TABLE ledger_entries ADD COLUMN context TEXT;")?;
            }
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
            debug!("applied schema migration 2");
        }

        Ok(())
    }
}

/// SQL schema for the Curio database
const SCHEMA_SQL: &str = r#"
-- Cached per-account totals (kept in step with ledger_entries)
CREATE TABLE IF NOT EXISTS accounts (
    account_id TEXT PRIMARY KEY,
    display_name TEXT,
    balance_micro INTEGER NOT NULL DEFAULT 0,
    title TEXT NOT NULL,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_checkin_day TEXT,
    last_activity_day TEXT,
    quizzes_passed INTEGER NOT NULL DEFAULT 0,
    perfect_quizzes INTEGER NOT NULL DEFAULT 0,
    teach_backs_passed INTEGER NOT NULL DEFAULT 0,
    questions_asked INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Append-only award ledger; idempotency_key is the exactly-once guard
CREATE TABLE IF NOT EXISTS ledger_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id TEXT NOT NULL REFERENCES accounts(account_id),
    kind TEXT NOT NULL,
    amount_micro INTEGER NOT NULL,
    idempotency_key TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL,
    day_bucket TEXT NOT NULL,
    month_bucket TEXT NOT NULL,
    breakdown TEXT NOT NULL DEFAULT '[]',
    context TEXT
);
CREATE INDEX IF NOT EXISTS idx_ledger_account ON ledger_entries(account_id, created_at);
CREATE INDEX IF NOT EXISTS idx_ledger_month ON ledger_entries(month_bucket, account_id);

-- One row per account per UTC day with a granted check-in
CREATE TABLE IF NOT EXISTS checkins (
    account_id TEXT NOT NULL REFERENCES accounts(account_id),
    day TEXT NOT NULL,
    ledger_entry_id INTEGER NOT NULL REFERENCES ledger_entries(id),
    PRIMARY KEY (account_id, day)
);

-- Circles and their rosters
CREATE TABLE IF NOT EXISTS circles (
    circle_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    invite_code TEXT NOT NULL UNIQUE,
    owner_id TEXT NOT NULL REFERENCES accounts(account_id),
    member_cap INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS circle_members (
    circle_id TEXT NOT NULL REFERENCES circles(circle_id) ON DELETE CASCADE,
    account_id TEXT NOT NULL REFERENCES accounts(account_id),
    role TEXT NOT NULL CHECK (role IN ('owner', 'admin', 'member')),
    joined_at INTEGER NOT NULL,
    PRIMARY KEY (circle_id, account_id)
);
CREATE INDEX IF NOT EXISTS idx_circle_members_account ON circle_members(account_id);

-- Audit trail of profile resets
CREATE TABLE IF NOT EXISTS account_resets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id TEXT NOT NULL REFERENCES accounts(account_id),
    reset_at INTEGER NOT NULL,
    balance_before INTEGER NOT NULL,
    balance_after INTEGER NOT NULL,
    reason TEXT
);

-- Schema version (fresh databases start at the latest version)
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT INTO schema_version SELECT 2 WHERE NOT EXISTS (SELECT 1 FROM schema_version);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db = CurioDb::open(&dir.path().join("curio.db")).unwrap();

        let tables: Vec<String> = db
            .read(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table'")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok(rows.filter_map(|r| r.ok()).collect())
            })
            .unwrap();

        for table in ["accounts", "ledger_entries", "checkins", "circles", "circle_members"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("curio.db");
        drop(CurioDb::open(&path).unwrap());
        let db = CurioDb::open(&path).unwrap();
        let version: i32 = db
            .read(|conn| {
                Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let db = CurioDb::open_in_memory().unwrap();
        let result: Result<()> = db.write(|tx| {
            tx.execute(
                "INSERT INTO accounts (account_id, title, created_at, updated_at)
                 VALUES ('a', 't', 0, 0)",
                [],
            )?;
            Err(CurioError::InvalidInput("boom".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }
}
