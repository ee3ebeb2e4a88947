//! Account rows
//!
//! Accounts are created on first authentication and afterwards only
//! mutated inside award, reset and reconcile transactions.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use super::db::CurioDb;
use super::models::Account;
use super::time_bucket::parse_day_bucket;
use crate::domain::{CurioError, Result};
use crate::progress::resolve_title;

const ACCOUNT_COLUMNS: &str = "account_id, display_name, balance_micro, title, \
    current_streak, longest_streak, last_checkin_day, last_activity_day, quizzes_passed, \
    perfect_quizzes, teach_backs_passed, questions_asked, created_at, updated_at";

/// Account lookups and creation
#[derive(Clone)]
pub struct AccountStore {
    db: CurioDb,
}

impl AccountStore {
    pub fn new(db: CurioDb) -> Self {
        Self { db }
    }

    /// Create the account if it does not exist yet, then return it.
    pub fn ensure_account(&self, account_id: &str, display_name: Option<&str>) -> Result<Account> {
        validate_account_id(account_id)?;
        let now = Utc::now().timestamp_millis();
        self.db.write(|tx| {
            let inserted = tx.execute(
                "INSERT INTO accounts (account_id, display_name, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(account_id) DO NOTHING",
                params![account_id, display_name, resolve_title(0), now],
            )?;
            if inserted > 0 {
                info!(account_id, "account created");
            }
            require_account(tx, account_id)
        })
    }

    pub fn get(&self, account_id: &str) -> Result<Account> {
        self.db.read(|conn| require_account(conn, account_id))
    }

    pub fn find(&self, account_id: &str) -> Result<Option<Account>> {
        self.db.read(|conn| load_account(conn, account_id))
    }

    /// All accounts, highest balance first
    pub fn list(&self) -> Result<Vec<Account>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY balance_micro DESC, account_id"
            ))?;
            let rows = stmt.query_map([], row_to_account)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

/// Account ids end up inside `:`-separated idempotency keys.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    if account_id.trim().is_empty() {
        return Err(CurioError::InvalidInput("account id is empty".into()));
    }
    if account_id.contains(':') {
        return Err(CurioError::InvalidInput(format!(
            "account id '{account_id}' must not contain ':'"
        )));
    }
    Ok(())
}

fn load_account(conn: &Connection, account_id: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
            [account_id],
            row_to_account,
        )
        .optional()?;
    Ok(account)
}

pub(crate) fn require_account(conn: &Connection, account_id: &str) -> Result<Account> {
    load_account(conn, account_id)?
        .ok_or_else(|| CurioError::NotFound(format!("account {account_id}")))
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    let last_checkin: Option<String> = row.get(6)?;
    let last_activity: Option<String> = row.get(7)?;
    Ok(Account {
        account_id: row.get(0)?,
        display_name: row.get(1)?,
        balance_micro: row.get(2)?,
        title: row.get(3)?,
        current_streak: row.get(4)?,
        longest_streak: row.get(5)?,
        last_checkin_day: last_checkin.as_deref().and_then(parse_day_bucket),
        last_activity_day: last_activity.as_deref().and_then(parse_day_bucket),
        quizzes_passed: row.get(8)?,
        perfect_quizzes: row.get(9)?,
        teach_backs_passed: row.get(10)?,
        questions_asked: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_account_is_idempotent() {
        let store = AccountStore::new(CurioDb::open_in_memory().unwrap());
        let first = store.ensure_account("ada", Some("Ada")).unwrap();
        let second = store.ensure_account("ada", Some("Someone else")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.balance_micro, 0);
        assert_eq!(first.title, "Curious Mind");
        assert_eq!(first.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_unknown_account_not_found() {
        let store = AccountStore::new(CurioDb::open_in_memory().unwrap());
        assert!(matches!(store.get("ghost"), Err(CurioError::NotFound(_))));
        assert!(store.find("ghost").unwrap().is_none());
    }

    #[test]
    fn test_account_id_validation() {
        let store = AccountStore::new(CurioDb::open_in_memory().unwrap());
        assert!(store.ensure_account("", None).is_err());
        assert!(store.ensure_account("a:b", None).is_err());
    }
}
