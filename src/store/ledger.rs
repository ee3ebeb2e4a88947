//! Append-only award ledger and check-in records
//!
//! Ledger rows are never updated or deleted. The UNIQUE constraint on
//! `idempotency_key` is what makes a retried award a no-op.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::db::CurioDb;
use super::models::{AppendOutcome, CheckinRecord, LedgerEntry, NewLedgerEntry};
use super::time_bucket::{date_key, day_bucket, month_bucket, parse_day_bucket};
use crate::domain::{EventKind, MicroCurio, Result};

const ENTRY_COLUMNS: &str =
    "id, account_id, kind, amount_micro, idempotency_key, created_at, breakdown";

/// Read-only access to the ledger for audit and support tooling
#[derive(Clone)]
pub struct LedgerStore {
    db: CurioDb,
}

impl LedgerStore {
    pub fn new(db: CurioDb) -> Self {
        Self { db }
    }

    /// Every entry for an account, oldest first
    pub fn entries_for(&self, account_id: &str) -> Result<Vec<LedgerEntry>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM ledger_entries
                 WHERE account_id = ?1 ORDER BY created_at, id"
            ))?;
            let rows = stmt.query_map([account_id], row_to_entry)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn entry_by_key(&self, key: &str) -> Result<Option<LedgerEntry>> {
        self.db.read(|conn| find_by_key(conn, key))
    }

    /// Lifetime ledger total for an account
    pub fn lifetime_total(&self, account_id: &str) -> Result<MicroCurio> {
        self.db.read(|conn| {
            Ok(conn.query_row(
                "SELECT COALESCE(SUM(amount_micro), 0) FROM ledger_entries WHERE account_id = ?1",
                [account_id],
                |r| r.get(0),
            )?)
        })
    }

    pub fn checkins_for(&self, account_id: &str) -> Result<Vec<CheckinRecord>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT account_id, day, ledger_entry_id FROM checkins
                 WHERE account_id = ?1 ORDER BY day",
            )?;
            let rows = stmt.query_map([account_id], |row| {
                let day: String = row.get(1)?;
                Ok(CheckinRecord {
                    account_id: row.get(0)?,
                    day: parse_day_bucket(&day).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            Type::Text,
                            format!("bad day bucket '{day}'").into(),
                        )
                    })?,
                    ledger_entry_id: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

/// Insert an entry unless its idempotency key is already taken.
pub(crate) fn append(conn: &Connection, entry: &NewLedgerEntry<'_>) -> Result<AppendOutcome> {
    let breakdown = serde_json::to_string(entry.breakdown)?;
    let inserted = conn.execute(
        "INSERT INTO ledger_entries
            (account_id, kind, amount_micro, idempotency_key, created_at,
             day_bucket, month_bucket, breakdown, context)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(idempotency_key) DO NOTHING",
        params![
            entry.account_id,
            entry.kind.as_str(),
            entry.amount_micro,
            entry.idempotency_key,
            entry.created_at,
            day_bucket(entry.created_at),
            month_bucket(entry.created_at),
            breakdown,
            entry.context_json,
        ],
    )?;

    if inserted == 0 {
        return Ok(AppendOutcome::Duplicate);
    }
    Ok(AppendOutcome::Applied {
        entry_id: conn.last_insert_rowid(),
    })
}

pub(crate) fn find_by_key(conn: &Connection, key: &str) -> Result<Option<LedgerEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE idempotency_key = ?1"),
            [key],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

/// Record a check-in day. Returns false if the day was already recorded.
pub(crate) fn record_checkin(
    conn: &Connection,
    account_id: &str,
    day: NaiveDate,
    ledger_entry_id: i64,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO checkins (account_id, day, ledger_entry_id) VALUES (?1, ?2, ?3)
         ON CONFLICT(account_id, day) DO NOTHING",
        params![account_id, date_key(day), ledger_entry_id],
    )?;
    Ok(inserted > 0)
}

pub(crate) fn checkin_exists(conn: &Connection, account_id: &str, day: NaiveDate) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM checkins WHERE account_id = ?1 AND day = ?2",
            params![account_id, date_key(day)],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn checkin_days(conn: &Connection, account_id: &str) -> Result<Vec<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT day FROM checkins WHERE account_id = ?1 ORDER BY day")?;
    let days = stmt
        .query_map([account_id], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .filter_map(|day| parse_day_bucket(&day))
        .collect();
    Ok(days)
}

/// Per-kind totals for an account: (kind, amount, entry count)
pub(crate) fn totals_by_kind(
    conn: &Connection,
    account_id: &str,
) -> Result<Vec<(EventKind, MicroCurio, u32)>> {
    let mut stmt = conn.prepare(
        "SELECT kind, COALESCE(SUM(amount_micro), 0), COUNT(*) FROM ledger_entries
         WHERE account_id = ?1 GROUP BY kind",
    )?;
    let rows = stmt.query_map([account_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, MicroCurio>(1)?, row.get::<_, u32>(2)?))
    })?;

    let mut totals = Vec::new();
    for row in rows {
        let (kind, amount, count) = row?;
        // Kinds no longer known to this build are skipped rather than failing the read
        if let Ok(kind) = kind.parse::<EventKind>() {
            totals.push((kind, amount, count));
        }
    }
    Ok(totals)
}

/// Quiz passes recorded with a 100% score
pub(crate) fn perfect_quiz_count(conn: &Connection, account_id: &str) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM ledger_entries
         WHERE account_id = ?1 AND kind = 'quiz_passed'
           AND json_extract(context, '$.score_percent') = 100",
        [account_id],
        |r| r.get(0),
    )?)
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let kind: String = row.get(2)?;
    let breakdown: String = row.get(6)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        account_id: row.get(1)?,
        kind: kind
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        amount_micro: row.get(3)?,
        idempotency_key: row.get(4)?,
        created_at: row.get(5)?,
        breakdown: serde_json::from_str(&breakdown)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
    })
}
