//! Persisted records
//!
//! These structures represent the rows stored in and read from the Curio
//! database.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CurioError, EventKind, MicroCurio};
use crate::progress::StreakInfo;
use crate::scoring::BreakdownTerm;

/// One learner's cached totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub display_name: Option<String>,
    pub balance_micro: MicroCurio,
    pub title: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_checkin_day: Option<NaiveDate>,
    pub last_activity_day: Option<NaiveDate>,

    // Auxiliary counters, kept in step with the ledger
    pub quizzes_passed: u32,
    pub perfect_quizzes: u32,
    pub teach_backs_passed: u32,
    pub questions_asked: u32,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Account {
    pub fn streak(&self) -> StreakInfo {
        StreakInfo {
            current: self.current_streak,
            longest: self.longest_streak,
            last_checkin: self.last_checkin_day,
        }
    }
}

/// Immutable record of one award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub account_id: String,
    pub kind: EventKind,
    pub amount_micro: MicroCurio,
    pub idempotency_key: String,
    /// Milliseconds since epoch (UTC)
    pub created_at: i64,
    pub breakdown: Vec<BreakdownTerm>,
}

/// Ledger row to be appended
#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub account_id: &'a str,
    pub kind: EventKind,
    pub amount_micro: MicroCurio,
    pub idempotency_key: &'a str,
    pub created_at: i64,
    pub breakdown: &'a [BreakdownTerm],
    /// Raw trigger context, kept for audit
    pub context_json: Option<String>,
}

/// Result of an idempotent append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Applied { entry_id: i64 },
    /// An entry with this idempotency key already exists
    Duplicate,
}

/// One daily check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinRecord {
    pub account_id: String,
    pub day: NaiveDate,
    pub ledger_entry_id: i64,
}

/// Role inside a circle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircleRole {
    Owner,
    Admin,
    Member,
}

impl CircleRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CurioError> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(CurioError::InvalidInput(format!("unknown circle role '{other}'"))),
        }
    }
}

/// Invite-coded sub-group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub circle_id: String,
    pub name: String,
    pub invite_code: String,
    pub owner_id: String,
    pub member_cap: u32,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleMember {
    pub circle_id: String,
    pub account_id: String,
    pub role: CircleRole,
    pub joined_at: i64,
}

/// Audit row written by a profile reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReset {
    pub account_id: String,
    pub reset_at: i64,
    pub balance_before: MicroCurio,
    pub balance_after: MicroCurio,
    pub reason: Option<String>,
}
