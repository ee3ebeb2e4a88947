//! Leaderboard query and row types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::domain::{CurioError, MicroCurio, Result};
use crate::store::month_key;

/// Candidate set for a ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "circle_id", rename_all = "lowercase")]
pub enum Scope {
    Global,
    /// Current members of one circle
    Circle(String),
}

impl Scope {
    pub(crate) fn circle_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Circle(id) => Some(id),
        }
    }
}

/// One UTC calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CurioError::InvalidInput(format!("month {month} is not 1-12")));
        }
        if !(1970..=9999).contains(&year) {
            return Err(CurioError::InvalidInput(format!("year {year} is out of range")));
        }
        Ok(Self { year, month })
    }

    /// The month containing `now`
    pub fn containing(now: DateTime<Utc>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    pub fn bucket(&self) -> String {
        month_key(self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bucket())
    }
}

impl FromStr for Period {
    type Err = CurioError;

    /// Parses `YYYY-MM`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CurioError::InvalidInput(format!("period '{s}' is not YYYY-MM"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

/// One account's standing in a period.
///
/// `rank` and `percentile` are `None` when the account has no ledger
/// activity in the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub account_id: String,
    pub display_name: Option<String>,
    pub period_balance_micro: MicroCurio,
    pub quiz_pass_count: u32,
    pub rank: Option<u32>,
    pub percentile: Option<u32>,
    pub is_eligible: bool,
    pub is_top_percentile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    pub scope: Scope,
    pub period: Period,
    /// Ranked accounts before `limit` was applied
    pub total_ranked: u32,
    pub rows: Vec<LeaderboardRow>,
}

/// `100 * (total - rank) / (total - 1)`, floored; 100 for a field of one.
pub fn percentile(rank: u32, total: u32) -> u32 {
    if total <= 1 {
        return 100;
    }
    let rank = rank.clamp(1, total);
    let pct = 100 * u64::from(total - rank) / u64::from(total - 1);
    // Bounded by 100
    pct as u32
}
