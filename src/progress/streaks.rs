//! Daily check-in streaks
//!
//! All dates are UTC calendar days. Streak fields on the account are a
//! cache of what the check-in history says; `recompute_from_history` is the
//! only way to rebuild them.

use chrono::NaiveDate;
use serde::Serialize;

/// Streak state at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "days", rename_all = "lowercase")]
pub enum StreakState {
    /// Never checked in
    None,
    Active(u32),
    /// Checked in before, but missed at least one full day
    Broken,
}

/// What a check-in does to the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    /// First check-in after a gap (or ever)
    Started,
    Extended(u32),
    /// Already checked in today (or the day is not after the last check-in)
    Unchanged,
    /// A day before the last check-in was recorded; counters were rebuilt
    Backfilled,
}

/// Streak counters stored on an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakInfo {
    pub current: u32,
    pub longest: u32,
    pub last_checkin: Option<NaiveDate>,
}

impl StreakInfo {
    /// Apply a check-in on `today`.
    pub fn advance(&self, today: NaiveDate) -> (StreakInfo, StreakTransition) {
        let (current, transition) = match self.last_checkin {
            // Same day, or a late-arriving earlier day: never rewinds the streak
            Some(last) if today <= last => return (*self, StreakTransition::Unchanged),
            Some(last) if last.succ_opt() == Some(today) && self.current > 0 => {
                (self.current + 1, StreakTransition::Extended(self.current + 1))
            }
            _ => (1, StreakTransition::Started),
        };

        let next = StreakInfo {
            current,
            longest: self.longest.max(current),
            last_checkin: Some(today),
        };
        (next, transition)
    }

    /// Read-time state. An unbroken chain ending yesterday is still active.
    pub fn state_at(&self, today: NaiveDate) -> StreakState {
        let Some(last) = self.last_checkin else {
            return StreakState::None;
        };
        if self.current == 0 {
            return StreakState::Broken;
        }
        let days_since = (today - last).num_days();
        if (0..=1).contains(&days_since) {
            StreakState::Active(self.current)
        } else {
            StreakState::Broken
        }
    }
}

/// Rebuild streak counters from check-in days.
///
/// `days` may be unsorted and contain duplicates. The current streak only
/// counts if its last day is today or yesterday.
pub fn recompute_from_history(days: &[NaiveDate], today: NaiveDate) -> StreakInfo {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for day in &sorted {
        run = match prev {
            Some(p) if p.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(*day);
    }

    let last_checkin = sorted.last().copied();
    let current = match last_checkin {
        Some(last) if (today - last).num_days() <= 1 => run,
        _ => 0,
    };

    StreakInfo {
        current,
        longest,
        last_checkin,
    }
}
