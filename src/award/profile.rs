//! Account summary, profile reset and streak reconciliation
//!
//! A reset is an audited recomputation of the cached account fields from
//! the canonical ledger kinds. Ledger rows are left untouched.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use serde::Serialize;
use tracing::info;

use super::save_account;
use crate::domain::{EventKind, MicroCurio, Result};
use crate::progress::{
    StreakInfo, StreakState, Title, TitleProgress, next_title_progress, recompute_from_history,
};
use crate::store::ledger::{checkin_days, perfect_quiz_count, totals_by_kind};
use crate::store::{Account, AccountReset, CurioStore, require_account};

/// Everything a profile view needs about one account
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub account: Account,
    pub next_title: Option<TitleProgress>,
    pub streak_state: StreakState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub account_id: String,
    pub balance_before: MicroCurio,
    pub balance_after: MicroCurio,
    pub title: String,
    pub quizzes_passed: u32,
}

#[derive(Clone)]
pub struct ProfileService {
    store: CurioStore,
}

impl ProfileService {
    pub fn new(store: CurioStore) -> Self {
        Self { store }
    }

    pub fn summary(&self, account_id: &str, today: NaiveDate) -> Result<AccountSummary> {
        let account = self.store.accounts().get(account_id)?;
        Ok(AccountSummary {
            next_title: next_title_progress(account.balance_micro),
            streak_state: account.streak().state_at(today),
            account,
        })
    }

    pub fn reset(&self, account_id: &str, reason: Option<&str>) -> Result<ResetReport> {
        self.reset_at(account_id, reason, Utc::now())
    }

    /// Recompute balance and counters from completed courses and sections,
    /// passed quizzes and passed teach-backs. Streaks, check-ins and
    /// engagement counters are cleared.
    pub fn reset_at(
        &self,
        account_id: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ResetReport> {
        let ts = now.timestamp_millis();
        let report = self.store.db().write(|tx| {
            let before = require_account(tx, account_id)?;
            let totals = totals_by_kind(tx, account_id)?;

            let balance: MicroCurio = totals
                .iter()
                .filter(|(kind, _, _)| kind.is_canonical())
                .map(|(_, amount, _)| *amount)
                .sum();
            let count_of = |wanted: EventKind| {
                totals
                    .iter()
                    .find(|(kind, _, _)| *kind == wanted)
                    .map_or(0, |(_, _, count)| *count)
            };

            let after = Account {
                balance_micro: balance,
                title: Title::for_balance(balance).name.to_string(),
                current_streak: 0,
                longest_streak: 0,
                last_checkin_day: None,
                quizzes_passed: count_of(EventKind::QuizPassed),
                perfect_quizzes: perfect_quiz_count(tx, account_id)?,
                teach_backs_passed: count_of(EventKind::TeachBackBonus),
                questions_asked: 0,
                updated_at: ts,
                ..before.clone()
            };

            tx.execute("DELETE FROM checkins WHERE account_id = ?1", [account_id])?;
            save_account(tx, &after)?;
            tx.execute(
                "INSERT INTO account_resets
                    (account_id, reset_at, balance_before, balance_after, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![account_id, ts, before.balance_micro, after.balance_micro, reason],
            )?;

            Ok(ResetReport {
                account_id: account_id.to_string(),
                balance_before: before.balance_micro,
                balance_after: after.balance_micro,
                title: after.title,
                quizzes_passed: after.quizzes_passed,
            })
        })?;

        info!(
            account_id,
            before = report.balance_before,
            after = report.balance_after,
            "profile reset"
        );
        Ok(report)
    }

    /// Rebuild the cached streak fields from check-in history.
    pub fn reconcile_streak(&self, account_id: &str, today: NaiveDate) -> Result<StreakInfo> {
        let (before, after) = self.store.db().write(|tx| {
            let mut account = require_account(tx, account_id)?;
            let before = account.streak();
            let rebuilt = recompute_from_history(&checkin_days(tx, account_id)?, today);
            if rebuilt != before {
                account.current_streak = rebuilt.current;
                account.longest_streak = rebuilt.longest;
                account.last_checkin_day = rebuilt.last_checkin;
                account.updated_at = Utc::now().timestamp_millis();
                save_account(tx, &account)?;
            }
            Ok((before, rebuilt))
        })?;

        if before != after {
            info!(
                account_id,
                cached = before.current,
                rebuilt = after.current,
                "streak reconciled"
            );
        }
        Ok(after)
    }

    /// Reset audit trail, newest first
    pub fn resets_for(&self, account_id: &str) -> Result<Vec<AccountReset>> {
        self.store.db().read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT account_id, reset_at, balance_before, balance_after, reason
                 FROM account_resets WHERE account_id = ?1 ORDER BY reset_at DESC, id DESC",
            )?;
            let rows = stmt.query_map([account_id], |row| {
                Ok(AccountReset {
                    account_id: row.get(0)?,
                    reset_at: row.get(1)?,
                    balance_before: row.get(2)?,
                    balance_after: row.get(3)?,
                    reason: row.get(4)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::award::AwardService;
    use crate::config::RewardSettings;
    use crate::domain::{ActivityContext, Difficulty, IdempotencyKey};
    use chrono::TimeZone;

    fn setup() -> (CurioStore, AwardService, ProfileService) {
        let store = CurioStore::in_memory().unwrap();
        store.accounts().ensure_account("ada", None).unwrap();
        (
            store.clone(),
            AwardService::new(store.clone(), RewardSettings::default()),
            ProfileService::new(store),
        )
    }

    #[test]
    fn test_reset_keeps_canonical_only() {
        let (store, awards, profile) = setup();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap();
        let none = ActivityContext::default();

        let question = IdempotencyKey::question("ada", "q1");
        awards
            .award_at("ada", EventKind::QuestionAsked, &none, &question, now)
            .unwrap();
        let section = IdempotencyKey::section("ada", "c", "s");
        awards
            .award_at("ada", EventKind::SectionCompleted, &none, &section, now)
            .unwrap();
        awards
            .award_at(
                "ada",
                EventKind::QuizPassed,
                &ActivityContext::quiz(Difficulty::Skim, 100, 1),
                &IdempotencyKey::quiz("ada", "a1"),
                now,
            )
            .unwrap();
        awards.daily_checkin_at("ada", now).unwrap();

        let report = profile.reset_at("ada", Some("user request"), now).unwrap();
        assert_eq!(report.balance_before, 1_000 + 5_000 + 12_000 + 5_000);
        assert_eq!(report.balance_after, 5_000 + 12_000);

        let account = store.accounts().get("ada").unwrap();
        assert_eq!(account.current_streak, 0);
        assert_eq!(account.questions_asked, 0);
        assert_eq!(account.quizzes_passed, 1);
        assert_eq!(account.perfect_quizzes, 1);

        // Audit trail intact: nothing removed from the ledger
        assert_eq!(store.ledger().entries_for("ada").unwrap().len(), 4);
        assert_eq!(profile.resets_for("ada").unwrap().len(), 1);
    }

    #[test]
    fn test_reconcile_streak_from_checkins() {
        let (store, awards, profile) = setup();
        for day in 1..=3 {
            let now = Utc.with_ymd_and_hms(2024, 7, day, 12, 0, 0).unwrap();
            awards.daily_checkin_at("ada", now).unwrap();
        }

        let today = NaiveDate::from_ymd_opt(2024, 7, 3).unwrap();
        let rebuilt = profile.reconcile_streak("ada", today).unwrap();
        assert_eq!(rebuilt.current, 3);
        assert_eq!(rebuilt.longest, 3);

        // A week later the chain is stale
        let later = NaiveDate::from_ymd_opt(2024, 7, 10).unwrap();
        let stale = profile.reconcile_streak("ada", later).unwrap();
        assert_eq!(stale.current, 0);
        assert_eq!(store.accounts().get("ada").unwrap().longest_streak, 3);
    }

    #[test]
    fn test_summary() {
        let (_, _, profile) = setup();
        let summary = profile
            .summary("ada", NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
            .unwrap();
        assert_eq!(summary.streak_state, StreakState::None);
        assert_eq!(summary.next_title.unwrap().required, 25_000);
    }
}
