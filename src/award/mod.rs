//! Award service
//!
//! validate -> score -> idempotent ledger append -> balance/title/counters/streak
//! update, all inside one immediate SQLite transaction. The ledger's unique
//! idempotency key is the only guard against double grants; a duplicate
//! request returns the current state with `already_granted = true`.

mod profile;

pub use profile::{AccountSummary, ProfileService, ResetReport};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RewardSettings;
use crate::domain::{ActivityContext, CurioError, EventKind, IdempotencyKey, MicroCurio, Result};
use crate::progress::{StreakInfo, StreakTransition, Title, recompute_from_history};
use crate::scoring::{BreakdownTerm, ScoredAward, compute_award};
use crate::store::ledger::{self, checkin_exists};
use crate::store::{Account, AppendOutcome, CurioStore, NewLedgerEntry, date_key, require_account};

/// Outcome reported back to the activity trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardResult {
    pub kind: EventKind,
    pub amount_granted: MicroCurio,
    pub new_balance: MicroCurio,
    /// True when this key was already granted; nothing changed
    pub already_granted: bool,
    pub title_changed: bool,
    /// Set only when the title changed
    pub new_title: Option<String>,
    /// Title held after this call
    pub title: String,
    pub ledger_entry_id: Option<i64>,
    pub breakdown: Vec<BreakdownTerm>,
    pub streak: StreakInfo,
}

/// Result of the daily check-in convenience flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckinResult {
    pub day: NaiveDate,
    pub checkin: AwardResult,
    /// Streak bonus, attempted whenever the streak is at least two days
    pub streak_bonus: Option<AwardResult>,
}

impl CheckinResult {
    pub fn total_granted(&self) -> MicroCurio {
        self.checkin.amount_granted + self.streak_bonus.as_ref().map_or(0, |b| b.amount_granted)
    }

    pub fn final_balance(&self) -> MicroCurio {
        self.streak_bonus
            .as_ref()
            .map_or(self.checkin.new_balance, |b| b.new_balance)
    }
}

enum TxOutcome {
    Applied {
        before: Account,
        after: Account,
        entry_id: i64,
        transition: Option<StreakTransition>,
    },
    Duplicate(Account),
}

#[derive(Clone)]
pub struct AwardService {
    store: CurioStore,
    rewards: RewardSettings,
}

impl AwardService {
    pub fn new(store: CurioStore, rewards: RewardSettings) -> Self {
        Self { store, rewards }
    }

    pub fn rewards(&self) -> &RewardSettings {
        &self.rewards
    }

    /// Grant an award at most once per idempotency key.
    pub fn award(
        &self,
        account_id: &str,
        kind: EventKind,
        ctx: &ActivityContext,
        key: &IdempotencyKey,
    ) -> Result<AwardResult> {
        self.award_at(account_id, kind, ctx, key, Utc::now())
    }

    /// Same as [`award`](Self::award) with an explicit clock.
    pub fn award_at(
        &self,
        account_id: &str,
        kind: EventKind,
        ctx: &ActivityContext,
        key: &IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<AwardResult> {
        // Scoring failures happen before any write
        let scored = compute_award(kind, ctx, &self.rewards)?;
        let context_json = serde_json::to_string(ctx)?;
        let today = now.date_naive();

        let outcome = self.store.db().write(|tx| {
            let account = require_account(tx, account_id)?;

            // The check-in table is a second idempotency boundary: one per UTC day,
            // whatever key the caller chose
            if kind == EventKind::DailyCheckin && checkin_exists(tx, account_id, today)? {
                return Ok(TxOutcome::Duplicate(account));
            }

            let appended = ledger::append(
                tx,
                &NewLedgerEntry {
                    account_id,
                    kind,
                    amount_micro: scored.amount_micro,
                    idempotency_key: key.as_str(),
                    created_at: now.timestamp_millis(),
                    breakdown: &scored.breakdown,
                    context_json: Some(context_json.clone()),
                },
            )?;
            let AppendOutcome::Applied { entry_id } = appended else {
                // Only the same account and kind may treat the key as already granted
                let owner = ledger::find_by_key(tx, key.as_str())?;
                if owner.is_some_and(|e| e.account_id != account_id || e.kind != kind) {
                    return Err(CurioError::InvalidInput(format!(
                        "idempotency key {key} already used by another award"
                    )));
                }
                return Ok(TxOutcome::Duplicate(account));
            };

            let mut after = account.clone();
            apply_award(&mut after, &scored, today)?;

            let mut transition = None;
            if kind == EventKind::DailyCheckin {
                ledger::record_checkin(tx, account_id, today, entry_id)?;
                let (streak, step) = match account.last_checkin_day {
                    // A day before the latest check-in: rebuild from the recorded days
                    Some(latest) if today < latest => {
                        let days = ledger::checkin_days(tx, account_id)?;
                        (recompute_from_history(&days, latest), StreakTransition::Backfilled)
                    }
                    _ => account.streak().advance(today),
                };
                after.current_streak = streak.current;
                after.longest_streak = streak.longest;
                after.last_checkin_day = streak.last_checkin;
                transition = Some(step);
            }

            after.updated_at = now.timestamp_millis();
            save_account(tx, &after)?;

            Ok(TxOutcome::Applied {
                before: account,
                after,
                entry_id,
                transition,
            })
        })?;

        Ok(self.report(kind, key, scored, outcome, today))
    }

    /// Daily check-in for the current UTC day, plus the streak bonus.
    pub fn daily_checkin(&self, account_id: &str) -> Result<CheckinResult> {
        self.daily_checkin_at(account_id, Utc::now())
    }

    pub fn daily_checkin_at(&self, account_id: &str, now: DateTime<Utc>) -> Result<CheckinResult> {
        let day = now.date_naive();
        let checkin = self.award_at(
            account_id,
            EventKind::DailyCheckin,
            &ActivityContext::default(),
            &IdempotencyKey::daily_checkin(account_id, day),
            now,
        )?;

        // Attempted on duplicates too, so a retry completes a bonus that a
        // crashed first call never reached
        let extended_today = checkin.streak.last_checkin == Some(day);
        let streak_bonus = if checkin.streak.current >= 2 && extended_today {
            Some(self.award_at(
                account_id,
                EventKind::StreakMaintained,
                &ActivityContext::default(),
                &IdempotencyKey::streak_maintained(account_id, day),
                now,
            )?)
        } else {
            None
        };

        Ok(CheckinResult {
            day,
            checkin,
            streak_bonus,
        })
    }

    fn report(
        &self,
        kind: EventKind,
        key: &IdempotencyKey,
        scored: ScoredAward,
        outcome: TxOutcome,
        today: NaiveDate,
    ) -> AwardResult {
        match outcome {
            TxOutcome::Duplicate(account) => {
                debug!(
                    account_id = %account.account_id,
                    kind = %kind,
                    key = %key,
                    "duplicate award suppressed"
                );
                AwardResult {
                    kind,
                    amount_granted: 0,
                    new_balance: account.balance_micro,
                    already_granted: true,
                    title_changed: false,
                    new_title: None,
                    title: account.title.clone(),
                    ledger_entry_id: None,
                    breakdown: Vec::new(),
                    streak: account.streak(),
                }
            }
            TxOutcome::Applied {
                before,
                after,
                entry_id,
                transition,
            } => {
                let title_changed = title_rose(&before.title, &after.title);
                info!(
                    account_id = %after.account_id,
                    kind = %kind,
                    amount = scored.amount_micro,
                    balance = after.balance_micro,
                    entry_id,
                    "award granted"
                );
                if title_changed {
                    info!(
                        account_id = %after.account_id,
                        from = %before.title,
                        to = %after.title,
                        "title changed"
                    );
                }
                match transition {
                    Some(StreakTransition::Extended(days)) => {
                        info!(account_id = %after.account_id, days, "streak extended")
                    }
                    Some(StreakTransition::Started) if before.current_streak > 1 => {
                        info!(
                            account_id = %after.account_id,
                            previous = before.current_streak,
                            "streak reset"
                        )
                    }
                    Some(StreakTransition::Backfilled) => {
                        info!(
                            account_id = %after.account_id,
                            day = %today,
                            current = after.current_streak,
                            "earlier check-in filled in, streak rebuilt"
                        )
                    }
                    Some(StreakTransition::Unchanged) => {
                        warn!(
                            account_id = %after.account_id,
                            "check-in granted without streak change"
                        )
                    }
                    _ => {}
                }

                AwardResult {
                    kind,
                    amount_granted: scored.amount_micro,
                    new_balance: after.balance_micro,
                    already_granted: false,
                    title_changed,
                    new_title: title_changed.then(|| after.title.clone()),
                    title: after.title.clone(),
                    ledger_entry_id: Some(entry_id),
                    breakdown: scored.breakdown,
                    streak: after.streak(),
                }
            }
        }
    }
}

/// Fold a scored award into the cached account fields.
fn apply_award(account: &mut Account, scored: &ScoredAward, today: NaiveDate) -> Result<()> {
    if scored.amount_micro < 0 {
        return Err(CurioError::InvalidInput(format!(
            "negative award for {}",
            scored.kind
        )));
    }
    account.balance_micro = account
        .balance_micro
        .checked_add(scored.amount_micro)
        .ok_or_else(|| CurioError::InvalidInput("balance overflow".into()))?;
    account.title = Title::for_balance(account.balance_micro).name.to_string();
    account.last_activity_day = Some(today);

    match scored.kind {
        EventKind::QuizPassed => {
            account.quizzes_passed += 1;
            if scored.perfect {
                account.perfect_quizzes += 1;
            }
        }
        EventKind::TeachBackBonus => account.teach_backs_passed += 1,
        EventKind::QuestionAsked => account.questions_asked += 1,
        _ => {}
    }
    Ok(())
}

/// Only a move to a higher tier counts as a title change.
fn title_rose(before: &str, after: &str) -> bool {
    let tier = |name: &str| Title::by_name(name).map_or(0, |t| t.tier);
    before != after && tier(after) > tier(before)
}

pub(crate) fn save_account(conn: &Connection, account: &Account) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET
            balance_micro = ?2, title = ?3, current_streak = ?4, longest_streak = ?5,
            last_checkin_day = ?6, last_activity_day = ?7, quizzes_passed = ?8,
            perfect_quizzes = ?9, teach_backs_passed = ?10, questions_asked = ?11,
            updated_at = ?12
         WHERE account_id = ?1",
        params![
            account.account_id,
            account.balance_micro,
            account.title,
            account.current_streak,
            account.longest_streak,
            account.last_checkin_day.map(date_key),
            account.last_activity_day.map(date_key),
            account.quizzes_passed,
            account.perfect_quizzes,
            account.teach_backs_passed,
            account.questions_asked,
            account.updated_at,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use chrono::TimeZone;

    fn service() -> AwardService {
        let store = CurioStore::in_memory().unwrap();
        store.accounts().ensure_account("ada", None).unwrap();
        AwardService::new(store, RewardSettings::default())
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_same_key_grants_once() {
        let svc = service();
        let key = IdempotencyKey::section("ada", "rust-101", "ownership");
        let ctx = ActivityContext::default();

        let first = svc.award("ada", EventKind::SectionCompleted, &ctx, &key).unwrap();
        let second = svc.award("ada", EventKind::SectionCompleted, &ctx, &key).unwrap();

        assert_eq!(first.amount_granted, 5_000);
        assert!(!first.already_granted);
        assert!(second.already_granted);
        assert_eq!(second.amount_granted, 0);
        assert_eq!(second.new_balance, 5_000);
    }

    #[test]
    fn test_scoring_error_leaves_no_trace() {
        let svc = service();
        let key = IdempotencyKey::quiz("ada", "attempt-1");
        let err = svc
            .award("ada", EventKind::QuizPassed, &ActivityContext::default(), &key)
            .unwrap_err();
        assert!(matches!(err, CurioError::MissingContext { .. }));
        assert!(svc.store.ledger().entry_by_key(key.as_str()).unwrap().is_none());
    }

    #[test]
    fn test_unknown_account() {
        let svc = service();
        let key = IdempotencyKey::question("ghost", "q1");
        let err = svc
            .award("ghost", EventKind::QuestionAsked, &ActivityContext::default(), &key)
            .unwrap_err();
        assert!(matches!(err, CurioError::NotFound(_)));
    }

    #[test]
    fn test_quiz_counters_and_title_change() {
        let svc = service();
        let ctx = ActivityContext::quiz(Difficulty::Deep, 100, 1);
        let result = svc
            .award("ada", EventKind::QuizPassed, &ctx, &IdempotencyKey::quiz("ada", "a1"))
            .unwrap();

        assert_eq!(result.amount_granted, 72_000);
        assert!(result.title_changed);
        assert_eq!(result.new_title.as_deref(), Some("Apprentice"));

        let account = svc.store.accounts().get("ada").unwrap();
        assert_eq!(account.quizzes_passed, 1);
        assert_eq!(account.perfect_quizzes, 1);

        // Retried with the same attempt id: counters unchanged
        svc.award("ada", EventKind::QuizPassed, &ctx, &IdempotencyKey::quiz("ada", "a1"))
            .unwrap();
        assert_eq!(svc.store.accounts().get("ada").unwrap().quizzes_passed, 1);
    }

    #[test]
    fn test_checkin_twice_same_day_with_different_keys() {
        let svc = service();
        let ctx = ActivityContext::default();
        let key1 = IdempotencyKey::custom("c-1").unwrap();
        let key2 = IdempotencyKey::custom("c-2").unwrap();
        let first = svc
            .award_at("ada", EventKind::DailyCheckin, &ctx, &key1, at(3, 8))
            .unwrap();
        let second = svc
            .award_at("ada", EventKind::DailyCheckin, &ctx, &key2, at(3, 20))
            .unwrap();

        assert!(!first.already_granted);
        assert!(second.already_granted);
        assert_eq!(second.new_balance, 5_000);
        assert_eq!(second.streak.current, 1);
    }

    #[test]
    fn test_checkin_streak_and_bonus() {
        let svc = service();
        let day1 = svc.daily_checkin_at("ada", at(1, 9)).unwrap();
        assert!(day1.streak_bonus.is_none());
        assert_eq!(day1.checkin.streak.current, 1);

        let day2 = svc.daily_checkin_at("ada", at(2, 23)).unwrap();
        assert_eq!(day2.checkin.streak.current, 2);
        let bonus = day2.streak_bonus.as_ref().unwrap();
        assert_eq!(bonus.amount_granted, 2_000);
        assert_eq!(day2.final_balance(), 5_000 + 5_000 + 2_000);

        let retry = svc.daily_checkin_at("ada", at(2, 23)).unwrap();
        assert_eq!(retry.total_granted(), 0);
        assert!(retry.streak_bonus.unwrap().already_granted);

        let after_gap = svc.daily_checkin_at("ada", at(5, 7)).unwrap();
        assert_eq!(after_gap.checkin.streak.current, 1);
        assert_eq!(after_gap.checkin.streak.longest, 2);
        assert!(after_gap.streak_bonus.is_none());
    }

    #[test]
    fn test_title_rose() {
        assert!(title_rose("Curious Mind", "Apprentice"));
        assert!(!title_rose("Apprentice", "Apprentice"));
        assert!(!title_rose("Scholar", "Apprentice"));
    }
}
