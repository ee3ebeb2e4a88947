//! Leaderboard aggregator
//!
//! Rankings are computed at read time from the ledger for one calendar
//! month, globally or within a circle's current roster. Ordering is period
//! balance descending, then earliest award in the period, then account id,
//! and is shared by the bulk and single-account queries so both agree.

mod models;

pub use models::{Leaderboard, LeaderboardRow, Period, Scope, percentile};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::config::LeaderboardSettings;
use crate::domain::{CurioError, MicroCurio, Result};
use crate::store::{CurioStore, is_member, require_account, require_circle};

/// Per-account period totals; ?1 = month bucket, ?2 = circle id or NULL
const PERIOD_TOTALS: &str = "
    totals AS (
        SELECT l.account_id AS account_id,
               SUM(l.amount_micro) AS balance,
               SUM(CASE WHEN l.kind = 'quiz_passed' THEN 1 ELSE 0 END) AS quizzes,
               MIN(l.created_at) AS first_award
        FROM ledger_entries l
        WHERE l.month_bucket = ?1
          AND (?2 IS NULL OR l.account_id IN
                (SELECT account_id FROM circle_members WHERE circle_id = ?2))
        GROUP BY l.account_id
    )";

#[derive(Clone)]
pub struct LeaderboardAggregator {
    store: CurioStore,
    settings: LeaderboardSettings,
}

impl LeaderboardAggregator {
    pub fn new(store: CurioStore, settings: LeaderboardSettings) -> Self {
        Self { store, settings }
    }

    /// Full ranking for a scope and month, truncated to `limit` rows.
    pub fn rank(&self, scope: &Scope, period: Period, limit: usize) -> Result<Leaderboard> {
        self.store.db().read(|conn| {
            if let Some(circle_id) = scope.circle_id() {
                require_circle(conn, circle_id)?;
            }
            self.rank_in(conn, scope, period, limit)
        })
    }

    /// Like [`rank`](Self::rank), refusing circle scopes the viewer is not in.
    pub fn rank_for(
        &self,
        viewer_id: &str,
        scope: &Scope,
        period: Period,
        limit: usize,
    ) -> Result<Leaderboard> {
        self.store.db().read(|conn| {
            check_scope_access(conn, viewer_id, scope)?;
            self.rank_in(conn, scope, period, limit)
        })
    }

    /// One account's row, computed without building the full ranking.
    pub fn position_of(
        &self,
        account_id: &str,
        scope: &Scope,
        period: Period,
    ) -> Result<LeaderboardRow> {
        self.store.db().read(|conn| {
            let account = require_account(conn, account_id)?;
            check_scope_access(conn, account_id, scope)?;

            let sql = format!(
                "WITH {PERIOD_TOTALS},
                 me AS (SELECT * FROM totals WHERE account_id = ?3)
                 SELECT me.balance, me.quizzes,
                        (SELECT COUNT(*) FROM totals t
                          WHERE t.balance > me.balance
                             OR (t.balance = me.balance AND t.first_award < me.first_award)
                             OR (t.balance = me.balance AND t.first_award = me.first_award
                                 AND t.account_id < me.account_id)),
                        (SELECT COUNT(*) FROM totals)
                 FROM me"
            );
            let found = conn
                .query_row(
                    &sql,
                    params![period.bucket(), scope.circle_id(), account_id],
                    |row| {
                        Ok((
                            row.get::<_, MicroCurio>(0)?,
                            row.get::<_, u32>(1)?,
                            row.get::<_, u32>(2)?,
                            row.get::<_, u32>(3)?,
                        ))
                    },
                )
                .optional()?;

            let row = match found {
                Some((balance, quizzes, ahead, total)) => self.build_row(
                    account_id.to_string(),
                    account.display_name,
                    balance,
                    quizzes,
                    ahead + 1,
                    total,
                ),
                None => LeaderboardRow {
                    account_id: account_id.to_string(),
                    display_name: account.display_name,
                    period_balance_micro: 0,
                    quiz_pass_count: 0,
                    rank: None,
                    percentile: None,
                    is_eligible: false,
                    is_top_percentile: false,
                },
            };
            Ok(row)
        })
    }

    fn rank_in(
        &self,
        conn: &Connection,
        scope: &Scope,
        period: Period,
        limit: usize,
    ) -> Result<Leaderboard> {
        let sql = format!(
            "WITH {PERIOD_TOTALS}
             SELECT t.account_id, a.display_name, t.balance, t.quizzes
             FROM totals t LEFT JOIN accounts a ON a.account_id = t.account_id
             ORDER BY t.balance DESC, t.first_award ASC, t.account_id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let ranked = stmt
            .query_map(params![period.bucket(), scope.circle_id()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, MicroCurio>(2)?,
                    row.get::<_, u32>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total = u32::try_from(ranked.len())
            .map_err(|_| CurioError::Unavailable("ranking too large".into()))?;
        let rows = ranked
            .into_iter()
            .take(limit)
            .zip(1..)
            .map(|((id, name, balance, quizzes), rank)| {
                self.build_row(id, name, balance, quizzes, rank, total)
            })
            .collect();

        debug!(period = %period, ?scope, total, "leaderboard computed");
        Ok(Leaderboard {
            scope: scope.clone(),
            period,
            total_ranked: total,
            rows,
        })
    }

    fn build_row(
        &self,
        account_id: String,
        display_name: Option<String>,
        balance: MicroCurio,
        quizzes: u32,
        rank: u32,
        total: u32,
    ) -> LeaderboardRow {
        let pct = percentile(rank, total);
        let is_top = pct >= self.settings.percentile_cutoff;
        LeaderboardRow {
            account_id,
            display_name,
            period_balance_micro: balance,
            quiz_pass_count: quizzes,
            rank: Some(rank),
            percentile: Some(pct),
            is_eligible: is_top && quizzes >= self.settings.min_quizzes_for_eligibility,
            is_top_percentile: is_top,
        }
    }
}

fn check_scope_access(conn: &Connection, account_id: &str, scope: &Scope) -> Result<()> {
    let Some(circle_id) = scope.circle_id() else {
        return Ok(());
    };
    require_circle(conn, circle_id)?;
    if !is_member(conn, circle_id, account_id)? {
        return Err(CurioError::Forbidden(format!(
            "{account_id} is not a member of circle {circle_id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityContext, EventKind, IdempotencyKey};
    use crate::store::{AppendOutcome, NewLedgerEntry, month_bucket};
    use crate::store::ledger::append;
    use chrono::{TimeZone, Utc};

    fn seed(store: &CurioStore, account: &str, amount: MicroCurio, at_ms: i64, key: &str) {
        store.accounts().ensure_account(account, None).unwrap();
        let outcome = store
            .db()
            .write(|tx| {
                append(
                    tx,
                    &NewLedgerEntry {
                        account_id: account,
                        kind: EventKind::SectionCompleted,
                        amount_micro: amount,
                        idempotency_key: key,
                        created_at: at_ms,
                        breakdown: &[],
                        context_json: None,
                    },
                )
            })
            .unwrap();
        assert!(matches!(outcome, AppendOutcome::Applied { .. }));
    }

    fn march_ms(day: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_three_account_scenario() {
        let store = CurioStore::in_memory().unwrap();
        seed(&store, "a", 300, march_ms(1), "k-a");
        seed(&store, "b", 200, march_ms(1), "k-b");
        seed(&store, "c", 100, march_ms(1), "k-c");
        assert_eq!(month_bucket(march_ms(1)), "2024-03");

        let board = LeaderboardAggregator::new(store, LeaderboardSettings::default());
        let result = board
            .rank(&Scope::Global, Period::new(2024, 3).unwrap(), 10)
            .unwrap();

        let ranks: Vec<_> = result.rows.iter().map(|r| r.rank.unwrap()).collect();
        let pcts: Vec<_> = result.rows.iter().map(|r| r.percentile.unwrap()).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(pcts, vec![100, 50, 0]);
    }

    #[test]
    fn test_ties_broken_by_first_award() {
        let store = CurioStore::in_memory().unwrap();
        seed(&store, "late", 500, march_ms(9), "k-late");
        seed(&store, "early", 500, march_ms(2), "k-early");

        let board = LeaderboardAggregator::new(store, LeaderboardSettings::default());
        let period = Period::new(2024, 3).unwrap();
        let result = board.rank(&Scope::Global, period, 10).unwrap();
        assert_eq!(result.rows[0].account_id, "early");
        assert_eq!(board.position_of("late", &Scope::Global, period).unwrap().rank, Some(2));
    }

    #[test]
    fn test_empty_period() {
        let store = CurioStore::in_memory().unwrap();
        seed(&store, "a", 300, march_ms(1), "k-a");

        let board = LeaderboardAggregator::new(store, LeaderboardSettings::default());
        let april = Period::new(2024, 4).unwrap();
        assert!(board.rank(&Scope::Global, april, 10).unwrap().rows.is_empty());

        let pos = board.position_of("a", &Scope::Global, april).unwrap();
        assert_eq!(pos.rank, None);
        assert_eq!(pos.percentile, None);
    }

    #[test]
    fn test_limit_keeps_total() {
        let store = CurioStore::in_memory().unwrap();
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            seed(&store, id, 100 * (i as i64 + 1), march_ms(1), &format!("k-{id}"));
        }
        let board = LeaderboardAggregator::new(store, LeaderboardSettings::default());
        let result = board.rank(&Scope::Global, Period::new(2024, 3).unwrap(), 2).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.total_ranked, 4);
        assert_eq!(result.rows[0].account_id, "d");
    }

    #[test]
    fn test_eligibility_needs_quizzes_and_percentile() {
        let store = CurioStore::in_memory().unwrap();
        let settings = LeaderboardSettings {
            min_quizzes_for_eligibility: 1,
            ..LeaderboardSettings::default()
        };
        let awards = crate::award::AwardService::new(store.clone(), Default::default());
        store.accounts().ensure_account("quizzer", None).unwrap();
        awards
            .award_at(
                "quizzer",
                EventKind::QuizPassed,
                &ActivityContext::quiz(crate::domain::Difficulty::Deep, 90, 1),
                &IdempotencyKey::quiz("quizzer", "q1"),
                Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
            )
            .unwrap();
        seed(&store, "reader", 10, march_ms(1), "k-r");

        let board = LeaderboardAggregator::new(store, settings);
        let result = board.rank(&Scope::Global, Period::new(2024, 3).unwrap(), 10).unwrap();
        assert!(result.rows[0].is_eligible);
        assert_eq!(result.rows[0].quiz_pass_count, 1);
        assert!(!result.rows[1].is_eligible);
        assert!(!result.rows[1].is_top_percentile);
    }
}
