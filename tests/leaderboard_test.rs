//! Integration tests for monthly leaderboards and circle scopes

mod common;

use chrono::Duration;

use common::{TestEnv, at};
use curio::config::LeaderboardSettings;
use curio::{
    ActivityContext, CurioError, Difficulty, EventKind, IdempotencyKey, LeaderboardAggregator,
    Period, Scope,
};

fn board(env: &TestEnv) -> LeaderboardAggregator {
    LeaderboardAggregator::new(env.store.clone(), LeaderboardSettings::default())
}

fn march() -> Period {
    Period::new(2024, 3).unwrap()
}

/// Ten accounts with 1..=10 sections each in March 2024
fn seed_ten(env: &TestEnv) -> Vec<String> {
    let ids: Vec<String> = (1..=10).map(|i| format!("learner{i:02}")).collect();
    for (i, id) in ids.iter().enumerate() {
        env.account(id);
        for s in 0..=i {
            env.section(id, &format!("s{s}"), at(2024, 3, 1) + Duration::minutes(i as i64));
        }
    }
    ids
}

#[test]
fn test_position_matches_bulk_rank() {
    let env = TestEnv::new();
    let ids = seed_ten(&env);
    // Tie at the top, broken by the earlier first award
    env.account("late");
    for s in 0..10 {
        env.section("late", &format!("s{s}"), at(2024, 3, 20));
    }

    let board = board(&env);
    let ranking = board.rank(&Scope::Global, march(), 100).unwrap();
    assert_eq!(ranking.total_ranked, 11);

    for row in &ranking.rows {
        let single = board.position_of(&row.account_id, &Scope::Global, march()).unwrap();
        assert_eq!(&single, row, "position_of disagrees for {}", row.account_id);
    }

    assert_eq!(ranking.rows[0].account_id, ids[9]);
    assert_eq!(ranking.rows[1].account_id, "late");
    assert_eq!(ranking.rows[10].percentile, Some(0));
}

#[test]
fn test_top_percentile_and_eligibility() {
    let env = TestEnv::new();
    let ids = seed_ten(&env);
    let awards = env.awards();
    for (n, id) in [&ids[9], &ids[8]].into_iter().enumerate() {
        for attempt in 0..3 {
            awards
                .award_at(
                    id,
                    EventKind::QuizPassed,
                    &ActivityContext::quiz(Difficulty::Skim, 70, 5),
                    &IdempotencyKey::quiz(id, &format!("{n}-{attempt}")),
                    at(2024, 3, 2),
                )
                .unwrap();
        }
    }

    let ranking = board(&env).rank(&Scope::Global, march(), 10).unwrap();
    let top = &ranking.rows[0];
    assert_eq!(top.account_id, ids[9]);
    assert_eq!(top.quiz_pass_count, 3);
    assert!(top.is_top_percentile);
    assert!(top.is_eligible);

    // percentile floor(100 * 8 / 9) = 88, below the 90 cutoff
    let second = &ranking.rows[1];
    assert_eq!(second.percentile, Some(88));
    assert!(!second.is_top_percentile);
    assert!(!second.is_eligible);
}

#[test]
fn test_months_are_separate() {
    let env = TestEnv::new();
    env.account("ada");
    env.account("bob");
    env.section("ada", "s1", at(2024, 3, 31));
    env.section("bob", "s1", at(2024, 4, 1));

    let board = board(&env);
    let march_rows = board.rank(&Scope::Global, march(), 10).unwrap().rows;
    let april_rows = board
        .rank(&Scope::Global, Period::new(2024, 4).unwrap(), 10)
        .unwrap()
        .rows;
    assert_eq!(march_rows.len(), 1);
    assert_eq!(march_rows[0].account_id, "ada");
    assert_eq!(april_rows.len(), 1);
    assert_eq!(april_rows[0].account_id, "bob");
}

#[test]
fn test_circle_scope_only_ranks_members() {
    let env = TestEnv::new();
    for id in ["owner", "friend", "outsider"] {
        env.account(id);
    }
    let circle = env.store.circles().create("owner", "Study group", None).unwrap();
    env.store.circles().join("friend", &circle.invite_code.to_lowercase()).unwrap();

    env.section("owner", "s1", at(2024, 3, 3));
    env.section("friend", "s1", at(2024, 3, 3));
    env.section("friend", "s2", at(2024, 3, 4));
    for s in 0..5 {
        env.section("outsider", &format!("s{s}"), at(2024, 3, 3));
    }

    let board = board(&env);
    let scope = Scope::Circle(circle.circle_id.clone());
    let ranking = board.rank_for("owner", &scope, march(), 10).unwrap();
    let ids: Vec<_> = ranking.rows.iter().map(|r| r.account_id.as_str()).collect();
    assert_eq!(ids, vec!["friend", "owner"]);
    assert_eq!(ranking.rows[1].percentile, Some(0));

    let err = board.rank_for("outsider", &scope, march(), 10).unwrap_err();
    assert!(matches!(err, CurioError::Forbidden(_)));
    let err = board.position_of("outsider", &scope, march()).unwrap_err();
    assert!(matches!(err, CurioError::Forbidden(_)));

    // A member who leaves drops out of the circle ranking
    env.store.circles().leave("friend", &circle.circle_id).unwrap();
    let ranking = board.rank(&scope, march(), 10).unwrap();
    assert_eq!(ranking.total_ranked, 1);
    assert_eq!(ranking.rows[0].percentile, Some(100));
}

#[test]
fn test_unknown_circle_and_account() {
    let env = TestEnv::new();
    env.account("ada");
    let board = board(&env);

    let err = board
        .rank(&Scope::Circle("nope".into()), march(), 10)
        .unwrap_err();
    assert!(matches!(err, CurioError::NotFound(_)));

    let err = board.position_of("ghost", &Scope::Global, march()).unwrap_err();
    assert!(matches!(err, CurioError::NotFound(_)));
}

#[test]
fn test_circle_position_matches_bulk_rank_with_ties() {
    let env = TestEnv::new();
    for id in ["owner", "amy", "bea", "cal", "dan", "outsider"] {
        env.account(id);
    }
    let circles = env.store.circles();
    let circle = circles.create("owner", "Ties", None).unwrap();
    for id in ["amy", "bea", "cal", "dan"] {
        circles.join(id, &circle.invite_code).unwrap();
    }

    // amy and bea tie on balance and first award; cal ties on balance only
    env.section("amy", "s1", at(2024, 3, 5));
    env.section("bea", "s1", at(2024, 3, 5));
    env.section("cal", "s1", at(2024, 3, 9));
    env.section("owner", "s1", at(2024, 3, 1));
    env.section("owner", "s2", at(2024, 3, 2));
    env.section("dan", "s1", at(2024, 3, 1));
    for s in 0..4 {
        env.section("outsider", &format!("s{s}"), at(2024, 3, 1));
    }

    let board = board(&env);
    let scope = Scope::Circle(circle.circle_id.clone());
    let ranking = board.rank(&scope, march(), 10).unwrap();
    let ids: Vec<_> = ranking.rows.iter().map(|r| r.account_id.as_str()).collect();
    assert_eq!(ids, vec!["owner", "dan", "amy", "bea", "cal"]);

    for row in &ranking.rows {
        let single = board.position_of(&row.account_id, &scope, march()).unwrap();
        assert_eq!(&single, row, "position_of disagrees for {}", row.account_id);
    }
}
