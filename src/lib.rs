//! Curio - award, streak and leaderboard engine for learning activity
//!
//! Learners earn Curio for asking questions, finishing sections and courses,
//! passing quizzes and checking in daily. Every grant is an immutable ledger
//! row guarded by an idempotency key, so retried or concurrent triggers
//! never pay twice.
//!
//! ## Layers
//!
//! 1. **Scoring** ([`scoring`]): pure functions from event kind and context
//!    to an mCurio amount with a breakdown.
//! 2. **Awarding** ([`award`]): the transactional pipeline that appends to
//!    the ledger and updates the cached balance, title and streak.
//! 3. **Ranking** ([`leaderboard`]): monthly leaderboards computed from the
//!    ledger, globally or within a study circle.

pub mod award;
pub mod config;
pub mod domain;
pub mod leaderboard;
pub mod progress;
pub mod scoring;
pub mod store;

pub use award::{AwardResult, AwardService, CheckinResult, ProfileService};
pub use config::Config;
pub use domain::*;
pub use leaderboard::{Leaderboard, LeaderboardAggregator, LeaderboardRow, Period, Scope};
pub use store::CurioStore;
