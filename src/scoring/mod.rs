//! Scoring engine
//!
//! Pure functions that turn an activity event into an mCurio amount plus a
//! breakdown of the terms that produced it. No I/O, no clock.

mod quiz;

pub use quiz::{
    AttemptMultiplier, PERFECT_BONUS_PERCENT, attempt_multiplier, base_amount, score_quiz,
};

use serde::{Deserialize, Serialize};

use crate::config::RewardSettings;
use crate::domain::{ActivityContext, CurioError, EventKind, MicroCurio, Result};

/// One contributing term of an award, kept as audit metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownTerm {
    pub label: String,
    pub amount_micro: MicroCurio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BreakdownTerm {
    pub fn new(label: impl Into<String>, amount_micro: MicroCurio) -> Self {
        Self {
            label: label.into(),
            amount_micro,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Result of scoring one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredAward {
    pub kind: EventKind,
    pub amount_micro: MicroCurio,
    pub breakdown: Vec<BreakdownTerm>,
    /// Set for quizzes scored at 100%
    #[serde(default)]
    pub perfect: bool,
}

/// Compute the award for an event.
///
/// Fails with `MissingContext` when a parametric kind lacks a required
/// field and with `InvalidInput` for out-of-range values.
pub fn compute_award(
    kind: EventKind,
    ctx: &ActivityContext,
    rewards: &RewardSettings,
) -> Result<ScoredAward> {
    if let Some(score) = ctx.score_percent.filter(|s| *s > 100) {
        return Err(CurioError::InvalidInput(format!(
            "score_percent {score} is above 100"
        )));
    }

    if let Some(amount) = rewards.flat_amount(kind) {
        return Ok(ScoredAward {
            kind,
            amount_micro: amount,
            breakdown: vec![BreakdownTerm::new(kind.label(), amount)],
            perfect: false,
        });
    }

    match kind {
        EventKind::QuizPassed => {
            let difficulty = ctx.difficulty.ok_or_else(|| missing(kind, "difficulty"))?;
            let score = ctx.score_percent.ok_or_else(|| missing(kind, "score_percent"))?;
            let attempt = ctx.attempt_number.ok_or_else(|| missing(kind, "attempt_number"))?;
            let scored = score_quiz(difficulty, score, attempt);
            Ok(ScoredAward {
                kind,
                amount_micro: scored.amount,
                breakdown: scored.terms,
                perfect: scored.perfect,
            })
        }
        EventKind::TeachBackBonus => {
            let score = ctx.score_percent.ok_or_else(|| missing(kind, "score_percent"))?;
            let amount = rewards
                .teach_back_max
                .checked_mul(MicroCurio::from(score))
                .map(|scaled| scaled / 100)
                .ok_or_else(|| {
                    CurioError::InvalidInput(format!(
                        "teach_back_max {} is too large to scale",
                        rewards.teach_back_max
                    ))
                })?;
            Ok(ScoredAward {
                kind,
                amount_micro: amount,
                breakdown: vec![BreakdownTerm::new(kind.label(), amount).with_detail(format!(
                    "{score}% of {}",
                    rewards.teach_back_max
                ))],
                perfect: score == 100,
            })
        }
        _ => Err(CurioError::InvalidEventKind(kind.as_str().to_string())),
    }
}

/// Parse a raw event kind string and score it.
pub fn compute_award_str(
    kind: &str,
    ctx: &ActivityContext,
    rewards: &RewardSettings,
) -> Result<ScoredAward> {
    compute_award(kind.parse()?, ctx, rewards)
}

fn missing(kind: EventKind, field: &'static str) -> CurioError {
    CurioError::MissingContext {
        kind: kind.as_str().to_string(),
        field,
    }
}
