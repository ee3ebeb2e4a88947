//! Parametric quiz reward
//!
//! `base(difficulty) * attempt_multiplier(attempt) [+ perfect bonus]`, all in
//! integer mCurio with floor rounding.

use crate::domain::{Difficulty, MicroCurio};

use super::BreakdownTerm;

/// Perfect-score bonus as a percentage of the (decayed) base
pub const PERFECT_BONUS_PERCENT: MicroCurio = 20;

/// Attempt number from which a quiz pays nothing
pub const ZERO_REWARD_ATTEMPT: i64 = 4;

/// Base award per difficulty tier
pub fn base_amount(difficulty: Difficulty) -> MicroCurio {
    match difficulty {
        Difficulty::Skim => 10_000,
        Difficulty::Solid => 25_000,
        Difficulty::Deep => 60_000,
    }
}

/// Exact rational multiplier for an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptMultiplier {
    pub numerator: MicroCurio,
    pub denominator: MicroCurio,
}

impl AttemptMultiplier {
    /// Apply to an amount, flooring toward zero.
    pub fn apply(&self, amount: MicroCurio) -> MicroCurio {
        amount * self.numerator / self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    fn describe(&self) -> String {
        match (self.numerator, self.denominator) {
            (0, _) => "x0".to_string(),
            (n, d) if n == d => "x1".to_string(),
            (n, d) => format!("x{n}/{d}"),
        }
    }
}

/// Clamp the attempt to `[1, 4]` and look up its multiplier.
///
/// Attempts `<= 0` count as the first attempt.
pub fn attempt_multiplier(attempt: i64) -> AttemptMultiplier {
    let (numerator, denominator) = match attempt.clamp(1, ZERO_REWARD_ATTEMPT) {
        1 => (1, 1),
        2 => (1, 2),
        3 => (1, 4),
        _ => (0, 1),
    };
    AttemptMultiplier {
        numerator,
        denominator,
    }
}

/// Outcome of scoring one quiz attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizScore {
    pub amount: MicroCurio,
    pub perfect: bool,
    pub terms: Vec<BreakdownTerm>,
}

pub fn score_quiz(difficulty: Difficulty, score_percent: u32, attempt: i64) -> QuizScore {
    let base = base_amount(difficulty);
    let multiplier = attempt_multiplier(attempt);
    let decayed = multiplier.apply(base);

    let mut terms = vec![BreakdownTerm::new(
        format!("{} quiz base", difficulty.as_str()),
        decayed,
    )
    .with_detail(format!(
        "{base} at attempt {} ({})",
        attempt.max(1),
        multiplier.describe()
    ))];

    let perfect = score_percent == 100;
    let bonus = if perfect && !multiplier.is_zero() {
        multiplier.apply(base * PERFECT_BONUS_PERCENT) / 100
    } else {
        0
    };
    if bonus > 0 {
        terms.push(
            BreakdownTerm::new("perfect score bonus", bonus)
                .with_detail(format!("{PERFECT_BONUS_PERCENT}% of decayed base")),
        );
    }

    QuizScore {
        amount: decayed + bonus,
        perfect,
        terms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_multiplier_clamps() {
        assert_eq!(attempt_multiplier(-3), attempt_multiplier(1));
        assert_eq!(attempt_multiplier(0), attempt_multiplier(1));
        assert!(attempt_multiplier(4).is_zero());
        assert!(attempt_multiplier(99).is_zero());
        assert_eq!(attempt_multiplier(2).apply(25_000), 12_500);
        assert_eq!(attempt_multiplier(3).apply(25_000), 6_250);
    }

    #[test]
    fn test_attempt_decay_is_strict_until_zero() {
        let amounts: Vec<_> = (1..=5)
            .map(|attempt| score_quiz(Difficulty::Deep, 80, attempt).amount)
            .collect();
        assert_eq!(amounts, vec![60_000, 30_000, 15_000, 0, 0]);
    }

    #[test]
    fn test_perfect_bonus_boundary() {
        assert_eq!(score_quiz(Difficulty::Skim, 100, 1).amount, 12_000);
        assert_eq!(score_quiz(Difficulty::Skim, 99, 1).amount, 10_000);
    }

    #[test]
    fn test_perfect_bonus_follows_decay() {
        // 10_000 / 4 = 2_500 base, bonus floor(10_000 * 0.2 / 4) = 500
        assert_eq!(score_quiz(Difficulty::Skim, 100, 3).amount, 3_000);
        let late = score_quiz(Difficulty::Deep, 100, 4);
        assert_eq!(late.amount, 0);
        assert!(late.perfect);
        assert_eq!(late.terms.len(), 1);
    }
}
