//! Deterministic idempotency keys
//!
//! A key is `<kind>:<account>:<scope...>`. Two requests for the same logical
//! award always produce the same key, so the ledger's uniqueness constraint
//! turns a retry into a no-op.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{CurioError, Result};
use super::event::EventKind;

const MAX_KEY_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Wrap a caller-supplied key.
    pub fn custom(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CurioError::InvalidInput("idempotency key is empty".into()));
        }
        if trimmed.len() > MAX_KEY_LEN {
            return Err(CurioError::InvalidInput(format!(
                "idempotency key longer than {MAX_KEY_LEN} bytes"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// One check-in per account per UTC day.
    pub fn daily_checkin(account_id: &str, day: NaiveDate) -> Self {
        Self::scoped(EventKind::DailyCheckin, account_id, &[&day.format("%Y-%m-%d").to_string()])
    }

    /// One streak bonus per account per UTC day.
    pub fn streak_maintained(account_id: &str, day: NaiveDate) -> Self {
        Self::scoped(
            EventKind::StreakMaintained,
            account_id,
            &[&day.format("%Y-%m-%d").to_string()],
        )
    }

    /// One award per quiz attempt id.
    pub fn quiz(account_id: &str, attempt_id: &str) -> Self {
        Self::scoped(EventKind::QuizPassed, account_id, &[attempt_id])
    }

    pub fn eli5(account_id: &str, attempt_id: &str) -> Self {
        Self::scoped(EventKind::Eli5Passed, account_id, &[attempt_id])
    }

    pub fn teach_back(account_id: &str, attempt_id: &str) -> Self {
        Self::scoped(EventKind::TeachBackBonus, account_id, &[attempt_id])
    }

    pub fn section(account_id: &str, course_id: &str, section_id: &str) -> Self {
        Self::scoped(EventKind::SectionCompleted, account_id, &[course_id, section_id])
    }

    pub fn lesson(account_id: &str, course_id: &str, lesson_id: &str) -> Self {
        Self::scoped(EventKind::LessonCompleted, account_id, &[course_id, lesson_id])
    }

    /// Course-level events (started, completed): once per account per course.
    pub fn course(account_id: &str, kind: EventKind, course_id: &str) -> Self {
        Self::scoped(kind, account_id, &[course_id])
    }

    pub fn question(account_id: &str, question_id: &str) -> Self {
        Self::scoped(EventKind::QuestionAsked, account_id, &[question_id])
    }

    fn scoped(kind: EventKind, account_id: &str, scope: &[&str]) -> Self {
        let mut key = format!("{}:{}", kind.as_str(), account_id);
        for part in scope {
            key.push(':');
            key.push_str(part);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_key_is_stable_per_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let a = IdempotencyKey::daily_checkin("acct-1", day);
        let b = IdempotencyKey::daily_checkin("acct-1", day);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "daily_checkin:acct-1:2024-03-09");

        let next = IdempotencyKey::daily_checkin("acct-1", day.succ_opt().unwrap());
        assert_ne!(a, next);
    }

    #[test]
    fn test_checkin_and_streak_scopes_are_independent() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_ne!(
            IdempotencyKey::daily_checkin("a", day),
            IdempotencyKey::streak_maintained("a", day)
        );
    }

    #[test]
    fn test_custom_key_validation() {
        assert!(IdempotencyKey::custom("   ").is_err());
        assert!(IdempotencyKey::custom("x".repeat(300)).is_err());
        assert_eq!(IdempotencyKey::custom(" retry-1 ").unwrap().as_str(), "retry-1");
    }
}
