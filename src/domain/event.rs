//! Activity events that can earn Curio

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CurioError;

/// Closed set of rewardable event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    QuestionAsked,
    CourseStarted,
    SectionCompleted,
    LessonCompleted,
    CourseCompleted,
    QuizPassed,
    Eli5Passed,
    StreakMaintained,
    DailyCheckin,
    TeachBackBonus,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        Self::QuestionAsked,
        Self::CourseStarted,
        Self::SectionCompleted,
        Self::LessonCompleted,
        Self::CourseCompleted,
        Self::QuizPassed,
        Self::Eli5Passed,
        Self::StreakMaintained,
        Self::DailyCheckin,
        Self::TeachBackBonus,
    ];

    /// Get the string ID for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuestionAsked => "question_asked",
            Self::CourseStarted => "course_started",
            Self::SectionCompleted => "section_completed",
            Self::LessonCompleted => "lesson_completed",
            Self::CourseCompleted => "course_completed",
            Self::QuizPassed => "quiz_passed",
            Self::Eli5Passed => "eli5_passed",
            Self::StreakMaintained => "streak_maintained",
            Self::DailyCheckin => "daily_checkin",
            Self::TeachBackBonus => "teach_back_bonus",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::QuestionAsked => "Question asked",
            Self::CourseStarted => "Course started",
            Self::SectionCompleted => "Section completed",
            Self::LessonCompleted => "Lesson completed",
            Self::CourseCompleted => "Course completed",
            Self::QuizPassed => "Quiz passed",
            Self::Eli5Passed => "ELI5 passed",
            Self::StreakMaintained => "Streak maintained",
            Self::DailyCheckin => "Daily check-in",
            Self::TeachBackBonus => "Teach-back bonus",
        }
    }

    /// Kinds that survive a profile reset (learning progress, not engagement).
    pub fn is_canonical(&self) -> bool {
        matches!(
            self,
            Self::SectionCompleted | Self::CourseCompleted | Self::QuizPassed | Self::TeachBackBonus
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = CurioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CurioError::InvalidEventKind(s.to_string()))
    }
}

/// Quiz difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Skim,
    Solid,
    Deep,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skim => "skim",
            Self::Solid => "solid",
            Self::Deep => "deep",
        }
    }
}

impl FromStr for Difficulty {
    type Err = CurioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skim" => Ok(Self::Skim),
            "solid" => Ok(Self::Solid),
            "deep" => Ok(Self::Deep),
            other => Err(CurioError::InvalidInput(format!(
                "unknown difficulty '{other}' (expected skim, solid or deep)"
            ))),
        }
    }
}

/// Context supplied by the activity trigger.
///
/// Fields are optional here; each event kind validates the shape it needs
/// before scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_percent: Option<u32>,
    /// Caller-maintained attempt counter for this (account, course).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

impl ActivityContext {
    pub fn quiz(difficulty: Difficulty, score_percent: u32, attempt_number: i64) -> Self {
        Self {
            difficulty: Some(difficulty),
            score_percent: Some(score_percent),
            attempt_number: Some(attempt_number),
            ..Self::default()
        }
    }

    pub fn with_score(score_percent: u32) -> Self {
        Self {
            score_percent: Some(score_percent),
            ..Self::default()
        }
    }
}
