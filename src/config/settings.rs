//! Settings sections of the config file

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{EventKind, MicroCurio};

/// Database location
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `~/.curio/curio.db` when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Flat-rate reward amounts in mCurio
///
/// Quiz awards are parametric and are not configured here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSettings {
    #[serde(default = "default_question_asked")]
    pub question_asked: MicroCurio,

    #[serde(default = "default_course_started")]
    pub course_started: MicroCurio,

    #[serde(default = "default_section_completed")]
    pub section_completed: MicroCurio,

    #[serde(default = "default_lesson_completed")]
    pub lesson_completed: MicroCurio,

    #[serde(default = "default_course_completed")]
    pub course_completed: MicroCurio,

    #[serde(default = "default_eli5_passed")]
    pub eli5_passed: MicroCurio,

    #[serde(default = "default_streak_maintained")]
    pub streak_maintained: MicroCurio,

    #[serde(default = "default_daily_checkin")]
    pub daily_checkin: MicroCurio,

    /// Teach-back award at a 100% score; scaled down linearly by score
    #[serde(default = "default_teach_back_max")]
    pub teach_back_max: MicroCurio,
}

fn default_question_asked() -> MicroCurio {
    1_000
}

fn default_course_started() -> MicroCurio {
    2_000
}

fn default_section_completed() -> MicroCurio {
    5_000
}

fn default_lesson_completed() -> MicroCurio {
    5_000
}

fn default_course_completed() -> MicroCurio {
    20_000
}

fn default_eli5_passed() -> MicroCurio {
    10_000
}

fn default_streak_maintained() -> MicroCurio {
    2_000
}

fn default_daily_checkin() -> MicroCurio {
    5_000
}

fn default_teach_back_max() -> MicroCurio {
    15_000
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            question_asked: default_question_asked(),
            course_started: default_course_started(),
            section_completed: default_section_completed(),
            lesson_completed: default_lesson_completed(),
            course_completed: default_course_completed(),
            eli5_passed: default_eli5_passed(),
            streak_maintained: default_streak_maintained(),
            daily_checkin: default_daily_checkin(),
            teach_back_max: default_teach_back_max(),
        }
    }
}

impl RewardSettings {
    /// Fixed amount for a flat-rate kind, `None` for parametric kinds.
    pub fn flat_amount(&self, kind: EventKind) -> Option<MicroCurio> {
        match kind {
            EventKind::QuestionAsked => Some(self.question_asked),
            EventKind::CourseStarted => Some(self.course_started),
            EventKind::SectionCompleted => Some(self.section_completed),
            EventKind::LessonCompleted => Some(self.lesson_completed),
            EventKind::CourseCompleted => Some(self.course_completed),
            EventKind::Eli5Passed => Some(self.eli5_passed),
            EventKind::StreakMaintained => Some(self.streak_maintained),
            EventKind::DailyCheckin => Some(self.daily_checkin),
            EventKind::QuizPassed | EventKind::TeachBackBonus => None,
        }
    }

    /// Reject negative amounts so awards can never lower a balance.
    pub fn validate(&self) -> Result<(), String> {
        for kind in EventKind::ALL {
            if self.flat_amount(kind).is_some_and(|amount| amount < 0) {
                return Err(format!("rewards.{} must not be negative", kind.as_str()));
            }
        }
        if self.teach_back_max < 0 {
            return Err("rewards.teach_back_max must not be negative".to_string());
        }
        Ok(())
    }
}

/// Leaderboard eligibility rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSettings {
    /// Quizzes an account must pass in the period to be eligible
    #[serde(default = "default_min_quizzes")]
    pub min_quizzes_for_eligibility: u32,

    /// Minimum percentile (0-100) for the top cohort
    #[serde(default = "default_percentile_cutoff")]
    pub percentile_cutoff: u32,

    /// Rows returned when the caller gives no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_min_quizzes() -> u32 {
    3
}

fn default_percentile_cutoff() -> u32 {
    90
}

fn default_limit() -> usize {
    50
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            min_quizzes_for_eligibility: default_min_quizzes(),
            percentile_cutoff: default_percentile_cutoff(),
            default_limit: default_limit(),
        }
    }
}

/// Circle roster limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleSettings {
    #[serde(default = "default_member_cap")]
    pub default_member_cap: u32,

    #[serde(default = "default_max_member_cap")]
    pub max_member_cap: u32,
}

fn default_member_cap() -> u32 {
    20
}

fn default_max_member_cap() -> u32 {
    100
}

impl Default for CircleSettings {
    fn default() -> Self {
        Self {
            default_member_cap: default_member_cap(),
            max_member_cap: default_max_member_cap(),
        }
    }
}
