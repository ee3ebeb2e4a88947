//! Award and check-in command implementations

use anyhow::{Result, bail};
use clap::Args;

use curio::{ActivityContext, AwardResult, Difficulty, EventKind, IdempotencyKey, format_curio};

use super::{AppContext, print_json};

#[derive(Args)]
pub struct AwardArgs {
    pub account: String,

    /// Event kind, e.g. quiz_passed or section_completed
    pub kind: String,

    /// Idempotency key; derived from the context flags when omitted
    #[arg(long)]
    pub key: Option<String>,

    /// Quiz difficulty: skim, solid or deep
    #[arg(long)]
    pub difficulty: Option<String>,

    /// Score in percent (0-100)
    #[arg(long)]
    pub score: Option<u32>,

    /// Attempt number for this course, starting at 1
    #[arg(long)]
    pub attempt: Option<i64>,

    /// Attempt id for quiz, ELI5 and teach-back keys; question id for question_asked
    #[arg(long)]
    pub attempt_id: Option<String>,

    #[arg(long)]
    pub course: Option<String>,

    /// Section id, or lesson id for lesson_completed
    #[arg(long)]
    pub section: Option<String>,
}

/// Grant one award
pub async fn award_command(ctx: &AppContext, args: AwardArgs) -> Result<()> {
    let kind: EventKind = args.kind.parse()?;
    let difficulty = args
        .difficulty
        .as_deref()
        .map(str::parse::<Difficulty>)
        .transpose()?;
    let activity = ActivityContext {
        difficulty,
        score_percent: args.score,
        attempt_number: args.attempt,
        attempt_id: args.attempt_id.clone(),
        course_id: args.course.clone(),
        section_id: args.section.clone(),
    };
    let key = match &args.key {
        Some(raw) => IdempotencyKey::custom(raw.clone())?,
        None => derive_key(&args.account, kind, &activity)?,
    };

    let result = ctx.awards().award(&args.account, kind, &activity, &key)?;
    if ctx.json {
        return print_json(&result);
    }
    print_award(&result);
    Ok(())
}

/// Daily check-in for today
pub async fn checkin_command(ctx: &AppContext, account: &str) -> Result<()> {
    let result = ctx.awards().daily_checkin(account)?;
    if ctx.json {
        return print_json(&result);
    }

    print_award(&result.checkin);
    if let Some(bonus) = &result.streak_bonus {
        print_award(bonus);
    }
    println!(
        "Streak: {} day(s), longest {}",
        result.checkin.streak.current, result.checkin.streak.longest
    );
    println!("Balance: {} Curio", format_curio(result.final_balance()));
    Ok(())
}

fn print_award(result: &AwardResult) {
    if result.already_granted {
        println!("{}: already granted", result.kind.label());
        return;
    }

    println!(
        "{}: +{} Curio (balance {})",
        result.kind.label(),
        format_curio(result.amount_granted),
        format_curio(result.new_balance)
    );
    for term in &result.breakdown {
        match &term.detail {
            Some(detail) => println!(
                "    {:<28} {:>8}  {}",
                term.label,
                format_curio(term.amount_micro),
                detail
            ),
            None => println!("    {:<28} {:>8}", term.label, format_curio(term.amount_micro)),
        }
    }
    if let Some(title) = &result.new_title {
        println!("New title: {title}");
    }
}

/// Build the standard key for a kind from the flags that identify the activity
fn derive_key(
    account: &str,
    kind: EventKind,
    activity: &ActivityContext,
) -> Result<IdempotencyKey> {
    let attempt = || match activity.attempt_id.as_deref() {
        Some(id) => Ok(id),
        None => bail!("--attempt-id or --key is required for {kind}"),
    };
    let course = || match activity.course_id.as_deref() {
        Some(id) => Ok(id),
        None => bail!("--course or --key is required for {kind}"),
    };
    let section = || match activity.section_id.as_deref() {
        Some(id) => Ok(id),
        None => bail!("--section or --key is required for {kind}"),
    };

    let key = match kind {
        EventKind::QuizPassed => IdempotencyKey::quiz(account, attempt()?),
        EventKind::Eli5Passed => IdempotencyKey::eli5(account, attempt()?),
        EventKind::TeachBackBonus => IdempotencyKey::teach_back(account, attempt()?),
        EventKind::SectionCompleted => IdempotencyKey::section(account, course()?, section()?),
        EventKind::LessonCompleted => IdempotencyKey::lesson(account, course()?, section()?),
        EventKind::CourseStarted | EventKind::CourseCompleted => {
            IdempotencyKey::course(account, kind, course()?)
        }
        EventKind::QuestionAsked => IdempotencyKey::question(account, attempt()?),
        EventKind::DailyCheckin | EventKind::StreakMaintained => {
            bail!("use `curio checkin` for {kind}")
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_for_section() {
        let activity = ActivityContext {
            course_id: Some("rust".into()),
            section_id: Some("ownership".into()),
            ..ActivityContext::default()
        };
        let key = derive_key("ada", EventKind::SectionCompleted, &activity).unwrap();
        assert_eq!(key, IdempotencyKey::section("ada", "rust", "ownership"));
    }

    #[test]
    fn test_derive_key_requires_attempt_for_quiz() {
        let err =
            derive_key("ada", EventKind::QuizPassed, &ActivityContext::default()).unwrap_err();
        assert!(err.to_string().contains("--attempt-id"));
    }

    #[test]
    fn test_checkin_kinds_are_refused() {
        assert!(derive_key("ada", EventKind::DailyCheckin, &ActivityContext::default()).is_err());
    }
}
