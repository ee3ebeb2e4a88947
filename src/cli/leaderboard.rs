//! Leaderboard and position command implementations

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use curio::{LeaderboardRow, Period, Scope, format_curio};

use super::{AppContext, print_json};

#[derive(Args)]
pub struct LeaderboardArgs {
    /// Rank members of this circle instead of everyone
    #[arg(long)]
    pub circle: Option<String>,

    /// Account viewing the board; required to be a member for --circle
    #[arg(long)]
    pub viewer: Option<String>,

    /// Month as YYYY-MM (defaults to the current UTC month)
    #[arg(long)]
    pub month: Option<String>,

    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct PositionArgs {
    pub account: String,

    #[arg(long)]
    pub circle: Option<String>,

    /// Month as YYYY-MM (defaults to the current UTC month)
    #[arg(long)]
    pub month: Option<String>,
}

pub async fn leaderboard_command(ctx: &AppContext, args: LeaderboardArgs) -> Result<()> {
    let scope = scope_of(args.circle);
    let period = period_of(args.month.as_deref())?;
    let limit = args.limit.unwrap_or(ctx.config.leaderboard.default_limit);

    let aggregator = ctx.leaderboard();
    let board = match &args.viewer {
        Some(viewer) => aggregator.rank_for(viewer, &scope, period, limit)?,
        None => aggregator.rank(&scope, period, limit)?,
    };
    if ctx.json {
        return print_json(&board);
    }

    let heading = match &board.scope {
        Scope::Global => "Global".to_string(),
        Scope::Circle(id) => format!("Circle {id}"),
    };
    println!("{} leaderboard for {} ({} ranked):\n", heading, board.period, board.total_ranked);
    if board.rows.is_empty() {
        println!("  No activity this month.");
    }
    for row in &board.rows {
        print_row(row);
    }
    Ok(())
}

pub async fn position_command(ctx: &AppContext, args: PositionArgs) -> Result<()> {
    let scope = scope_of(args.circle);
    let period = period_of(args.month.as_deref())?;

    let row = ctx.leaderboard().position_of(&args.account, &scope, period)?;
    if ctx.json {
        return print_json(&row);
    }
    if row.rank.is_none() {
        println!("{} has no activity in {}.", args.account, period);
        return Ok(());
    }
    print_row(&row);
    Ok(())
}

fn print_row(row: &LeaderboardRow) {
    let rank = row.rank.map_or_else(|| "-".to_string(), |r| r.to_string());
    let pct = row.percentile.map_or_else(|| "-".to_string(), |p| format!("{p}%"));
    let mut flags = Vec::new();
    if row.is_top_percentile {
        flags.push("top");
    }
    if row.is_eligible {
        flags.push("eligible");
    }
    println!(
        "  {:>4}. {:<24} {:>10} Curio  {:>3} quizzes  {:>4}  {}",
        rank,
        row.display_name.as_deref().unwrap_or(&row.account_id),
        format_curio(row.period_balance_micro),
        row.quiz_pass_count,
        pct,
        flags.join(", ")
    );
}

fn scope_of(circle: Option<String>) -> Scope {
    circle.map_or(Scope::Global, Scope::Circle)
}

fn period_of(month: Option<&str>) -> Result<Period> {
    Ok(match month {
        Some(raw) => raw.parse()?,
        None => Period::containing(Utc::now()),
    })
}
