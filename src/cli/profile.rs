//! Reset and reconcile command implementations

use anyhow::Result;
use chrono::{TimeZone, Utc};

use curio::format_curio;

use super::{AppContext, print_json};

pub async fn reset_command(ctx: &AppContext, account: &str, reason: Option<String>) -> Result<()> {
    let report = ctx.profiles().reset(account, reason.as_deref())?;
    if ctx.json {
        return print_json(&report);
    }
    println!(
        "Reset {}: {} -> {} Curio ({})",
        report.account_id,
        format_curio(report.balance_before),
        format_curio(report.balance_after),
        report.title
    );
    Ok(())
}

pub async fn reconcile_command(ctx: &AppContext, account: &str) -> Result<()> {
    let streak = ctx
        .profiles()
        .reconcile_streak(account, Utc::now().date_naive())?;
    if ctx.json {
        return print_json(&streak);
    }
    println!(
        "Streak for {}: {} day(s), longest {}",
        account, streak.current, streak.longest
    );
    Ok(())
}

pub async fn reset_history_command(ctx: &AppContext, account: &str) -> Result<()> {
    let resets = ctx.profiles().resets_for(account)?;
    if ctx.json {
        return print_json(&resets);
    }
    if resets.is_empty() {
        println!("No resets for {}.", account);
        return Ok(());
    }
    for reset in resets {
        let when = Utc
            .timestamp_millis_opt(reset.reset_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| reset.reset_at.to_string());
        println!(
            "  {}  {} -> {}  {}",
            when,
            format_curio(reset.balance_before),
            format_curio(reset.balance_after),
            reset.reason.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
