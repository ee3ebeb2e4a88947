//! Ledger command implementation

use anyhow::Result;
use chrono::{TimeZone, Utc};

use curio::format_curio;

use super::{AppContext, print_json};

/// Show an account's ledger entries or check-in days
pub async fn ledger_command(
    ctx: &AppContext,
    account: &str,
    limit: Option<usize>,
    checkins: bool,
) -> Result<()> {
    // Fails with NotFound for unknown accounts
    ctx.store.accounts().get(account)?;
    let ledger = ctx.store.ledger();

    if checkins {
        let mut days = ledger.checkins_for(account)?;
        days.reverse();
        days.truncate(limit.unwrap_or(usize::MAX));
        if ctx.json {
            return print_json(&days);
        }
        if days.is_empty() {
            println!("No check-ins found.");
        }
        for record in days {
            println!("  {}  (entry #{})", record.day, record.ledger_entry_id);
        }
        return Ok(());
    }

    let mut entries = ledger.entries_for(account)?;
    entries.reverse();
    entries.truncate(limit.unwrap_or(usize::MAX));
    if ctx.json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No ledger entries found.");
        return Ok(());
    }

    println!("Ledger for {} ({} shown):\n", account, entries.len());
    for entry in entries {
        let when = Utc
            .timestamp_millis_opt(entry.created_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| entry.created_at.to_string());
        println!(
            "  #{:<6} {}  {:<20} {:>10}  {}",
            entry.id,
            when,
            entry.kind.as_str(),
            format_curio(entry.amount_micro),
            entry.idempotency_key
        );
    }
    println!(
        "\nLifetime total: {} Curio",
        format_curio(ledger.lifetime_total(account)?)
    );
    Ok(())
}
