//! Account command implementation

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;

use curio::format_curio;
use curio::progress::StreakState;

use super::{AppContext, print_json};

#[derive(Subcommand)]
pub enum AccountCommand {
    /// Create an account (no-op if it exists)
    Create {
        account: String,

        /// Name shown on leaderboards
        #[arg(long)]
        name: Option<String>,
    },

    /// Show balance, title, streak and counters
    Show { account: String },

    /// List all accounts
    List,
}

pub async fn account_command(ctx: &AppContext, command: AccountCommand) -> Result<()> {
    match command {
        AccountCommand::Create { account, name } => {
            let created = ctx.store.accounts().ensure_account(&account, name.as_deref())?;
            if ctx.json {
                return print_json(&created);
            }
            println!("Account {} ({})", created.account_id, created.title);
        }
        AccountCommand::Show { account } => {
            let summary = ctx.profiles().summary(&account, Utc::now().date_naive())?;
            if ctx.json {
                return print_json(&summary);
            }

            let a = &summary.account;
            println!(
                "{}{}",
                a.account_id,
                a.display_name
                    .as_deref()
                    .map(|n| format!(" ({n})"))
                    .unwrap_or_default()
            );
            println!("  Balance: {} Curio", format_curio(a.balance_micro));
            println!("  Title:   {}", a.title);
            if let Some(next) = &summary.next_title {
                println!(
                    "  Next:    {} at {} Curio ({}%)",
                    next.next_title,
                    format_curio(next.required),
                    next.percentage
                );
            }
            let streak = match summary.streak_state {
                StreakState::None => "none".to_string(),
                StreakState::Active(days) => format!("{days} day(s)"),
                StreakState::Broken => "broken".to_string(),
            };
            println!("  Streak:  {} (longest {})", streak, a.longest_streak);
            println!(
                "  Quizzes: {} passed, {} perfect",
                a.quizzes_passed, a.perfect_quizzes
            );
            println!("  Teach-backs: {}", a.teach_backs_passed);
            println!("  Questions:   {}", a.questions_asked);
        }
        AccountCommand::List => {
            let accounts = ctx.store.accounts().list()?;
            if ctx.json {
                return print_json(&accounts);
            }
            if accounts.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }
            println!("Accounts ({}):\n", accounts.len());
            for a in accounts {
                println!(
                    "  {:<24} {:>12} Curio  {}",
                    a.account_id,
                    format_curio(a.balance_micro),
                    a.title
                );
            }
        }
    }
    Ok(())
}
