use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "curio")]
#[command(about = "Curio - rewards, streaks and leaderboards for learning activity")]
#[command(version)]
struct Cli {
    /// Working directory used to find .curio/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file (overrides .curio/config.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides [database] path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new .curio/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,

        /// Write ~/.curio/config.toml instead of the local file
        #[arg(long)]
        global: bool,
    },

    /// Manage learner accounts
    Account {
        #[command(subcommand)]
        command: cli::account::AccountCommand,
    },

    /// Grant an award for an activity event
    Award(cli::award::AwardArgs),

    /// Record today's check-in and any streak bonus
    Checkin {
        account: String,
    },

    /// Show ledger entries or check-ins for an account
    Ledger {
        account: String,

        /// Show at most this many entries (newest first)
        #[arg(short, long)]
        limit: Option<usize>,

        /// List check-in days instead of ledger entries
        #[arg(long)]
        checkins: bool,
    },

    /// Show the monthly leaderboard
    Leaderboard(cli::leaderboard::LeaderboardArgs),

    /// Show one account's leaderboard position
    Position(cli::leaderboard::PositionArgs),

    /// Manage study circles
    Circle {
        #[command(subcommand)]
        command: cli::circle::CircleCommand,
    },

    /// Recompute an account's balance from its canonical ledger entries
    Reset {
        account: String,

        /// Reason stored in the reset audit log
        #[arg(long)]
        reason: Option<String>,

        /// Show past resets instead of performing one
        #[arg(long)]
        history: bool,
    },

    /// Rebuild an account's streak from its check-in history
    Reconcile {
        account: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Determine the working directory
    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    if let Commands::Init { force, global } = cli.command {
        return cli::init::init_command(&work_dir, force, global).await;
    }

    let ctx = cli::AppContext::load(&work_dir, cli.config.as_deref(), cli.db, cli.json)?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Account { command } => {
            cli::account::account_command(&ctx, command).await?;
        }
        Commands::Award(args) => {
            cli::award::award_command(&ctx, args).await?;
        }
        Commands::Checkin { account } => {
            cli::award::checkin_command(&ctx, &account).await?;
        }
        Commands::Ledger {
            account,
            limit,
            checkins,
        } => {
            cli::ledger::ledger_command(&ctx, &account, limit, checkins).await?;
        }
        Commands::Leaderboard(args) => {
            cli::leaderboard::leaderboard_command(&ctx, args).await?;
        }
        Commands::Position(args) => {
            cli::leaderboard::position_command(&ctx, args).await?;
        }
        Commands::Circle { command } => {
            cli::circle::circle_command(&ctx, command).await?;
        }
        Commands::Reset {
            account,
            reason,
            history,
        } => {
            if history {
                cli::profile::reset_history_command(&ctx, &account).await?;
            } else {
                cli::profile::reset_command(&ctx, &account, reason).await?;
            }
        }
        Commands::Reconcile { account } => {
            cli::profile::reconcile_command(&ctx, &account).await?;
        }
    }

    Ok(())
}
