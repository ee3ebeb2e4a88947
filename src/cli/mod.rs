//! CLI command implementations

pub mod account;
pub mod award;
pub mod circle;
pub mod init;
pub mod leaderboard;
pub mod ledger;
pub mod profile;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use curio::{AwardService, Config, CurioStore, LeaderboardAggregator, ProfileService};

/// Loaded configuration and an open store, shared by every command
pub struct AppContext {
    pub config: Config,
    pub store: CurioStore,
    pub json: bool,
}

impl AppContext {
    pub fn load(
        work_dir: &Path,
        config_path: Option<&Path>,
        db_path: Option<PathBuf>,
        json: bool,
    ) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Config::from_file(path)?,
            None => Config::from_dir(work_dir)?,
        };
        if let Some(path) = db_path {
            config.database.path = Some(path);
        }

        let db = config.database_path();
        debug!(path = %db.display(), "opening database");
        let store = CurioStore::open(&config)
            .with_context(|| format!("Failed to open database: {}", db.display()))?;

        Ok(Self {
            config,
            store,
            json,
        })
    }

    pub fn awards(&self) -> AwardService {
        AwardService::new(self.store.clone(), self.config.rewards.clone())
    }

    pub fn profiles(&self) -> ProfileService {
        ProfileService::new(self.store.clone())
    }

    pub fn leaderboard(&self) -> LeaderboardAggregator {
        LeaderboardAggregator::new(self.store.clone(), self.config.leaderboard.clone())
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
