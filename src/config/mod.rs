//! Configuration loading and management

mod io;
mod settings;

pub use settings::{CircleSettings, DatabaseSettings, LeaderboardSettings, RewardSettings};

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub rewards: RewardSettings,

    #[serde(default)]
    pub leaderboard: LeaderboardSettings,

    #[serde(default)]
    pub circles: CircleSettings,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration for a working directory.
    ///
    /// Looks for `.curio/config.toml` in `dir`, then `~/.curio/config.toml`,
    /// and falls back to defaults.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let local = dir.join(".curio/config.toml");
        if local.exists() {
            return Self::from_file(&local);
        }

        let global = Self::global_config_path();
        if global.exists() {
            return Self::from_file(&global);
        }

        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        self.rewards.validate().map_err(anyhow::Error::msg)?;
        if self.leaderboard.percentile_cutoff > 100 {
            anyhow::bail!("leaderboard.percentile_cutoff must be between 0 and 100");
        }
        if self.circles.default_member_cap > self.circles.max_member_cap {
            anyhow::bail!("circles.default_member_cap exceeds circles.max_member_cap");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[rewards]\ndaily_checkin = 7000\n\n[leaderboard]\npercentile_cutoff = 75\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.rewards.daily_checkin, 7_000);
        assert_eq!(config.rewards.section_completed, 5_000);
        assert_eq!(config.leaderboard.percentile_cutoff, 75);
        assert_eq!(config.leaderboard.min_quizzes_for_eligibility, 3);
    }

    #[test]
    fn test_negative_reward_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[rewards]\nquestion_asked = -5\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_local_config_preferred() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".curio")).unwrap();
        std::fs::write(
            dir.path().join(".curio/config.toml"),
            "[circles]\ndefault_member_cap = 8\n",
        )
        .unwrap();

        let config = Config::from_dir(dir.path()).unwrap();
        assert_eq!(config.circles.default_member_cap, 8);
    }
}
