//! Init command implementation

use anyhow::{Result, bail};
use std::path::Path;
use tracing::info;

use curio::Config;

/// Default configuration content for curio init
pub const DEFAULT_CONFIG: &str = r#"# Curio Configuration
# ====================
#
# All amounts are in mCurio (1 Curio = 1000 mCurio).

# ============================================================================
# DATABASE
# ============================================================================
#
#   path - SQLite file (default: ~/.curio/curio.db)

[database]
# path = "/var/lib/curio/curio.db"

# ============================================================================
# REWARDS - Flat-rate amounts per event kind
# ============================================================================
#
# Quiz awards are computed from difficulty, score and attempt number and are
# not configured here. Teach-back awards scale linearly up to teach_back_max.

[rewards]
question_asked = 1000
course_started = 2000
section_completed = 5000
lesson_completed = 5000
course_completed = 20000
eli5_passed = 10000
streak_maintained = 2000
daily_checkin = 5000
teach_back_max = 15000

# ============================================================================
# LEADERBOARD
# ============================================================================
#
#   min_quizzes_for_eligibility - Quizzes passed in the month to be eligible
#   percentile_cutoff           - Minimum percentile for the top cohort (0-100)
#   default_limit               - Rows shown when no --limit is given

[leaderboard]
min_quizzes_for_eligibility = 3
percentile_cutoff = 90
default_limit = 50

# ============================================================================
# CIRCLES
# ============================================================================

[circles]
default_member_cap = 20
max_member_cap = 100
"#;

/// Write a default config file
pub async fn init_command(work_dir: &Path, force: bool, global: bool) -> Result<()> {
    let config_path = if global {
        Config::global_config_path()
    } else {
        work_dir.join(".curio/config.toml")
    };

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config_path, DEFAULT_CONFIG)?;

    info!("Created config file: {}", config_path.display());
    println!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses_to_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.rewards, defaults.rewards);
        assert_eq!(parsed.leaderboard, defaults.leaderboard);
        assert_eq!(parsed.circles, defaults.circles);
        assert!(parsed.database.path.is_none());
    }
}
