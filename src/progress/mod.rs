//! Progress tracking: title tiers and check-in streaks

mod streaks;
mod titles;

pub use streaks::{StreakInfo, StreakState, StreakTransition, recompute_from_history};
pub use titles::{TITLES, Title, TitleProgress, next_title_progress, resolve_title};
