//! Title tiers
//!
//! Maps a cumulative mCurio balance to a tier label.

use serde::Serialize;

use crate::domain::MicroCurio;

/// Title definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Title {
    pub tier: u32,
    pub threshold: MicroCurio,
    pub name: &'static str,
}

/// All title tiers (must be sorted by threshold, ascending)
pub static TITLES: &[Title] = &[
    Title {
        tier: 1,
        threshold: 0,
        name: "Curious Mind",
    },
    Title {
        tier: 2,
        threshold: 25_000,
        name: "Apprentice",
    },
    Title {
        tier: 3,
        threshold: 75_000,
        name: "Explorer",
    },
    Title {
        tier: 4,
        threshold: 150_000,
        name: "Scholar",
    },
    Title {
        tier: 5,
        threshold: 300_000,
        name: "Sage",
    },
    Title {
        tier: 6,
        threshold: 600_000,
        name: "Luminary",
    },
];

/// Progress toward the next tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleProgress {
    /// Cumulative balance
    pub current: MicroCurio,
    /// Balance needed for the next tier
    pub required: MicroCurio,
    /// Progress through the current tier band, 0-100
    pub percentage: u8,
    pub next_title: &'static str,
}

impl Title {
    /// Title held at the given balance
    pub fn for_balance(balance: MicroCurio) -> &'static Title {
        let idx = TITLES.partition_point(|t| t.threshold <= balance);
        &TITLES[idx.saturating_sub(1)]
    }

    /// Look up a tier by its stored name
    pub fn by_name(name: &str) -> Option<&'static Title> {
        TITLES.iter().find(|t| t.name == name)
    }

    pub fn next(&self) -> Option<&'static Title> {
        TITLES.iter().find(|t| t.tier == self.tier + 1)
    }

    pub fn is_top(&self) -> bool {
        self.next().is_none()
    }
}

/// Resolve the title name for a balance
pub fn resolve_title(balance: MicroCurio) -> &'static str {
    Title::for_balance(balance).name
}

/// Progress to the next tier, `None` at the top tier
pub fn next_title_progress(balance: MicroCurio) -> Option<TitleProgress> {
    let current = Title::for_balance(balance);
    let next = current.next()?;
    let band = next.threshold - current.threshold;
    let into_band = (balance - current.threshold).max(0);
    let percentage = (into_band * 100 / band).min(100) as u8;
    Some(TitleProgress {
        current: balance,
        required: next.threshold,
        percentage,
        next_title: next.name,
    })
}
