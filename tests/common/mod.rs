//! Shared test utilities for store-backed integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use curio::config::CircleSettings;
use curio::{ActivityContext, AwardService, Config, CurioStore, EventKind, IdempotencyKey};

/// A file-backed store in a temporary directory
pub struct TestEnv {
    pub dir: TempDir,
    pub store: CurioStore,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = CurioStore::with_path(&dir.path().join("curio.db"), CircleSettings::default())
            .expect("Failed to open store");
        Self { dir, store }
    }

    /// A second, independent connection to the same database file
    pub fn reopen(&self) -> CurioStore {
        CurioStore::with_path(&self.dir.path().join("curio.db"), CircleSettings::default())
            .expect("Failed to reopen store")
    }

    pub fn awards(&self) -> AwardService {
        AwardService::new(self.store.clone(), Config::default().rewards)
    }

    pub fn account(&self, id: &str) {
        self.store
            .accounts()
            .ensure_account(id, None)
            .expect("Failed to create account");
    }

    /// Grant a section completion at `at`, keyed by `section`
    pub fn section(&self, account: &str, section: &str, at: DateTime<Utc>) {
        self.awards()
            .award_at(
                account,
                EventKind::SectionCompleted,
                &ActivityContext::default(),
                &IdempotencyKey::section(account, "course", section),
                at,
            )
            .expect("Failed to award section");
    }
}

/// Noon UTC on the given day
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}
