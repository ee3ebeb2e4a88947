//! Persistent store for accounts, the award ledger, check-ins and circles
//!
//! Everything lives in one SQLite database (`~/.curio/curio.db` by default).
//!
//! # Usage
//!
//! ```ignore
//! let store = CurioStore::open(&config)?;
//! store.accounts().ensure_account("ada", Some("Ada"))?;
//! let entries = store.ledger().entries_for("ada")?;
//! ```

mod accounts;
mod circles;
mod db;
pub(crate) mod ledger;
mod models;
mod time_bucket;

pub use accounts::{AccountStore, validate_account_id};
pub use circles::{CircleStore, INVITE_CODE_LEN, generate_invite_code};
pub use db::CurioDb;
pub use ledger::LedgerStore;
pub use models::{
    Account, AccountReset, AppendOutcome, CheckinRecord, Circle, CircleMember, CircleRole,
    LedgerEntry, NewLedgerEntry,
};
pub use time_bucket::{date_key, day_bucket, month_bucket, month_key, parse_day_bucket};

pub(crate) use accounts::require_account;
pub(crate) use circles::{is_member, require_circle};

use std::path::Path;

use crate::config::{CircleSettings, Config};
use crate::domain::Result;

/// Entry point to the stores, sharing one database handle
#[derive(Clone)]
pub struct CurioStore {
    db: CurioDb,
    circle_settings: CircleSettings,
}

impl CurioStore {
    /// Open the database configured in `config`
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_path(&config.database_path(), config.circles.clone())
    }

    pub fn with_path(path: &Path, circle_settings: CircleSettings) -> Result<Self> {
        Ok(Self {
            db: CurioDb::open(path)?,
            circle_settings,
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            db: CurioDb::open_in_memory()?,
            circle_settings: CircleSettings::default(),
        })
    }

    pub fn db(&self) -> &CurioDb {
        &self.db
    }

    pub fn accounts(&self) -> AccountStore {
        AccountStore::new(self.db.clone())
    }

    pub fn ledger(&self) -> LedgerStore {
        LedgerStore::new(self.db.clone())
    }

    pub fn circles(&self) -> CircleStore {
        CircleStore::new(self.db.clone(), self.circle_settings.clone())
    }
}
