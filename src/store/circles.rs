//! Circle registry
//!
//! Thin roster management backing circle-scoped leaderboards. Invite codes
//! are 8 characters from an alphabet without look-alike glyphs.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use super::accounts::require_account;
use super::db::CurioDb;
use super::models::{Circle, CircleMember, CircleRole};
use crate::config::CircleSettings;
use crate::domain::{CurioError, Result};

pub const INVITE_CODE_LEN: usize = 8;
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const MAX_CODE_ATTEMPTS: usize = 8;
const MAX_NAME_LEN: usize = 60;

const CIRCLE_COLUMNS: &str = "circle_id, name, invite_code, owner_id, member_cap, created_at";

#[derive(Clone)]
pub struct CircleStore {
    db: CurioDb,
    settings: CircleSettings,
}

impl CircleStore {
    pub fn new(db: CurioDb, settings: CircleSettings) -> Self {
        Self { db, settings }
    }

    /// Create a circle owned by `owner_id`, who becomes its first member.
    pub fn create(&self, owner_id: &str, name: &str, member_cap: Option<u32>) -> Result<Circle> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(CurioError::InvalidInput(format!(
                "circle name must be 1-{MAX_NAME_LEN} characters"
            )));
        }
        let cap = member_cap.unwrap_or(self.settings.default_member_cap);
        if !(2..=self.settings.max_member_cap).contains(&cap) {
            return Err(CurioError::InvalidInput(format!(
                "member cap must be between 2 and {}",
                self.settings.max_member_cap
            )));
        }

        let now = Utc::now().timestamp_millis();
        let circle = self.db.write(|tx| {
            require_account(tx, owner_id)?;
            let invite_code = unused_invite_code(tx)?;
            let circle = Circle {
                circle_id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                invite_code,
                owner_id: owner_id.to_string(),
                member_cap: cap,
                created_at: now,
            };
            tx.execute(
                "INSERT INTO circles
                    (circle_id, name, invite_code, owner_id, member_cap, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    circle.circle_id,
                    circle.name,
                    circle.invite_code,
                    circle.owner_id,
                    circle.member_cap,
                    circle.created_at
                ],
            )?;
            insert_member(tx, &circle.circle_id, owner_id, CircleRole::Owner, now)?;
            Ok(circle)
        })?;

        info!(circle_id = %circle.circle_id, owner_id, "circle created");
        Ok(circle)
    }

    /// Join by invite code. Joining a circle twice returns the existing membership.
    pub fn join(&self, account_id: &str, invite_code: &str) -> Result<CircleMember> {
        let code = invite_code.trim().to_uppercase();
        let now = Utc::now().timestamp_millis();
        let member = self.db.write(|tx| {
            require_account(tx, account_id)?;
            let circle = tx
                .query_row(
                    &format!("SELECT {CIRCLE_COLUMNS} FROM circles WHERE invite_code = ?1"),
                    [&code],
                    row_to_circle,
                )
                .optional()?
                .ok_or_else(|| CurioError::NotFound(format!("invite code {code}")))?;

            if let Some(existing) = find_member(tx, &circle.circle_id, account_id)? {
                return Ok(existing);
            }
            if member_count(tx, &circle.circle_id)? >= circle.member_cap {
                return Err(CurioError::CircleFull {
                    circle_id: circle.circle_id,
                    cap: circle.member_cap,
                });
            }
            insert_member(tx, &circle.circle_id, account_id, CircleRole::Member, now)
        })?;

        info!(circle_id = %member.circle_id, account_id, "joined circle");
        Ok(member)
    }

    /// Remove the caller's own membership. Owners delete instead.
    pub fn leave(&self, account_id: &str, circle_id: &str) -> Result<()> {
        self.db.write(|tx| {
            let member = find_member(tx, circle_id, account_id)?.ok_or_else(|| {
                CurioError::NotFound(format!("{account_id} is not in circle {circle_id}"))
            })?;
            if member.role == CircleRole::Owner {
                return Err(CurioError::Forbidden(
                    "the owner cannot leave a circle; delete it instead".into(),
                ));
            }
            tx.execute(
                "DELETE FROM circle_members WHERE circle_id = ?1 AND account_id = ?2",
                params![circle_id, account_id],
            )?;
            Ok(())
        })?;
        info!(circle_id, account_id, "left circle");
        Ok(())
    }

    /// Owner-only. Memberships go with the circle.
    pub fn delete(&self, actor_id: &str, circle_id: &str) -> Result<()> {
        self.db.write(|tx| {
            let circle = require_circle(tx, circle_id)?;
            if circle.owner_id != actor_id {
                return Err(CurioError::Forbidden(format!(
                    "only the owner can delete circle {circle_id}"
                )));
            }
            tx.execute("DELETE FROM circles WHERE circle_id = ?1", [circle_id])?;
            Ok(())
        })?;
        info!(circle_id, actor_id, "circle deleted");
        Ok(())
    }

    /// Owner-only promotion/demotion between admin and member.
    pub fn set_role(
        &self,
        actor_id: &str,
        circle_id: &str,
        target_id: &str,
        role: CircleRole,
    ) -> Result<CircleMember> {
        if role == CircleRole::Owner {
            return Err(CurioError::InvalidInput("ownership cannot be assigned".into()));
        }
        self.db.write(|tx| {
            let circle = require_circle(tx, circle_id)?;
            if circle.owner_id != actor_id {
                return Err(CurioError::Forbidden(format!(
                    "only the owner can change roles in circle {circle_id}"
                )));
            }
            if target_id == circle.owner_id {
                return Err(CurioError::InvalidInput("the owner's role cannot change".into()));
            }
            let updated = tx.execute(
                "UPDATE circle_members SET role = ?3 WHERE circle_id = ?1 AND account_id = ?2",
                params![circle_id, target_id, role.as_str()],
            )?;
            if updated == 0 {
                return Err(CurioError::NotFound(format!(
                    "{target_id} is not in circle {circle_id}"
                )));
            }
            find_member(tx, circle_id, target_id)?
                .ok_or_else(|| CurioError::NotFound(format!("{target_id} in {circle_id}")))
        })
    }

    pub fn get(&self, circle_id: &str) -> Result<Circle> {
        self.db.read(|conn| require_circle(conn, circle_id))
    }

    pub fn members(&self, circle_id: &str) -> Result<Vec<CircleMember>> {
        self.db.read(|conn| {
            require_circle(conn, circle_id)?;
            let mut stmt = conn.prepare(
                "SELECT circle_id, account_id, role, joined_at FROM circle_members
                 WHERE circle_id = ?1 ORDER BY joined_at, account_id",
            )?;
            let rows = stmt.query_map([circle_id], row_to_member)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Circles the account currently belongs to
    pub fn circles_for(&self, account_id: &str) -> Result<Vec<Circle>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.circle_id, c.name, c.invite_code, c.owner_id, c.member_cap, c.created_at
                 FROM circles c JOIN circle_members m ON m.circle_id = c.circle_id
                 WHERE m.account_id = ?1 ORDER BY c.created_at",
            )?;
            let rows = stmt.query_map([account_id], row_to_circle)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

pub(crate) fn require_circle(conn: &Connection, circle_id: &str) -> Result<Circle> {
    conn.query_row(
        &format!("SELECT {CIRCLE_COLUMNS} FROM circles WHERE circle_id = ?1"),
        [circle_id],
        row_to_circle,
    )
    .optional()?
    .ok_or_else(|| CurioError::NotFound(format!("circle {circle_id}")))
}

pub(crate) fn is_member(conn: &Connection, circle_id: &str, account_id: &str) -> Result<bool> {
    Ok(find_member(conn, circle_id, account_id)?.is_some())
}

fn find_member(
    conn: &Connection,
    circle_id: &str,
    account_id: &str,
) -> Result<Option<CircleMember>> {
    let member = conn
        .query_row(
            "SELECT circle_id, account_id, role, joined_at FROM circle_members
             WHERE circle_id = ?1 AND account_id = ?2",
            params![circle_id, account_id],
            row_to_member,
        )
        .optional()?;
    Ok(member)
}

fn member_count(conn: &Connection, circle_id: &str) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM circle_members WHERE circle_id = ?1",
        [circle_id],
        |r| r.get(0),
    )?)
}

fn insert_member(
    conn: &Connection,
    circle_id: &str,
    account_id: &str,
    role: CircleRole,
    joined_at: i64,
) -> Result<CircleMember> {
    conn.execute(
        "INSERT INTO circle_members (circle_id, account_id, role, joined_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![circle_id, account_id, role.as_str(), joined_at],
    )?;
    Ok(CircleMember {
        circle_id: circle_id.to_string(),
        account_id: account_id.to_string(),
        role,
        joined_at,
    })
}

fn unused_invite_code(conn: &Connection) -> Result<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_invite_code()?;
        let taken: bool = conn
            .query_row("SELECT 1 FROM circles WHERE invite_code = ?1", [&code], |_| Ok(()))
            .optional()?
            .is_some();
        if !taken {
            return Ok(code);
        }
    }
    Err(CurioError::Unavailable("could not allocate a unique invite code".into()))
}

/// Random invite code, rejection-sampled so every symbol is equally likely.
pub fn generate_invite_code() -> Result<String> {
    let limit = (256 / INVITE_ALPHABET.len() * INVITE_ALPHABET.len()) as u8;
    let mut code = String::with_capacity(INVITE_CODE_LEN);
    let mut buf = [0u8; 32];
    while code.len() < INVITE_CODE_LEN {
        getrandom::getrandom(&mut buf)
            .map_err(|e| CurioError::Unavailable(format!("random source: {e}")))?;
        for b in buf.iter().filter(|b| **b < limit) {
            if code.len() == INVITE_CODE_LEN {
                break;
            }
            code.push(INVITE_ALPHABET[*b as usize % INVITE_ALPHABET.len()] as char);
        }
    }
    Ok(code)
}

fn row_to_circle(row: &Row<'_>) -> rusqlite::Result<Circle> {
    Ok(Circle {
        circle_id: row.get(0)?,
        name: row.get(1)?,
        invite_code: row.get(2)?,
        owner_id: row.get(3)?,
        member_cap: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_member(row: &Row<'_>) -> rusqlite::Result<CircleMember> {
    let role: String = row.get(2)?;
    Ok(CircleMember {
        circle_id: row.get(0)?,
        account_id: row.get(1)?,
        role: CircleRole::parse(&role).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        joined_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AccountStore;

    fn setup(accounts: &[&str]) -> CircleStore {
        let db = CurioDb::open_in_memory().unwrap();
        let store = AccountStore::new(db.clone());
        for id in accounts {
            store.ensure_account(id, None).unwrap();
        }
        CircleStore::new(db, CircleSettings::default())
    }

    #[test]
    fn test_invite_code_shape() {
        for _ in 0..50 {
            let code = generate_invite_code().unwrap();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.bytes().all(|b| INVITE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_create_join_leave() {
        let circles = setup(&["owner", "bea", "cy"]);
        let circle = circles.create("owner", "Night Readers", None).unwrap();

        circles.join("bea", &circle.invite_code.to_lowercase()).unwrap();
        let again = circles.join("bea", &circle.invite_code).unwrap();
        assert_eq!(again.role, CircleRole::Member);
        assert_eq!(circles.members(&circle.circle_id).unwrap().len(), 2);

        circles.leave("bea", &circle.circle_id).unwrap();
        assert_eq!(circles.members(&circle.circle_id).unwrap().len(), 1);
        assert!(matches!(
            circles.leave("owner", &circle.circle_id),
            Err(CurioError::Forbidden(_))
        ));
    }

    #[test]
    fn test_member_cap_enforced() {
        let circles = setup(&["owner", "bea", "cy"]);
        let circle = circles.create("owner", "Pair", Some(2)).unwrap();
        circles.join("bea", &circle.invite_code).unwrap();
        assert!(matches!(
            circles.join("cy", &circle.invite_code),
            Err(CurioError::CircleFull { cap: 2, .. })
        ));
    }

    #[test]
    fn test_delete_is_owner_only_and_cascades() {
        let circles = setup(&["owner", "bea"]);
        let circle = circles.create("owner", "Study", None).unwrap();
        circles.join("bea", &circle.invite_code).unwrap();

        assert!(matches!(
            circles.delete("bea", &circle.circle_id),
            Err(CurioError::Forbidden(_))
        ));
        circles.delete("owner", &circle.circle_id).unwrap();
        assert!(matches!(circles.get(&circle.circle_id), Err(CurioError::NotFound(_))));
        assert!(circles.circles_for("bea").unwrap().is_empty());
    }

    #[test]
    fn test_set_role() {
        let circles = setup(&["owner", "bea"]);
        let circle = circles.create("owner", "Study", None).unwrap();
        circles.join("bea", &circle.invite_code).unwrap();

        let promoted = circles
            .set_role("owner", &circle.circle_id, "bea", CircleRole::Admin)
            .unwrap();
        assert_eq!(promoted.role, CircleRole::Admin);
        assert!(circles
            .set_role("bea", &circle.circle_id, "owner", CircleRole::Member)
            .is_err());
    }
}
