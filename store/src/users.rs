use anyhow::{Context, Result};
use fleet_types::{AccountStatus, AuthProvider, OrgId, User, UserId, UserRole};
use rusqlite::{OptionalExtension, Row, params};

use crate::sqlite_util::{opt_uuid_col, text_col, ts, ts_col, uuid_col, write_outcome};
use crate::{Store, Write, now};

const USER_COLUMNS: &str = "id, org_id, email, name, picture, provider, provider_id, \
     password_hash, role, status, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::from_uuid(uuid_col(row, 0)?),
        org_id: opt_uuid_col(row, 1)?.map(OrgId::from_uuid),
        email: row.get(2)?,
        name: row.get(3)?,
        picture: row.get(4)?,
        provider: text_col(row, 5, AuthProvider::parse)?,
        provider_id: row.get(6)?,
        password_hash: row.get(7)?,
        role: text_col(row, 8, UserRole::parse)?,
        status: text_col(row, 9, AccountStatus::parse)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
    })
}

impl Store {
    /// Returns [`Write::Duplicate`] when the email or provider identity is taken.
    pub fn insert_user(&self, user: &User) -> Result<Write> {
        let db = self.conn()?;
        write_outcome(db.execute(
            &format!(
                "INSERT INTO users ({USER_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                user.id.to_string(),
                user.org_id.map(|id| id.to_string()),
                &user.email,
                &user.name,
                &user.picture,
                user.provider.as_str(),
                &user.provider_id,
                &user.password_hash,
                user.role.as_str(),
                user.status.as_str(),
                ts(user.created_at),
                ts(user.updated_at),
            ],
        ))
        .with_context(|| format!("Failed to insert user {}", user.email))
    }

    fn find_user(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<User>> {
        self.conn()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}"),
                params,
                user_from_row,
            )
            .optional()
            .context("Failed to load user")
    }

    pub fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.find_user("id = ?1", &[&id.to_string()])
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user("email = ?1", &[&email])
    }

    /// Only users that sign in with a password.
    pub fn email_user(&self, email: &str) -> Result<Option<User>> {
        self.find_user(
            "email = ?1 AND provider = ?2",
            &[&email, &AuthProvider::Email.as_str()],
        )
    }

    pub fn user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>> {
        self.find_user(
            "provider = ?1 AND provider_id = ?2",
            &[&provider.as_str(), &provider_id],
        )
    }

    /// Refresh the display fields an OAuth provider reports on each login.
    pub fn update_user_profile(
        &self,
        id: UserId,
        name: &str,
        picture: Option<&str>,
    ) -> Result<()> {
        self.conn()?
            .execute(
                "UPDATE users SET name = ?2, picture = ?3, updated_at = ?4 WHERE id = ?1",
                params![id.to_string(), name, picture, ts(now())],
            )
            .context("Failed to update user profile")?;
        Ok(())
    }

    pub fn set_user_status(&self, id: UserId, status: AccountStatus) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE users SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), status.as_str(), ts(now())],
            )
            .context("Failed to update user status")?;
        Ok(changed > 0)
    }
}
