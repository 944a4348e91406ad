use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fleet_types::{ResetTokenId, UserId};
use rusqlite::{OptionalExtension, params};

use crate::sqlite_util::{ts, ts_col, uuid_col};
use crate::{Store, now};

/// A single-use password reset token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub id: ResetTokenId,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    #[must_use]
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.expires_at < at
    }
}

impl Store {
    pub fn insert_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ResetToken> {
        let record = ResetToken {
            id: ResetTokenId::new_v4(),
            user_id,
            token: token.to_string(),
            expires_at,
            created_at: now(),
        };
        self.conn()?
            .execute(
                "INSERT INTO password_reset_tokens (id, user_id, token, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id.to_string(),
                    record.user_id.to_string(),
                    &record.token,
                    ts(record.expires_at),
                    ts(record.created_at)
                ],
            )
            .context("Failed to insert password reset token")?;
        Ok(record)
    }

    pub fn find_reset_token(&self, token: &str) -> Result<Option<ResetToken>> {
        self.conn()?
            .query_row(
                "SELECT id, user_id, token, expires_at, created_at
                 FROM password_reset_tokens WHERE token = ?1",
                [token],
                |row| {
                    Ok(ResetToken {
                        id: ResetTokenId::from_uuid(uuid_col(row, 0)?),
                        user_id: UserId::from_uuid(uuid_col(row, 1)?),
                        token: row.get(2)?,
                        expires_at: ts_col(row, 3)?,
                        created_at: ts_col(row, 4)?,
                    })
                },
            )
            .optional()
            .context("Failed to load password reset token")
    }

    /// Set the new password hash and delete the token in one transaction.
    /// Returns `false` if the token was already consumed.
    pub fn consume_reset_token(&self, token: &ResetToken, password_hash: &str) -> Result<bool> {
        let mut db = self.conn()?;
        let tx = db
            .transaction()
            .context("Failed to start password reset transaction")?;

        let deleted = tx
            .execute(
                "DELETE FROM password_reset_tokens WHERE id = ?1",
                [token.id.to_string()],
            )
            .context("Failed to delete password reset token")?;
        if deleted == 0 {
            return Ok(false);
        }
        tx.execute(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
            params![token.user_id.to_string(), password_hash, ts(now())],
        )
        .context("Failed to update password")?;

        tx.commit()
            .context("Failed to commit password reset transaction")?;
        Ok(true)
    }

    /// Drop tokens that expired before `at`. Returns how many were removed.
    pub fn purge_expired_reset_tokens(&self, at: DateTime<Utc>) -> Result<usize> {
        self.conn()?
            .execute(
                "DELETE FROM password_reset_tokens WHERE expires_at < ?1",
                [ts(at)],
            )
            .context("Failed to purge expired reset tokens")
    }
}
