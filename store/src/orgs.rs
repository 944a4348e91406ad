use anyhow::{Context, Result};
use fleet_types::{OrgId, Organization};
use rusqlite::{OptionalExtension, Row, params};

use crate::sqlite_util::{ts, ts_col, uuid_col};
use crate::{Store, now};

fn org_from_row(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: OrgId::from_uuid(uuid_col(row, 0)?),
        name: row.get(1)?,
        created_at: ts_col(row, 2)?,
    })
}

impl Store {
    pub fn create_org(&self, name: &str) -> Result<Organization> {
        let org = Organization {
            id: OrgId::new_v4(),
            name: name.to_string(),
            created_at: now(),
        };
        self.conn()?
            .execute(
                "INSERT INTO organizations (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![org.id.to_string(), &org.name, ts(org.created_at)],
            )
            .context("Failed to insert organization")?;
        Ok(org)
    }

    pub fn get_org(&self, id: OrgId) -> Result<Option<Organization>> {
        self.conn()?
            .query_row(
                "SELECT id, name, created_at FROM organizations WHERE id = ?1",
                [id.to_string()],
                org_from_row,
            )
            .optional()
            .context("Failed to load organization")
    }

    /// The oldest organization. New self-registered users join it.
    pub fn first_org(&self) -> Result<Option<Organization>> {
        self.conn()?
            .query_row(
                "SELECT id, name, created_at FROM organizations
                 ORDER BY created_at ASC, rowid ASC LIMIT 1",
                [],
                org_from_row,
            )
            .optional()
            .context("Failed to load first organization")
    }

    pub fn org_count(&self) -> Result<i64> {
        self.conn()?
            .query_row("SELECT COUNT(*) FROM organizations", [], |row| row.get(0))
            .context("Failed to count organizations")
    }

    /// Create `name` when no organization exists yet. Returns the created one.
    pub fn ensure_bootstrap_org(&self, name: &str) -> Result<Option<Organization>> {
        if self.org_count()? > 0 {
            return Ok(None);
        }
        let org = self.create_org(name)?;
        tracing::info!(org_id = %org.id, "Created bootstrap organization {:?}", org.name);
        Ok(Some(org))
    }
}
