use anyhow::{Context, Result};
use fleet_types::{Location, LocationId, LocationStatus, LocationType, OrgId};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;
use crate::sqlite_util::{text_col, ts, ts_col, uuid_col};

const LOCATION_COLUMNS: &str =
    "id, org_id, name, type, address, status, created_at, updated_at";

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: LocationId::from_uuid(uuid_col(row, 0)?),
        org_id: OrgId::from_uuid(uuid_col(row, 1)?),
        name: row.get(2)?,
        location_type: text_col(row, 3, LocationType::parse)?,
        address: row.get(4)?,
        status: text_col(row, 5, LocationStatus::parse)?,
        created_at: ts_col(row, 6)?,
        updated_at: ts_col(row, 7)?,
    })
}

impl Store {
    /// Ordered by name; `kind` narrows to one location type.
    pub fn list_locations(
        &self,
        org_id: OrgId,
        kind: Option<LocationType>,
    ) -> Result<Vec<Location>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {LOCATION_COLUMNS} FROM locations
                 WHERE org_id = ?1 AND (?2 IS NULL OR type = ?2)
                 ORDER BY name ASC, id ASC"
            ))
            .context("Failed to prepare location list query")?;
        stmt.query_map(
            params![org_id.to_string(), kind.map(LocationType::as_str)],
            location_from_row,
        )
        .context("Failed to query locations")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read location row")
    }

    pub fn get_location(&self, org_id: OrgId, id: LocationId) -> Result<Option<Location>> {
        self.conn()?
            .query_row(
                &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?1 AND org_id = ?2"),
                [id.to_string(), org_id.to_string()],
                location_from_row,
            )
            .optional()
            .context("Failed to load location")
    }

    pub fn insert_location(&self, location: &Location) -> Result<()> {
        self.conn()?
            .execute(
                &format!(
                    "INSERT INTO locations ({LOCATION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    location.id.to_string(),
                    location.org_id.to_string(),
                    &location.name,
                    location.location_type.as_str(),
                    &location.address,
                    location.status.as_str(),
                    ts(location.created_at),
                    ts(location.updated_at),
                ],
            )
            .context("Failed to insert location")?;
        Ok(())
    }

    pub fn update_location(&self, location: &Location) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE locations
                 SET name = ?3, type = ?4, address = ?5, status = ?6, updated_at = ?7
                 WHERE id = ?1 AND org_id = ?2",
                params![
                    location.id.to_string(),
                    location.org_id.to_string(),
                    &location.name,
                    location.location_type.as_str(),
                    &location.address,
                    location.status.as_str(),
                    ts(location.updated_at),
                ],
            )
            .context("Failed to update location")?;
        Ok(changed > 0)
    }

    pub fn delete_location(&self, org_id: OrgId, id: LocationId) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM locations WHERE id = ?1 AND org_id = ?2",
                [id.to_string(), org_id.to_string()],
            )
            .context("Failed to delete location")?;
        Ok(deleted > 0)
    }
}
