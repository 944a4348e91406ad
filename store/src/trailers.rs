use anyhow::{Context, Result};
use fleet_types::{OrgId, Trailer, TrailerId, VehicleStatus};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;
use crate::sqlite_util::{opt_ts, opt_ts_col, text_col, ts, ts_col, uuid_col};

const TRAILER_COLUMNS: &str = "id, org_id, make, model, registration, mileage, \
     purchase_date, status, created_at, updated_at";

fn trailer_from_row(row: &Row<'_>) -> rusqlite::Result<Trailer> {
    Ok(Trailer {
        id: TrailerId::from_uuid(uuid_col(row, 0)?),
        org_id: OrgId::from_uuid(uuid_col(row, 1)?),
        make: row.get(2)?,
        model: row.get(3)?,
        registration: row.get(4)?,
        mileage: row.get(5)?,
        purchase_date: opt_ts_col(row, 6)?,
        status: text_col(row, 7, VehicleStatus::parse)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

impl Store {
    pub fn list_trailers(&self, org_id: OrgId) -> Result<Vec<Trailer>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {TRAILER_COLUMNS} FROM trailers WHERE org_id = ?1
                 ORDER BY updated_at DESC, id ASC"
            ))
            .context("Failed to prepare trailer list query")?;
        stmt.query_map([org_id.to_string()], trailer_from_row)
            .context("Failed to query trailers")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read trailer row")
    }

    pub fn get_trailer(&self, org_id: OrgId, id: TrailerId) -> Result<Option<Trailer>> {
        self.conn()?
            .query_row(
                &format!("SELECT {TRAILER_COLUMNS} FROM trailers WHERE id = ?1 AND org_id = ?2"),
                [id.to_string(), org_id.to_string()],
                trailer_from_row,
            )
            .optional()
            .context("Failed to load trailer")
    }

    pub fn insert_trailer(&self, trailer: &Trailer) -> Result<()> {
        self.conn()?
            .execute(
                &format!(
                    "INSERT INTO trailers ({TRAILER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    trailer.id.to_string(),
                    trailer.org_id.to_string(),
                    &trailer.make,
                    &trailer.model,
                    &trailer.registration,
                    trailer.mileage,
                    opt_ts(trailer.purchase_date),
                    trailer.status.as_str(),
                    ts(trailer.created_at),
                    ts(trailer.updated_at),
                ],
            )
            .context("Failed to insert trailer")?;
        Ok(())
    }

    pub fn update_trailer(&self, trailer: &Trailer) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE trailers
                 SET make = ?3, model = ?4, registration = ?5, mileage = ?6,
                     purchase_date = ?7, status = ?8, updated_at = ?9
                 WHERE id = ?1 AND org_id = ?2",
                params![
                    trailer.id.to_string(),
                    trailer.org_id.to_string(),
                    &trailer.make,
                    &trailer.model,
                    &trailer.registration,
                    trailer.mileage,
                    opt_ts(trailer.purchase_date),
                    trailer.status.as_str(),
                    ts(trailer.updated_at),
                ],
            )
            .context("Failed to update trailer")?;
        Ok(changed > 0)
    }

    pub fn delete_trailer(&self, org_id: OrgId, id: TrailerId) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM trailers WHERE id = ?1 AND org_id = ?2",
                [id.to_string(), org_id.to_string()],
            )
            .context("Failed to delete trailer")?;
        Ok(deleted > 0)
    }
}
