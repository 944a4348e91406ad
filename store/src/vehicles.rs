use anyhow::{Context, Result};
use fleet_types::{OrgId, Vehicle, VehicleId, VehicleStatus};
use rusqlite::{OptionalExtension, Row, params};

use crate::sqlite_util::{opt_ts, opt_ts_col, text_col, ts, ts_col, uuid_col, write_outcome};
use crate::{Store, Write};

const VEHICLE_COLUMNS: &str = "id, org_id, make, model, vin, registration, mileage, \
     purchase_date, status, created_at, updated_at";

fn vehicle_from_row(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: VehicleId::from_uuid(uuid_col(row, 0)?),
        org_id: OrgId::from_uuid(uuid_col(row, 1)?),
        make: row.get(2)?,
        model: row.get(3)?,
        vin: row.get(4)?,
        registration: row.get(5)?,
        mileage: row.get(6)?,
        purchase_date: opt_ts_col(row, 7)?,
        status: text_col(row, 8, VehicleStatus::parse)?,
        created_at: ts_col(row, 9)?,
        updated_at: ts_col(row, 10)?,
    })
}

impl Store {
    /// Most recently updated first.
    pub fn list_vehicles(&self, org_id: OrgId) -> Result<Vec<Vehicle>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE org_id = ?1
                 ORDER BY updated_at DESC, id ASC"
            ))
            .context("Failed to prepare vehicle list query")?;
        stmt.query_map([org_id.to_string()], vehicle_from_row)
            .context("Failed to query vehicles")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read vehicle row")
    }

    /// Up to `limit` `ACTIVE` vehicles, oldest first.
    pub fn active_vehicles(&self, org_id: OrgId, limit: u32) -> Result<Vec<Vehicle>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE org_id = ?1 AND status = ?2
                 ORDER BY created_at ASC, id ASC LIMIT ?3"
            ))
            .context("Failed to prepare active vehicle query")?;
        stmt.query_map(
            params![
                org_id.to_string(),
                VehicleStatus::Active.as_str(),
                i64::from(limit)
            ],
            vehicle_from_row,
        )
        .context("Failed to query active vehicles")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read vehicle row")
    }

    pub fn get_vehicle(&self, org_id: OrgId, id: VehicleId) -> Result<Option<Vehicle>> {
        self.conn()?
            .query_row(
                &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?1 AND org_id = ?2"),
                [id.to_string(), org_id.to_string()],
                vehicle_from_row,
            )
            .optional()
            .context("Failed to load vehicle")
    }

    /// Whether another vehicle of the organization already carries `vin`.
    pub fn vin_in_use(&self, org_id: OrgId, vin: &str, except: Option<VehicleId>) -> Result<bool> {
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM vehicles
                 WHERE org_id = ?1 AND vin = ?2 AND (?3 IS NULL OR id <> ?3)",
                params![org_id.to_string(), vin, except.map(|id| id.to_string())],
                |row| row.get(0),
            )
            .context("Failed to check VIN")?;
        Ok(count > 0)
    }

    /// Returns [`Write::Duplicate`] when the VIN is already used in the org.
    pub fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<Write> {
        let db = self.conn()?;
        write_outcome(db.execute(
            &format!(
                "INSERT INTO vehicles ({VEHICLE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                vehicle.id.to_string(),
                vehicle.org_id.to_string(),
                &vehicle.make,
                &vehicle.model,
                &vehicle.vin,
                &vehicle.registration,
                vehicle.mileage,
                opt_ts(vehicle.purchase_date),
                vehicle.status.as_str(),
                ts(vehicle.created_at),
                ts(vehicle.updated_at),
            ],
        ))
        .context("Failed to insert vehicle")
    }

    /// Overwrite the mutable columns. [`Write::Missing`] if the row is gone.
    pub fn update_vehicle(&self, vehicle: &Vehicle) -> Result<Write> {
        let db = self.conn()?;
        write_outcome(db.execute(
            "UPDATE vehicles
             SET make = ?3, model = ?4, vin = ?5, registration = ?6, mileage = ?7,
                 purchase_date = ?8, status = ?9, updated_at = ?10
             WHERE id = ?1 AND org_id = ?2",
            params![
                vehicle.id.to_string(),
                vehicle.org_id.to_string(),
                &vehicle.make,
                &vehicle.model,
                &vehicle.vin,
                &vehicle.registration,
                vehicle.mileage,
                opt_ts(vehicle.purchase_date),
                vehicle.status.as_str(),
                ts(vehicle.updated_at),
            ],
        ))
        .context("Failed to update vehicle")
    }

    /// Deletes the vehicle with its trips and fuel records.
    pub fn delete_vehicle(&self, org_id: OrgId, id: VehicleId) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM vehicles WHERE id = ?1 AND org_id = ?2",
                [id.to_string(), org_id.to_string()],
            )
            .context("Failed to delete vehicle")?;
        Ok(deleted > 0)
    }
}
