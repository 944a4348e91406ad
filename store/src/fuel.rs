use anyhow::{Context, Result};
use fleet_types::{FuelRecord, FuelRecordId, OrgId, TripId, TripSummary, VehicleId, VehicleSummary};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;
use crate::sqlite_util::{opt_ts_col, opt_uuid_col, ts, ts_col, uuid_col};

const FUEL_SELECT: &str = "SELECT f.id, f.org_id, f.vehicle_id, f.trip_id, f.amount_liters,
            f.cost_cents, f.recorded_at, f.notes, f.created_at,
            v.make, v.model, v.registration, t.start_at
     FROM fuel_records f
     JOIN vehicles v ON v.id = f.vehicle_id
     LEFT JOIN trips t ON t.id = f.trip_id";

fn fuel_from_row(row: &Row<'_>) -> rusqlite::Result<FuelRecord> {
    let vehicle_id = VehicleId::from_uuid(uuid_col(row, 2)?);
    let trip_id = opt_uuid_col(row, 3)?.map(TripId::from_uuid);
    let trip_start = opt_ts_col(row, 12)?;
    Ok(FuelRecord {
        id: FuelRecordId::from_uuid(uuid_col(row, 0)?),
        org_id: OrgId::from_uuid(uuid_col(row, 1)?),
        vehicle_id,
        trip_id,
        amount_liters: row.get(4)?,
        cost_cents: row.get(5)?,
        recorded_at: ts_col(row, 6)?,
        notes: row.get(7)?,
        created_at: ts_col(row, 8)?,
        vehicle: VehicleSummary {
            id: vehicle_id,
            make: row.get(9)?,
            model: row.get(10)?,
            registration: row.get(11)?,
        },
        trip: trip_id
            .zip(trip_start)
            .map(|(id, start_at)| TripSummary { id, start_at }),
    })
}

impl Store {
    /// Latest refuel first.
    pub fn list_fuel_records(&self, org_id: OrgId) -> Result<Vec<FuelRecord>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "{FUEL_SELECT} WHERE f.org_id = ?1 ORDER BY f.recorded_at DESC, f.id ASC"
            ))
            .context("Failed to prepare fuel record list query")?;
        stmt.query_map([org_id.to_string()], fuel_from_row)
            .context("Failed to query fuel records")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read fuel record row")
    }

    pub fn get_fuel_record(&self, org_id: OrgId, id: FuelRecordId) -> Result<Option<FuelRecord>> {
        self.conn()?
            .query_row(
                &format!("{FUEL_SELECT} WHERE f.id = ?1 AND f.org_id = ?2"),
                [id.to_string(), org_id.to_string()],
                fuel_from_row,
            )
            .optional()
            .context("Failed to load fuel record")
    }

    pub fn insert_fuel_record(&self, record: &FuelRecord) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO fuel_records (id, org_id, vehicle_id, trip_id, amount_liters,
                                           cost_cents, recorded_at, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id.to_string(),
                    record.org_id.to_string(),
                    record.vehicle_id.to_string(),
                    record.trip_id.map(|id| id.to_string()),
                    record.amount_liters,
                    record.cost_cents,
                    ts(record.recorded_at),
                    &record.notes,
                    ts(record.created_at),
                ],
            )
            .context("Failed to insert fuel record")?;
        Ok(())
    }

    pub fn delete_fuel_record(&self, org_id: OrgId, id: FuelRecordId) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM fuel_records WHERE id = ?1 AND org_id = ?2",
                [id.to_string(), org_id.to_string()],
            )
            .context("Failed to delete fuel record")?;
        Ok(deleted > 0)
    }
}
