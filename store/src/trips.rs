use anyhow::{Context, Result};
use fleet_types::{
    DriverId, DriverSummary, OrgId, Trip, TripId, TripStatus, VehicleId, VehicleSummary,
};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;
use crate::sqlite_util::{opt_ts, opt_ts_col, text_col, ts, ts_col, uuid_col};

const TRIP_SELECT: &str = "SELECT t.id, t.org_id, t.vehicle_id, t.driver_id, t.start_at, t.end_at,
            t.start_mileage, t.end_mileage, t.status, t.notes, t.created_at, t.updated_at,
            v.make, v.model, v.registration, d.name
     FROM trips t
     JOIN vehicles v ON v.id = t.vehicle_id
     JOIN drivers d ON d.id = t.driver_id";

fn trip_from_row(row: &Row<'_>) -> rusqlite::Result<Trip> {
    let vehicle_id = VehicleId::from_uuid(uuid_col(row, 2)?);
    let driver_id = DriverId::from_uuid(uuid_col(row, 3)?);
    Ok(Trip {
        id: TripId::from_uuid(uuid_col(row, 0)?),
        org_id: OrgId::from_uuid(uuid_col(row, 1)?),
        vehicle_id,
        driver_id,
        start_at: ts_col(row, 4)?,
        end_at: opt_ts_col(row, 5)?,
        start_mileage: row.get(6)?,
        end_mileage: row.get(7)?,
        status: text_col(row, 8, TripStatus::parse)?,
        notes: row.get(9)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
        vehicle: VehicleSummary {
            id: vehicle_id,
            make: row.get(12)?,
            model: row.get(13)?,
            registration: row.get(14)?,
        },
        driver: DriverSummary {
            id: driver_id,
            name: row.get(15)?,
        },
    })
}

impl Store {
    /// Latest start first.
    pub fn list_trips(&self, org_id: OrgId) -> Result<Vec<Trip>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "{TRIP_SELECT} WHERE t.org_id = ?1 ORDER BY t.start_at DESC, t.id ASC"
            ))
            .context("Failed to prepare trip list query")?;
        stmt.query_map([org_id.to_string()], trip_from_row)
            .context("Failed to query trips")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read trip row")
    }

    pub fn get_trip(&self, org_id: OrgId, id: TripId) -> Result<Option<Trip>> {
        self.conn()?
            .query_row(
                &format!("{TRIP_SELECT} WHERE t.id = ?1 AND t.org_id = ?2"),
                [id.to_string(), org_id.to_string()],
                trip_from_row,
            )
            .optional()
            .context("Failed to load trip")
    }

    pub fn insert_trip(&self, trip: &Trip) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO trips (id, org_id, vehicle_id, driver_id, start_at, end_at,
                                    start_mileage, end_mileage, status, notes,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    trip.id.to_string(),
                    trip.org_id.to_string(),
                    trip.vehicle_id.to_string(),
                    trip.driver_id.to_string(),
                    ts(trip.start_at),
                    opt_ts(trip.end_at),
                    trip.start_mileage,
                    trip.end_mileage,
                    trip.status.as_str(),
                    &trip.notes,
                    ts(trip.created_at),
                    ts(trip.updated_at),
                ],
            )
            .context("Failed to insert trip")?;
        Ok(())
    }

    /// Only the progress columns change after creation.
    pub fn update_trip(&self, trip: &Trip) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE trips
                 SET end_at = ?3, end_mileage = ?4, status = ?5, notes = ?6, updated_at = ?7
                 WHERE id = ?1 AND org_id = ?2",
                params![
                    trip.id.to_string(),
                    trip.org_id.to_string(),
                    opt_ts(trip.end_at),
                    trip.end_mileage,
                    trip.status.as_str(),
                    &trip.notes,
                    ts(trip.updated_at),
                ],
            )
            .context("Failed to update trip")?;
        Ok(changed > 0)
    }

    pub fn delete_trip(&self, org_id: OrgId, id: TripId) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM trips WHERE id = ?1 AND org_id = ?2",
                [id.to_string(), org_id.to_string()],
            )
            .context("Failed to delete trip")?;
        Ok(deleted > 0)
    }
}
