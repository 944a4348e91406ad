use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fleet_types::{
    FuelReportItem, LocationId, LocationStatus, LocationType, LocationsReportItem, OrgId,
    ReportSummary, StatusCount, TripStatus, TripsReport, TripsReportPerOrg, VehicleId,
};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Store;
use crate::sqlite_util::{opt_ts, text_col, uuid_col};

/// Inclusive time bounds. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    fn bounds(self) -> (Option<String>, Option<String>) {
        (opt_ts(self.from), opt_ts(self.to))
    }
}

fn count(db: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<i64> {
    db.query_row(sql, params, |row| row.get(0))
        .with_context(|| format!("Failed to run count: {sql}"))
}

impl Store {
    /// Record counts; trips and fuel records honour `range`.
    pub fn report_summary(&self, org_id: OrgId, range: DateRange) -> Result<ReportSummary> {
        let org = org_id.to_string();
        let (from, to) = range.bounds();
        let db = self.conn()?;
        Ok(ReportSummary {
            vehicles: count(&db, "SELECT COUNT(*) FROM vehicles WHERE org_id = ?1", &[&org])?,
            drivers: count(&db, "SELECT COUNT(*) FROM drivers WHERE org_id = ?1", &[&org])?,
            trips: count(
                &db,
                "SELECT COUNT(*) FROM trips WHERE org_id = ?1
                 AND (?2 IS NULL OR start_at >= ?2) AND (?3 IS NULL OR start_at <= ?3)",
                &[&org, &from, &to],
            )?,
            fuel_records: count(
                &db,
                "SELECT COUNT(*) FROM fuel_records WHERE org_id = ?1
                 AND (?2 IS NULL OR recorded_at >= ?2) AND (?3 IS NULL OR recorded_at <= ?3)",
                &[&org, &from, &to],
            )?,
            locations: count(&db, "SELECT COUNT(*) FROM locations WHERE org_id = ?1", &[&org])?,
        })
    }

    /// Fuel totals per vehicle. A total cost of zero is reported as `None`.
    pub fn fuel_report(&self, org_id: OrgId, range: DateRange) -> Result<Vec<FuelReportItem>> {
        let (from, to) = range.bounds();
        let db = self.conn()?;
        let mut stmt = db
            .prepare(
                "SELECT v.id, o.name, v.make, v.model,
                        SUM(f.amount_liters), COALESCE(SUM(f.cost_cents), 0), COUNT(*)
                 FROM fuel_records f
                 JOIN vehicles v ON v.id = f.vehicle_id
                 JOIN organizations o ON o.id = v.org_id
                 WHERE f.org_id = ?1
                   AND (?2 IS NULL OR f.recorded_at >= ?2)
                   AND (?3 IS NULL OR f.recorded_at <= ?3)
                 GROUP BY v.id, o.name, v.make, v.model
                 ORDER BY v.make ASC, v.model ASC, v.id ASC",
            )
            .context("Failed to prepare fuel report query")?;
        stmt.query_map(params![org_id.to_string(), from, to], |row| {
            let total_cost: i64 = row.get(5)?;
            Ok(FuelReportItem {
                vehicle_id: VehicleId::from_uuid(uuid_col(row, 0)?),
                org_name: row.get(1)?,
                vehicle_make: row.get(2)?,
                vehicle_model: row.get(3)?,
                total_liters: row.get(4)?,
                total_cost_cents: (total_cost != 0).then_some(total_cost),
                record_count: row.get(6)?,
            })
        })
        .context("Failed to query fuel report")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read fuel report row")
    }

    /// Trip counts by status, overall and for the organization.
    pub fn trips_report(&self, org_id: OrgId, range: DateRange) -> Result<TripsReport> {
        let (from, to) = range.bounds();
        let db = self.conn()?;
        let mut stmt = db
            .prepare(
                "SELECT status, COUNT(*) FROM trips
                 WHERE org_id = ?1
                   AND (?2 IS NULL OR start_at >= ?2)
                   AND (?3 IS NULL OR start_at <= ?3)
                 GROUP BY status",
            )
            .context("Failed to prepare trips report query")?;
        let mut by_status = stmt
            .query_map(params![org_id.to_string(), from, to], |row| {
                Ok(StatusCount {
                    status: text_col(row, 0, TripStatus::parse)?,
                    count: row.get(1)?,
                })
            })
            .context("Failed to query trips report")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read trips report row")?;
        by_status.sort_by_key(|entry| {
            TripStatus::all()
                .iter()
                .position(|status| *status == entry.status)
        });

        let org_name: String = db
            .query_row(
                "SELECT name FROM organizations WHERE id = ?1",
                [org_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read organization name")?
            .unwrap_or_default();
        let total = by_status.iter().map(|entry| entry.count).sum();

        Ok(TripsReport {
            total,
            by_status: by_status.clone(),
            per_org: vec![TripsReportPerOrg {
                org_id,
                org_name,
                total,
                by_status,
            }],
        })
    }

    /// Ordered by type, then name.
    pub fn locations_report(&self, org_id: OrgId) -> Result<Vec<LocationsReportItem>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(
                "SELECT l.id, o.name, l.name, l.type, l.address, l.status
                 FROM locations l
                 JOIN organizations o ON o.id = l.org_id
                 WHERE l.org_id = ?1
                 ORDER BY l.type ASC, l.name ASC, l.id ASC",
            )
            .context("Failed to prepare locations report query")?;
        stmt.query_map([org_id.to_string()], |row| {
            Ok(LocationsReportItem {
                id: LocationId::from_uuid(uuid_col(row, 0)?),
                org_name: row.get(1)?,
                name: row.get(2)?,
                location_type: text_col(row, 3, LocationType::parse)?,
                address: row.get(4)?,
                status: text_col(row, 5, LocationStatus::parse)?,
            })
        })
        .context("Failed to query locations report")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read locations report row")
    }
}
