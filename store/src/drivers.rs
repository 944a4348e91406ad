use anyhow::{Context, Result};
use fleet_types::{Driver, DriverId, DriverStatus, OrgId, UserId, UserSummary};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;
use crate::sqlite_util::{opt_ts, opt_ts_col, opt_uuid_col, text_col, ts, ts_col, uuid_col};

const DRIVER_SELECT: &str = "SELECT d.id, d.org_id, d.name, d.license_number, d.license_expiry,
            d.phone, d.user_id, d.status, d.created_at, d.updated_at,
            u.email, u.name
     FROM drivers d
     LEFT JOIN users u ON u.id = d.user_id";

fn driver_from_row(row: &Row<'_>) -> rusqlite::Result<Driver> {
    let user_id = opt_uuid_col(row, 6)?.map(UserId::from_uuid);
    let user_email: Option<String> = row.get(10)?;
    let user_name: Option<String> = row.get(11)?;
    let user = match (user_id, user_email, user_name) {
        (Some(id), Some(email), Some(name)) => Some(UserSummary { id, email, name }),
        _ => None,
    };
    Ok(Driver {
        id: DriverId::from_uuid(uuid_col(row, 0)?),
        org_id: OrgId::from_uuid(uuid_col(row, 1)?),
        name: row.get(2)?,
        license_number: row.get(3)?,
        license_expiry: opt_ts_col(row, 4)?,
        phone: row.get(5)?,
        user_id,
        status: text_col(row, 7, DriverStatus::parse)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
        user,
    })
}

impl Store {
    pub fn list_drivers(&self, org_id: OrgId) -> Result<Vec<Driver>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "{DRIVER_SELECT} WHERE d.org_id = ?1 ORDER BY d.updated_at DESC, d.id ASC"
            ))
            .context("Failed to prepare driver list query")?;
        stmt.query_map([org_id.to_string()], driver_from_row)
            .context("Failed to query drivers")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read driver row")
    }

    pub fn get_driver(&self, org_id: OrgId, id: DriverId) -> Result<Option<Driver>> {
        self.conn()?
            .query_row(
                &format!("{DRIVER_SELECT} WHERE d.id = ?1 AND d.org_id = ?2"),
                [id.to_string(), org_id.to_string()],
                driver_from_row,
            )
            .optional()
            .context("Failed to load driver")
    }

    /// The embedded `user` summary is not stored; it is joined on read.
    pub fn insert_driver(&self, driver: &Driver) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO drivers (id, org_id, name, license_number, license_expiry, phone,
                                      user_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    driver.id.to_string(),
                    driver.org_id.to_string(),
                    &driver.name,
                    &driver.license_number,
                    opt_ts(driver.license_expiry),
                    &driver.phone,
                    driver.user_id.map(|id| id.to_string()),
                    driver.status.as_str(),
                    ts(driver.created_at),
                    ts(driver.updated_at),
                ],
            )
            .context("Failed to insert driver")?;
        Ok(())
    }

    pub fn update_driver(&self, driver: &Driver) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE drivers
                 SET name = ?3, license_number = ?4, license_expiry = ?5, phone = ?6,
                     user_id = ?7, status = ?8, updated_at = ?9
                 WHERE id = ?1 AND org_id = ?2",
                params![
                    driver.id.to_string(),
                    driver.org_id.to_string(),
                    &driver.name,
                    &driver.license_number,
                    opt_ts(driver.license_expiry),
                    &driver.phone,
                    driver.user_id.map(|id| id.to_string()),
                    driver.status.as_str(),
                    ts(driver.updated_at),
                ],
            )
            .context("Failed to update driver")?;
        Ok(changed > 0)
    }

    /// Deletes the driver with their trips.
    pub fn delete_driver(&self, org_id: OrgId, id: DriverId) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM drivers WHERE id = ?1 AND org_id = ?2",
                [id.to_string(), org_id.to_string()],
            )
            .context("Failed to delete driver")?;
        Ok(deleted > 0)
    }
}
