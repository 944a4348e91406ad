//! SQLite persistence for Fleet.
//!
//! One [`Store`] owns one connection behind a mutex. Every repository method
//! locks for the duration of its own statements only, so callers never hold
//! the lock across an await point. Repositories are split per table group:
//!
//! - `orgs`, `users`, `audit`, `reset_tokens`: tenancy and authentication
//! - `vehicles`, `trailers`, `drivers`, `trips`, `fuel`, `locations`,
//!   `documents`: org-scoped fleet records
//! - `reports`: read-only aggregates
//!
//! Fleet lookups take the caller's [`OrgId`] and filter on it in SQL, so a
//! record from another organization is indistinguishable from a missing one.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)]

mod audit;
mod documents;
mod drivers;
mod fuel;
mod locations;
mod orgs;
mod reports;
mod reset_tokens;
mod sqlite_util;
mod trailers;
mod trips;
mod users;
mod vehicles;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::Connection;

pub use audit::{AuditPage, AuditQuery, AuditSort, SortOrder};
pub use documents::{DocumentFilter, IntegrityLog};
pub use reports::DateRange;
pub use reset_tokens::ResetToken;

use sqlite_util::{prepare_db_path, register_fold};

/// Current time truncated to the stored precision, so a record returned from
/// a write compares equal to the same record read back later.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Outcome of a write guarded by a unique constraint.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Done,
    /// No row matched the id and org.
    Missing,
    /// A unique column already holds the value.
    Duplicate,
}

/// Persistent store for organizations, users and fleet records.
pub struct Store {
    db: Mutex<Connection>,
}

impl Store {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS organizations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            org_id TEXT REFERENCES organizations(id) ON DELETE SET NULL,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            picture TEXT,
            provider TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            password_hash TEXT,
            role TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (provider, provider_id)
        );

        CREATE TABLE IF NOT EXISTS login_audits (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            action TEXT NOT NULL,
            ip TEXT,
            user_agent TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS password_reset_tokens (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token TEXT NOT NULL UNIQUE,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS vehicles (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            vin TEXT,
            registration TEXT,
            mileage INTEGER NOT NULL DEFAULT 0 CHECK (mileage >= 0),
            purchase_date TEXT,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (org_id, vin)
        );

        CREATE TABLE IF NOT EXISTS trailers (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            registration TEXT,
            mileage INTEGER NOT NULL DEFAULT 0 CHECK (mileage >= 0),
            purchase_date TEXT,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS drivers (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            license_number TEXT,
            license_expiry TEXT,
            phone TEXT,
            user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS trips (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            vehicle_id TEXT NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
            driver_id TEXT NOT NULL REFERENCES drivers(id) ON DELETE CASCADE,
            start_at TEXT NOT NULL,
            end_at TEXT,
            start_mileage INTEGER NOT NULL DEFAULT 0 CHECK (start_mileage >= 0),
            end_mileage INTEGER,
            status TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fuel_records (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            vehicle_id TEXT NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
            trip_id TEXT REFERENCES trips(id) ON DELETE SET NULL,
            amount_liters REAL NOT NULL CHECK (amount_liters >= 0),
            cost_cents INTEGER CHECK (cost_cents IS NULL OR cost_cents >= 0),
            recorded_at TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS locations (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            address TEXT,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_url TEXT,
            content_hash TEXT,
            mime_type TEXT,
            uploaded_by TEXT REFERENCES users(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS document_integrity_logs (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            passed INTEGER NOT NULL,
            message TEXT NOT NULL,
            user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_users_org ON users(org_id);
        CREATE INDEX IF NOT EXISTS idx_login_audits_user ON login_audits(user_id);
        CREATE INDEX IF NOT EXISTS idx_login_audits_created ON login_audits(created_at);
        CREATE INDEX IF NOT EXISTS idx_vehicles_org ON vehicles(org_id);
        CREATE INDEX IF NOT EXISTS idx_trailers_org ON trailers(org_id);
        CREATE INDEX IF NOT EXISTS idx_drivers_org ON drivers(org_id);
        CREATE INDEX IF NOT EXISTS idx_trips_org_start ON trips(org_id, start_at);
        CREATE INDEX IF NOT EXISTS idx_fuel_org_recorded ON fuel_records(org_id, recorded_at);
        CREATE INDEX IF NOT EXISTS idx_locations_org ON locations(org_id);
        CREATE INDEX IF NOT EXISTS idx_documents_entity ON documents(org_id, entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_integrity_document ON document_integrity_logs(document_id);
    ";

    /// Open or create the store database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        prepare_db_path(path)?;

        let db = Connection::open(path)
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        Self::initialize(db)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory store")?;
        Self::initialize(db)
    }

    fn initialize(db: Connection) -> Result<Self> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON;",
        )
        .context("Failed to set store pragmas")?;
        register_fold(&db).context("Failed to register SQL functions")?;
        db.execute_batch(Self::SCHEMA)
            .context("Failed to create store schema")?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| anyhow!("store connection lock poisoned"))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use fleet_types::{
        AccountStatus, AuthProvider, Driver, DriverId, DriverStatus, OrgId, Organization, User,
        UserId, UserRole, Vehicle, VehicleId, VehicleStatus,
    };

    use super::{Store, Write, now};

    pub(crate) fn store() -> Store {
        Store::open_in_memory().expect("open store")
    }

    pub(crate) fn org(store: &Store, name: &str) -> Organization {
        store.create_org(name).expect("create org")
    }

    pub(crate) fn user(store: &Store, org_id: Option<OrgId>, email: &str) -> User {
        let at = now();
        let user = User {
            id: UserId::new_v4(),
            org_id,
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            picture: None,
            provider: AuthProvider::Email,
            provider_id: email.to_string(),
            password_hash: Some("hash".to_string()),
            role: UserRole::Admin,
            status: AccountStatus::Active,
            created_at: at,
            updated_at: at,
        };
        assert_eq!(store.insert_user(&user).expect("insert user"), Write::Done);
        user
    }

    pub(crate) fn vehicle(store: &Store, org_id: OrgId, make: &str) -> Vehicle {
        let at = now();
        let vehicle = Vehicle {
            id: VehicleId::new_v4(),
            org_id,
            make: make.to_string(),
            model: "FH16".to_string(),
            vin: None,
            registration: Some("BG-123".to_string()),
            mileage: 1000,
            purchase_date: None,
            status: VehicleStatus::Active,
            created_at: at,
            updated_at: at,
        };
        assert_eq!(store.insert_vehicle(&vehicle).expect("insert vehicle"), Write::Done);
        vehicle
    }

    pub(crate) fn driver(store: &Store, org_id: OrgId, name: &str) -> Driver {
        let at = now();
        let driver = Driver {
            id: DriverId::new_v4(),
            org_id,
            name: name.to_string(),
            license_number: None,
            license_expiry: None,
            phone: None,
            user_id: None,
            status: DriverStatus::Active,
            created_at: at,
            updated_at: at,
            user: None,
        };
        store.insert_driver(&driver).expect("insert driver");
        driver
    }
}
