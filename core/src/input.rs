//! Typed service inputs.
//!
//! The HTTP layer turns request bodies into these after field validation, so
//! services only deal with well-formed values. Create inputs carry defaults
//! already applied; update inputs distinguish "leave alone" from "clear".

use chrono::{DateTime, Utc};
use fleet_types::{
    DocumentEntityType, DriverId, DriverStatus, LocationStatus, LocationType, TripId, TripStatus,
    UserId, UserRole, VehicleId, VehicleStatus,
};
use uuid::Uuid;

/// A partial update of a nullable field.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    /// Field absent from the request.
    #[default]
    Keep,
    /// Field sent as `null` (or an empty string for text).
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn apply(self, current: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *current = None,
            Patch::Set(value) => *current = Some(value),
        }
    }

    /// The value the field will hold once applied to `current`.
    pub fn resolve<'a>(&'a self, current: Option<&'a T>) -> Option<&'a T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }
}

/// Who is logging in from where. Written to the login audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl LoginMeta {
    pub(crate) fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub(crate) fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// Raw paging and sorting parameters of the login audit listing.
#[derive(Debug, Clone, Default)]
pub struct AuditParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub vin: Option<String>,
    pub registration: Option<String>,
    pub mileage: i64,
    pub purchase_date: Option<DateTime<Utc>>,
    pub status: VehicleStatus,
}

#[derive(Debug, Clone, Default)]
pub struct VehiclePatch {
    pub make: Option<String>,
    pub model: Option<String>,
    pub vin: Patch<String>,
    pub registration: Patch<String>,
    pub mileage: Option<i64>,
    pub purchase_date: Patch<DateTime<Utc>>,
    pub status: Option<VehicleStatus>,
}

#[derive(Debug, Clone)]
pub struct NewTrailer {
    pub make: String,
    pub model: String,
    pub registration: Option<String>,
    pub mileage: i64,
    pub purchase_date: Option<DateTime<Utc>>,
    pub status: VehicleStatus,
}

#[derive(Debug, Clone, Default)]
pub struct TrailerPatch {
    pub make: Option<String>,
    pub model: Option<String>,
    pub registration: Patch<String>,
    pub mileage: Option<i64>,
    pub purchase_date: Patch<DateTime<Utc>>,
    pub status: Option<VehicleStatus>,
}

#[derive(Debug, Clone)]
pub struct NewDriver {
    pub name: String,
    pub license_number: Option<String>,
    pub license_expiry: Option<DateTime<Utc>>,
    pub phone: Option<String>,
    pub user_id: Option<UserId>,
    pub status: DriverStatus,
}

#[derive(Debug, Clone, Default)]
pub struct DriverPatch {
    pub name: Option<String>,
    pub license_number: Patch<String>,
    pub license_expiry: Patch<DateTime<Utc>>,
    pub phone: Patch<String>,
    pub user_id: Patch<UserId>,
    pub status: Option<DriverStatus>,
}

#[derive(Debug, Clone)]
pub struct NewTrip {
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub start_at: DateTime<Utc>,
    pub start_mileage: i64,
    pub status: TripStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TripPatch {
    pub end_at: Patch<DateTime<Utc>>,
    pub end_mileage: Patch<i64>,
    pub status: Option<TripStatus>,
    pub notes: Patch<String>,
}

#[derive(Debug, Clone)]
pub struct NewFuelRecord {
    pub vehicle_id: VehicleId,
    pub trip_id: Option<TripId>,
    pub amount_liters: f64,
    pub cost_cents: Option<i64>,
    /// Defaults to the time of creation.
    pub recorded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub location_type: LocationType,
    pub address: Option<String>,
    pub status: LocationStatus,
}

#[derive(Debug, Clone, Default)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub location_type: Option<LocationType>,
    pub address: Patch<String>,
    pub status: Option<LocationStatus>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub entity_type: DocumentEntityType,
    pub entity_id: Uuid,
    pub file_name: String,
    pub file_url: Option<String>,
    /// Lowercase SHA-256 hex.
    pub content_hash: Option<String>,
    pub mime_type: Option<String>,
}
