//! Stored records as they appear in API payloads.
//!
//! Field names serialize in camelCase. Optional columns serialize as `null`
//! rather than being omitted so clients always see the full shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{
    AuditId, DocumentId, DriverId, FuelRecordId, LocationId, OrgId, TrailerId, TripId, UserId,
    VehicleId,
};
use crate::status::{
    AccountStatus, AuditAction, AuthProvider, DocumentEntityType, DriverStatus, LocationStatus,
    LocationType, TripStatus, UserRole, VehicleStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Full user row. Never serialized: it carries the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub org_id: Option<OrgId>,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub provider: AuthProvider,
    pub provider_id: String,
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            picture: self.picture.clone(),
            role: self.role,
            org_id: self.org_id,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// The public view of a user returned by login and `/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: UserRole,
    pub org_id: Option<OrgId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    pub org_id: OrgId,
    pub make: String,
    pub model: String,
    pub vin: Option<String>,
    pub registration: Option<String>,
    pub mileage: i64,
    pub purchase_date: Option<DateTime<Utc>>,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    #[must_use]
    pub fn summary(&self) -> VehicleSummary {
        VehicleSummary {
            id: self.id,
            make: self.make.clone(),
            model: self.model.clone(),
            registration: self.registration.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trailer {
    pub id: TrailerId,
    pub org_id: OrgId,
    pub make: String,
    pub model: String,
    pub registration: Option<String>,
    pub mileage: i64,
    pub purchase_date: Option<DateTime<Utc>>,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub org_id: OrgId,
    pub name: String,
    pub license_number: Option<String>,
    pub license_expiry: Option<DateTime<Utc>>,
    pub phone: Option<String>,
    pub user_id: Option<UserId>,
    pub status: DriverStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Linked login account, if any.
    pub user: Option<UserSummary>,
}

impl Driver {
    #[must_use]
    pub fn summary(&self) -> DriverSummary {
        DriverSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub id: VehicleId,
    pub make: String,
    pub model: String,
    pub registration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub id: DriverId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub org_id: OrgId,
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub start_mileage: i64,
    pub end_mileage: Option<i64>,
    pub status: TripStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vehicle: VehicleSummary,
    pub driver: DriverSummary,
}

impl Trip {
    #[must_use]
    pub fn summary(&self) -> TripSummary {
        TripSummary {
            id: self.id,
            start_at: self.start_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub id: TripId,
    pub start_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelRecord {
    pub id: FuelRecordId,
    pub org_id: OrgId,
    pub vehicle_id: VehicleId,
    pub trip_id: Option<TripId>,
    pub amount_liters: f64,
    pub cost_cents: Option<i64>,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vehicle: VehicleSummary,
    pub trip: Option<TripSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub org_id: OrgId,
    pub name: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub address: Option<String>,
    pub status: LocationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub org_id: OrgId,
    pub entity_type: DocumentEntityType,
    pub entity_id: uuid::Uuid,
    pub file_name: String,
    pub file_url: Option<String>,
    pub content_hash: Option<String>,
    pub mime_type: Option<String>,
    pub uploaded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    /// Uploader, if the account still exists.
    pub user: Option<UserSummary>,
}

/// Outcome of re-hashing a document's file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tampered: Option<bool>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAuditEntry {
    pub id: AuditId,
    pub user_id: UserId,
    pub action: AuditAction,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user: AuditUser,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub vehicles: i64,
    pub drivers: i64,
    pub trips: i64,
    pub fuel_records: i64,
    pub locations: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelReportItem {
    pub vehicle_id: VehicleId,
    pub org_name: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub total_liters: f64,
    /// `None` when no record carried a cost.
    pub total_cost_cents: Option<i64>,
    pub record_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: TripStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripsReportPerOrg {
    pub org_id: OrgId,
    pub org_name: String,
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripsReport {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub per_org: Vec<TripsReportPerOrg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsReportItem {
    pub id: LocationId,
    pub org_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub address: Option<String>,
    pub status: LocationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsPosition {
    pub vehicle_id: VehicleId,
    pub lat: f64,
    pub lng: f64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_type_serializes_as_type() {
        let loc = Location {
            id: LocationId::new_v4(),
            org_id: OrgId::new_v4(),
            name: "Depot".to_string(),
            location_type: LocationType::Parking,
            address: None,
            status: LocationStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&loc).unwrap();
        assert_eq!(value["type"], "PARKING");
        assert!(value["address"].is_null());
        assert!(value.get("orgId").is_some());
    }

    #[test]
    fn integrity_result_omits_tampered_when_unknown() {
        let result = IntegrityResult {
            ok: false,
            tampered: None,
            message: "No file URL".to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("tampered").is_none());
    }
}
