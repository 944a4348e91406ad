//! Core domain types for Fleet.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

#![allow(clippy::missing_errors_doc)]

mod ids;
mod records;
mod status;

pub use ids::{
    AuditId, DocumentId, DriverId, FuelRecordId, IdParseError, IntegrityLogId, LocationId, OrgId,
    ResetTokenId, TrailerId, TripId, UserId, VehicleId,
};
pub use records::{
    AuditUser, Document, Driver, DriverSummary, FuelRecord, FuelReportItem, GpsPosition,
    IntegrityResult, Location, LocationsReportItem, LoginAuditEntry, Organization, ReportSummary,
    StatusCount, Trailer, Trip, TripSummary, TripsReport, TripsReportPerOrg, User, UserProfile,
    UserSummary, Vehicle, VehicleSummary,
};
pub use status::{
    AccountStatus, AuditAction, AuthProvider, DocumentEntityType, DriverStatus, LocationStatus,
    LocationType, TripStatus, UserRole, VehicleStatus,
};
