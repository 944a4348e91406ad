//! Request bodies mapped onto the typed service inputs.
//!
//! Each body is decoded into its `*Body` struct, then checked as a whole, so
//! a response lists every bad field at once. Create and update share a body
//! struct; they differ only in which members are required.

use serde::Deserialize;
use uuid::Uuid;

use fleet_core::auth::MIN_PASSWORD_LEN;
use fleet_core::{
    ApiError, DriverPatch, LocationPatch, NewDocument, NewDriver, NewFuelRecord, NewLocation,
    NewTrailer, NewTrip, NewVehicle, RegisterInput, TrailerPatch, TripPatch, VehiclePatch,
};
use fleet_types::{
    DocumentEntityType, DriverId, DriverStatus, LocationStatus, LocationType, TripId, TripStatus,
    UserId, UserRole, VehicleId, VehicleStatus,
};

use crate::body::{self, Amount, Checks, Field, Int, Stamp};

/// Message for optional fields that carry no specific wording.
const INVALID_VALUE: &str = "Invalid value";
const INVALID_DATE: &str = "Invalid date";
const INVALID_STATUS: &str = "Invalid status";
const MILEAGE: &str = "Mileage must be a non-negative integer";
const VALID_EMAIL: &str = "Valid email is required";

pub struct Login {
    pub email: String,
    pub password: String,
}

pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AccountBody {
    name: Field<String>,
    email: Field<String>,
    password: Field<String>,
    role: Field<UserRole>,
    token: Field<String>,
    new_password: Field<String>,
}

pub fn register(bytes: &[u8]) -> Result<RegisterInput, ApiError> {
    let body: AccountBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let name = c.required_text("name", body.name, "Name is required");
    let email = c.email("email", body.email, VALID_EMAIL);
    let password = c.min_length(
        "password",
        body.password,
        MIN_PASSWORD_LEN,
        "Password must be at least 8 characters",
    );
    let role = c
        .optional("role", body.role, "Invalid role")
        .unwrap_or(UserRole::Driver);
    c.finish()?;
    Ok(RegisterInput {
        name,
        email,
        password,
        role,
    })
}

pub fn login(bytes: &[u8]) -> Result<Login, ApiError> {
    let body: AccountBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let email = c.email("email", body.email, VALID_EMAIL);
    let password = c.required_text("password", body.password, "Password is required");
    c.finish()?;
    Ok(Login { email, password })
}

pub fn forgot_password(bytes: &[u8]) -> Result<String, ApiError> {
    let body: AccountBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let email = c.email("email", body.email, VALID_EMAIL);
    c.finish()?;
    Ok(email)
}

pub fn reset_password(bytes: &[u8]) -> Result<PasswordReset, ApiError> {
    let body: AccountBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let token = c.required_text("token", body.token, "Token is required");
    let new_password = c.min_length(
        "newPassword",
        body.new_password,
        MIN_PASSWORD_LEN,
        "New password must be at least 8 characters",
    );
    c.finish()?;
    Ok(PasswordReset {
        token,
        new_password,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CredentialBody {
    id_token: Field<String>,
    access_token: Field<String>,
    secret: Field<String>,
}

fn credential(
    bytes: &[u8],
    key: &str,
    pick: fn(CredentialBody) -> Field<String>,
) -> Result<String, ApiError> {
    let body: CredentialBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let value = c.required_text(key, pick(body), &format!("{key} is required"));
    c.finish()?;
    Ok(value)
}

/// Google ID token for `/auth/google`.
pub fn id_token(bytes: &[u8]) -> Result<String, ApiError> {
    credential(bytes, "idToken", |body| body.id_token)
}

/// Facebook access token for `/auth/facebook`.
pub fn access_token(bytes: &[u8]) -> Result<String, ApiError> {
    credential(bytes, "accessToken", |body| body.access_token)
}

pub fn dev_secret(bytes: &[u8]) -> Result<String, ApiError> {
    credential(bytes, "secret", |body| body.secret)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VehicleBody {
    make: Field<String>,
    model: Field<String>,
    vin: Field<String>,
    registration: Field<String>,
    mileage: Field<Int>,
    purchase_date: Field<Stamp>,
    status: Field<VehicleStatus>,
}

pub fn new_vehicle(bytes: &[u8]) -> Result<NewVehicle, ApiError> {
    let body: VehicleBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let input = NewVehicle {
        make: c.required_text("make", body.make, "Make is required"),
        model: c.required_text("model", body.model, "Model is required"),
        vin: c.optional_text("vin", body.vin),
        registration: c.optional_text("registration", body.registration),
        mileage: c.non_negative_int("mileage", body.mileage, MILEAGE).unwrap_or(0),
        purchase_date: c.optional_timestamp("purchaseDate", body.purchase_date, INVALID_DATE),
        status: c
            .optional("status", body.status, INVALID_STATUS)
            .unwrap_or(VehicleStatus::Active),
    };
    c.finish()?;
    Ok(input)
}

pub fn vehicle_patch(bytes: &[u8]) -> Result<VehiclePatch, ApiError> {
    let body: VehicleBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let patch = VehiclePatch {
        make: c.replacement_text("make", body.make, "Make is required"),
        model: c.replacement_text("model", body.model, "Model is required"),
        vin: c.text_patch("vin", body.vin),
        registration: c.text_patch("registration", body.registration),
        mileage: c.non_negative_int("mileage", body.mileage, MILEAGE),
        purchase_date: c.timestamp_patch("purchaseDate", body.purchase_date, INVALID_DATE),
        status: c.optional("status", body.status, INVALID_STATUS),
    };
    c.finish()?;
    Ok(patch)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TrailerBody {
    make: Field<String>,
    model: Field<String>,
    registration: Field<String>,
    mileage: Field<Int>,
    purchase_date: Field<Stamp>,
    status: Field<VehicleStatus>,
}

pub fn new_trailer(bytes: &[u8]) -> Result<NewTrailer, ApiError> {
    let body: TrailerBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let input = NewTrailer {
        make: c.required_text("make", body.make, "Make is required"),
        model: c.required_text("model", body.model, "Model is required"),
        registration: c.optional_text("registration", body.registration),
        mileage: c.non_negative_int("mileage", body.mileage, MILEAGE).unwrap_or(0),
        purchase_date: c.optional_timestamp("purchaseDate", body.purchase_date, INVALID_DATE),
        status: c
            .optional("status", body.status, INVALID_STATUS)
            .unwrap_or(VehicleStatus::Active),
    };
    c.finish()?;
    Ok(input)
}

pub fn trailer_patch(bytes: &[u8]) -> Result<TrailerPatch, ApiError> {
    let body: TrailerBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let patch = TrailerPatch {
        make: c.replacement_text("make", body.make, "Make is required"),
        model: c.replacement_text("model", body.model, "Model is required"),
        registration: c.text_patch("registration", body.registration),
        mileage: c.non_negative_int("mileage", body.mileage, MILEAGE),
        purchase_date: c.timestamp_patch("purchaseDate", body.purchase_date, INVALID_DATE),
        status: c.optional("status", body.status, INVALID_STATUS),
    };
    c.finish()?;
    Ok(patch)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DriverBody {
    name: Field<String>,
    license_number: Field<String>,
    license_expiry: Field<Stamp>,
    phone: Field<String>,
    user_id: Field<UserId>,
    status: Field<DriverStatus>,
}

pub fn new_driver(bytes: &[u8]) -> Result<NewDriver, ApiError> {
    let body: DriverBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let input = NewDriver {
        name: c.required_text("name", body.name, "Name is required"),
        license_number: c.optional_text("licenseNumber", body.license_number),
        license_expiry: c.optional_timestamp("licenseExpiry", body.license_expiry, INVALID_DATE),
        phone: c.optional_text("phone", body.phone),
        user_id: c.optional("userId", body.user_id, INVALID_VALUE),
        status: c
            .optional("status", body.status, INVALID_STATUS)
            .unwrap_or(DriverStatus::Active),
    };
    c.finish()?;
    Ok(input)
}

pub fn driver_patch(bytes: &[u8]) -> Result<DriverPatch, ApiError> {
    let body: DriverBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let patch = DriverPatch {
        name: c.replacement_text("name", body.name, "Name is required"),
        license_number: c.text_patch("licenseNumber", body.license_number),
        license_expiry: c.timestamp_patch("licenseExpiry", body.license_expiry, INVALID_DATE),
        phone: c.text_patch("phone", body.phone),
        user_id: c.patch("userId", body.user_id, INVALID_VALUE),
        status: c.optional("status", body.status, INVALID_STATUS),
    };
    c.finish()?;
    Ok(patch)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TripBody {
    vehicle_id: Field<Uuid>,
    driver_id: Field<Uuid>,
    start_at: Field<Stamp>,
    start_mileage: Field<Int>,
    end_at: Field<Stamp>,
    end_mileage: Field<Int>,
    status: Field<TripStatus>,
    notes: Field<String>,
}

pub fn new_trip(bytes: &[u8]) -> Result<NewTrip, ApiError> {
    let body: TripBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let input = NewTrip {
        vehicle_id: VehicleId::from_uuid(c.required_uuid(
            "vehicleId",
            body.vehicle_id,
            "Valid vehicle ID is required",
        )),
        driver_id: DriverId::from_uuid(c.required_uuid(
            "driverId",
            body.driver_id,
            "Valid driver ID is required",
        )),
        start_at: c.required_timestamp("startAt", body.start_at, "Valid startAt date is required"),
        start_mileage: c
            .non_negative_int("startMileage", body.start_mileage, INVALID_VALUE)
            .unwrap_or(0),
        status: c
            .optional("status", body.status, INVALID_STATUS)
            .unwrap_or(TripStatus::PreTrip),
        notes: c.optional_text("notes", body.notes),
    };
    c.finish()?;
    Ok(input)
}

pub fn trip_patch(bytes: &[u8]) -> Result<TripPatch, ApiError> {
    let body: TripBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let patch = TripPatch {
        end_at: c.timestamp_patch("endAt", body.end_at, INVALID_DATE),
        end_mileage: c.int_patch("endMileage", body.end_mileage, INVALID_VALUE),
        status: c.optional("status", body.status, INVALID_STATUS),
        notes: c.text_patch("notes", body.notes),
    };
    c.finish()?;
    Ok(patch)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FuelBody {
    vehicle_id: Field<Uuid>,
    trip_id: Field<TripId>,
    amount_liters: Field<Amount>,
    cost_cents: Field<Int>,
    recorded_at: Field<Stamp>,
    notes: Field<String>,
}

pub fn new_fuel_record(bytes: &[u8]) -> Result<NewFuelRecord, ApiError> {
    let body: FuelBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let input = NewFuelRecord {
        vehicle_id: VehicleId::from_uuid(c.required_uuid(
            "vehicleId",
            body.vehicle_id,
            "Valid vehicle ID is required",
        )),
        trip_id: c.optional("tripId", body.trip_id, INVALID_VALUE),
        amount_liters: c
            .non_negative_number("amountLiters", body.amount_liters, "Amount must be >= 0")
            .unwrap_or_default(),
        cost_cents: c.non_negative_int("costCents", body.cost_cents, INVALID_VALUE),
        recorded_at: c.optional_timestamp("recordedAt", body.recorded_at, INVALID_DATE),
        notes: c.optional_text("notes", body.notes),
    };
    c.finish()?;
    Ok(input)
}

const LOCATION_TYPE: &str = "Type must be PARKING or SERVICE";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LocationBody {
    name: Field<String>,
    #[serde(rename = "type")]
    location_type: Field<LocationType>,
    address: Field<String>,
    status: Field<LocationStatus>,
}

pub fn new_location(bytes: &[u8]) -> Result<NewLocation, ApiError> {
    let body: LocationBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let input = NewLocation {
        name: c.required_text("name", body.name, "Name is required"),
        location_type: c.required(
            "type",
            body.location_type,
            LocationType::Parking,
            LOCATION_TYPE,
        ),
        address: c.optional_text("address", body.address),
        status: c
            .optional("status", body.status, INVALID_STATUS)
            .unwrap_or(LocationStatus::Active),
    };
    c.finish()?;
    Ok(input)
}

pub fn location_patch(bytes: &[u8]) -> Result<LocationPatch, ApiError> {
    let body: LocationBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let patch = LocationPatch {
        name: c.replacement_text("name", body.name, "Name is required"),
        location_type: c.optional("type", body.location_type, LOCATION_TYPE),
        address: c.text_patch("address", body.address),
        status: c.optional("status", body.status, INVALID_STATUS),
    };
    c.finish()?;
    Ok(patch)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DocumentBody {
    entity_type: Field<DocumentEntityType>,
    entity_id: Field<Uuid>,
    file_name: Field<String>,
    file_url: Field<String>,
    content_hash: Field<String>,
    mime_type: Field<String>,
}

/// Lowercase 64-digit hex, or an error recorded against `contentHash`.
fn content_hash(c: &mut Checks, field: Field<String>) -> Option<String> {
    let raw = c.optional_text("contentHash", field)?;
    if raw.len() == 64 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(raw.to_ascii_lowercase())
    } else {
        c.add_error("contentHash", "contentHash must be a SHA-256 hex digest");
        None
    }
}

pub fn new_document(bytes: &[u8]) -> Result<NewDocument, ApiError> {
    let body: DocumentBody = body::parse(bytes)?;
    let mut c = Checks::new();
    let input = NewDocument {
        entity_type: c.required(
            "entityType",
            body.entity_type,
            DocumentEntityType::Vehicle,
            "entityType must be TRIP, VEHICLE, or DRIVER",
        ),
        entity_id: c.required_uuid("entityId", body.entity_id, "Valid entityId is required"),
        file_name: c.required_text("fileName", body.file_name, "fileName is required"),
        file_url: c.optional_text("fileUrl", body.file_url),
        content_hash: content_hash(&mut c, body.content_hash),
        mime_type: c.optional_text("mimeType", body.mime_type),
    };
    c.finish()?;
    Ok(input)
}
