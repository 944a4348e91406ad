//! Path resolution and dispatch onto the service layer.

use hyper::{Method, StatusCode};
use uuid::Uuid;

use fleet_core::{ApiError, AuditParams, Caller, DocumentFilter, Fleet, LoginMeta, ReportRange};
use fleet_types::{
    DocumentEntityType, DocumentId, DriverId, FuelRecordId, LocationId, LocationType, TrailerId,
    TripId, VehicleId,
};

use crate::body::Query;
use crate::forms;
use crate::reply::{self, HttpResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Vehicles,
    Trailers,
    Drivers,
    Trips,
    FuelRecords,
    Locations,
    Documents,
}

impl Resource {
    fn from_segment(segment: &str) -> Option<Self> {
        Some(match segment {
            "vehicles" => Resource::Vehicles,
            "trailers" => Resource::Trailers,
            "drivers" => Resource::Drivers,
            "trips" => Resource::Trips,
            "fuel-records" => Resource::FuelRecords,
            "locations" => Resource::Locations,
            "documents" => Resource::Documents,
            _ => return None,
        })
    }

    /// Fuel records and documents are immutable once created.
    fn updatable(self) -> bool {
        !matches!(self, Resource::FuelRecords | Resource::Documents)
    }

    fn invalid_id(self) -> &'static str {
        match self {
            Resource::Vehicles => "Valid vehicle ID is required",
            Resource::Trailers => "Valid trailer ID is required",
            Resource::Drivers => "Valid driver ID is required",
            Resource::Trips => "Valid trip ID is required",
            Resource::FuelRecords | Resource::Locations | Resource::Documents => {
                "Valid ID is required"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Register,
    Login,
    ForgotPassword,
    ResetPassword,
    Google,
    Facebook,
    Dev,
    Me,
    Audit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Summary,
    Fuel,
    Trips,
    Locations,
}

/// A known path. Ids are kept raw until the method has been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Health,
    Auth(AuthAction),
    Collection(Resource),
    Item(Resource, &'a str),
    VerifyIntegrity(&'a str),
    Report(Report),
    GpsPositions,
}

impl<'a> Route<'a> {
    pub fn resolve(path: &'a str) -> Option<Self> {
        let path = path.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(path);
        if path == "/health" {
            return Some(Route::Health);
        }
        let rest = path.strip_prefix("/api/")?;
        let segments: Vec<&str> = rest.split('/').collect();
        let route = match segments.as_slice() {
            ["auth", action] => Route::Auth(match *action {
                "register" => AuthAction::Register,
                "login" => AuthAction::Login,
                "forgot-password" => AuthAction::ForgotPassword,
                "reset-password" => AuthAction::ResetPassword,
                "google" => AuthAction::Google,
                "facebook" => AuthAction::Facebook,
                "dev" => AuthAction::Dev,
                "me" => AuthAction::Me,
                "audit" => AuthAction::Audit,
                _ => return None,
            }),
            ["reports", report] => Route::Report(match *report {
                "summary" => Report::Summary,
                "fuel" => Report::Fuel,
                "trips" => Report::Trips,
                "locations" => Report::Locations,
                _ => return None,
            }),
            ["gps", "positions"] => Route::GpsPositions,
            ["documents", id, "verify-integrity"] => Route::VerifyIntegrity(*id),
            [resource] => Route::Collection(Resource::from_segment(resource)?),
            [resource, id] if !id.is_empty() => {
                Route::Item(Resource::from_segment(resource)?, *id)
            }
            _ => return None,
        };
        Some(route)
    }

    pub fn allows(self) -> &'static [Method] {
        match self {
            Route::Auth(
                AuthAction::Register
                | AuthAction::Login
                | AuthAction::ForgotPassword
                | AuthAction::ResetPassword
                | AuthAction::Google
                | AuthAction::Facebook
                | AuthAction::Dev,
            ) => &[Method::POST],
            Route::Collection(_) => &[Method::GET, Method::POST],
            Route::Item(resource, _) if resource.updatable() => {
                &[Method::GET, Method::PUT, Method::DELETE]
            }
            Route::Item(..) => &[Method::GET, Method::DELETE],
            Route::Health
            | Route::Auth(AuthAction::Me | AuthAction::Audit)
            | Route::VerifyIntegrity(_)
            | Route::Report(_)
            | Route::GpsPositions => &[Method::GET],
        }
    }

    /// Everything but health and the login family needs a bearer token.
    pub fn requires_auth(self) -> bool {
        match self {
            Route::Health => false,
            Route::Auth(action) => matches!(action, AuthAction::Me | AuthAction::Audit),
            _ => true,
        }
    }
}

/// Everything a handler may need from the request.
pub struct Request<'a> {
    pub method: &'a Method,
    pub query: Query,
    pub body: &'a [u8],
    pub meta: LoginMeta,
}

fn path_id(raw: &str, resource: Resource) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::field("id", resource.invalid_id()))
}

fn report_range(query: &Query) -> Result<ReportRange, ApiError> {
    Ok(ReportRange {
        from: query.timestamp("from")?,
        to: query.timestamp("to")?,
    })
}

fn audit_params(query: &Query) -> AuditParams {
    AuditParams {
        page: query.number("page"),
        limit: query.number("limit"),
        sort: query.get("sort").map(str::to_string),
        order: query.get("order").map(str::to_string),
        search: query.get("search").map(str::to_string),
    }
}

/// Routes that run before a caller is known.
pub async fn public(
    fleet: &Fleet,
    action: AuthAction,
    req: &Request<'_>,
) -> Result<HttpResponse, ApiError> {
    match action {
        AuthAction::Register => {
            let input = forms::register(req.body)?;
            reply::created(&fleet.register(input).await?)
        }
        AuthAction::Login => {
            let login = forms::login(req.body)?;
            reply::ok(
                &fleet
                    .login_email(&login.email, &login.password, &req.meta)
                    .await?,
            )
        }
        AuthAction::ForgotPassword => {
            let email = forms::forgot_password(req.body)?;
            reply::ok(&fleet.forgot_password(&email)?)
        }
        AuthAction::ResetPassword => {
            let reset = forms::reset_password(req.body)?;
            reply::ok(&fleet.reset_password(&reset.token, reset.new_password).await?)
        }
        AuthAction::Google => {
            let token = forms::id_token(req.body)?;
            reply::ok(&fleet.login_google(&token, &req.meta).await?)
        }
        AuthAction::Facebook => {
            let token = forms::access_token(req.body)?;
            reply::ok(&fleet.login_facebook(&token, &req.meta).await?)
        }
        AuthAction::Dev => {
            let secret = forms::dev_secret(req.body)?;
            reply::ok(&fleet.dev_login(&secret, &req.meta)?)
        }
        AuthAction::Me | AuthAction::Audit => Err(ApiError::unauthorized(
            "UNAUTHORIZED",
            "Unauthorized",
        )),
    }
}

/// Routes that act on behalf of an authenticated caller.
pub async fn protected(
    fleet: &Fleet,
    caller: &Caller,
    route: Route<'_>,
    req: &Request<'_>,
) -> Result<HttpResponse, ApiError> {
    match route {
        Route::Auth(AuthAction::Me) => reply::ok(&fleet.me(caller)?),
        Route::Auth(AuthAction::Audit) => reply::json(
            StatusCode::OK,
            &fleet.list_login_audit(caller, audit_params(&req.query))?,
        ),
        Route::Collection(resource) if req.method == Method::GET => {
            list(fleet, caller, resource, &req.query)
        }
        Route::Collection(resource) => create(fleet, caller, resource, req.body),
        Route::Item(resource, raw) => {
            let id = path_id(raw, resource)?;
            match *req.method {
                Method::GET => get(fleet, caller, resource, id),
                Method::PUT => update(fleet, caller, resource, id, req.body),
                _ => delete(fleet, caller, resource, id),
            }
        }
        Route::VerifyIntegrity(raw) => {
            let id = DocumentId::from_uuid(path_id(raw, Resource::Documents)?);
            reply::ok(&fleet.verify_document_integrity(caller, id).await?)
        }
        Route::Report(report) => {
            let query = &req.query;
            match report {
                Report::Summary => reply::ok(&fleet.report_summary(caller, report_range(query)?)?),
                Report::Fuel => reply::ok(&fleet.fuel_report(caller, report_range(query)?)?),
                Report::Trips => reply::ok(&fleet.trips_report(caller, report_range(query)?)?),
                Report::Locations => reply::ok(&fleet.locations_report(caller)?),
            }
        }
        Route::GpsPositions => reply::ok(&fleet.gps_positions(caller)?),
        Route::Health | Route::Auth(_) => Err(ApiError::not_found("Not found")),
    }
}

fn list(
    fleet: &Fleet,
    caller: &Caller,
    resource: Resource,
    query: &Query,
) -> Result<HttpResponse, ApiError> {
    match resource {
        Resource::Vehicles => reply::ok(&fleet.list_vehicles(caller)?),
        Resource::Trailers => reply::ok(&fleet.list_trailers(caller)?),
        Resource::Drivers => reply::ok(&fleet.list_drivers(caller)?),
        Resource::Trips => reply::ok(&fleet.list_trips(caller)?),
        Resource::FuelRecords => reply::ok(&fleet.list_fuel_records(caller)?),
        Resource::Locations => {
            let kind = query.choice("type", LocationType::parse, "Type must be PARKING or SERVICE")?;
            reply::ok(&fleet.list_locations(caller, kind)?)
        }
        Resource::Documents => {
            let filter = DocumentFilter {
                entity_type: query.choice(
                    "entityType",
                    DocumentEntityType::parse,
                    "entityType must be TRIP, VEHICLE, or DRIVER",
                )?,
                entity_id: query.uuid("entityId", "Valid entityId is required")?,
            };
            reply::ok(&fleet.list_documents(caller, filter)?)
        }
    }
}

fn get(
    fleet: &Fleet,
    caller: &Caller,
    resource: Resource,
    id: Uuid,
) -> Result<HttpResponse, ApiError> {
    match resource {
        Resource::Vehicles => reply::ok(&fleet.get_vehicle(caller, VehicleId::from_uuid(id))?),
        Resource::Trailers => reply::ok(&fleet.get_trailer(caller, TrailerId::from_uuid(id))?),
        Resource::Drivers => reply::ok(&fleet.get_driver(caller, DriverId::from_uuid(id))?),
        Resource::Trips => reply::ok(&fleet.get_trip(caller, TripId::from_uuid(id))?),
        Resource::FuelRecords => {
            reply::ok(&fleet.get_fuel_record(caller, FuelRecordId::from_uuid(id))?)
        }
        Resource::Locations => reply::ok(&fleet.get_location(caller, LocationId::from_uuid(id))?),
        Resource::Documents => reply::ok(&fleet.get_document(caller, DocumentId::from_uuid(id))?),
    }
}

fn create(
    fleet: &Fleet,
    caller: &Caller,
    resource: Resource,
    body: &[u8],
) -> Result<HttpResponse, ApiError> {
    match resource {
        Resource::Vehicles => {
            reply::created(&fleet.create_vehicle(caller, forms::new_vehicle(body)?)?)
        }
        Resource::Trailers => {
            reply::created(&fleet.create_trailer(caller, forms::new_trailer(body)?)?)
        }
        Resource::Drivers => reply::created(&fleet.create_driver(caller, forms::new_driver(body)?)?),
        Resource::Trips => reply::created(&fleet.create_trip(caller, forms::new_trip(body)?)?),
        Resource::FuelRecords => {
            reply::created(&fleet.create_fuel_record(caller, forms::new_fuel_record(body)?)?)
        }
        Resource::Locations => {
            reply::created(&fleet.create_location(caller, forms::new_location(body)?)?)
        }
        Resource::Documents => {
            reply::created(&fleet.create_document(caller, forms::new_document(body)?)?)
        }
    }
}

fn update(
    fleet: &Fleet,
    caller: &Caller,
    resource: Resource,
    id: Uuid,
    body: &[u8],
) -> Result<HttpResponse, ApiError> {
    match resource {
        Resource::Vehicles => reply::ok(&fleet.update_vehicle(
            caller,
            VehicleId::from_uuid(id),
            forms::vehicle_patch(body)?,
        )?),
        Resource::Trailers => reply::ok(&fleet.update_trailer(
            caller,
            TrailerId::from_uuid(id),
            forms::trailer_patch(body)?,
        )?),
        Resource::Drivers => reply::ok(&fleet.update_driver(
            caller,
            DriverId::from_uuid(id),
            forms::driver_patch(body)?,
        )?),
        Resource::Trips => reply::ok(&fleet.update_trip(
            caller,
            TripId::from_uuid(id),
            forms::trip_patch(body)?,
        )?),
        Resource::Locations => reply::ok(&fleet.update_location(
            caller,
            LocationId::from_uuid(id),
            forms::location_patch(body)?,
        )?),
        Resource::FuelRecords | Resource::Documents => Err(ApiError::Rejected {
            status: 405,
            code: "METHOD_NOT_ALLOWED",
            message: "Method not allowed".to_string(),
        }),
    }
}

fn delete(
    fleet: &Fleet,
    caller: &Caller,
    resource: Resource,
    id: Uuid,
) -> Result<HttpResponse, ApiError> {
    let ack = match resource {
        Resource::Vehicles => fleet.delete_vehicle(caller, VehicleId::from_uuid(id))?,
        Resource::Trailers => fleet.delete_trailer(caller, TrailerId::from_uuid(id))?,
        Resource::Drivers => fleet.delete_driver(caller, DriverId::from_uuid(id))?,
        Resource::Trips => fleet.delete_trip(caller, TripId::from_uuid(id))?,
        Resource::FuelRecords => fleet.delete_fuel_record(caller, FuelRecordId::from_uuid(id))?,
        Resource::Locations => fleet.delete_location(caller, LocationId::from_uuid(id))?,
        Resource::Documents => fleet.delete_document(caller, DocumentId::from_uuid(id))?,
    };
    reply::ok(&ack)
}
