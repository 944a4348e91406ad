use fleet_store::now;
use fleet_types::{Trip, TripId, TripStatus};

use crate::access::Caller;
use crate::errors::{ApiError, FieldError};
use crate::input::{NewTrip, TripPatch};
use crate::{Ack, Fleet};

const NOT_FOUND: &str = "Trip not found";

/// End values may never precede the start of the trip.
fn check_trip_bounds(trip: &Trip) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if let Some(end_mileage) = trip.end_mileage
        && end_mileage < trip.start_mileage
    {
        errors.push(FieldError::new(
            "endMileage",
            "End mileage cannot be less than start mileage",
        ));
    }
    if let Some(end_at) = trip.end_at
        && end_at < trip.start_at
    {
        errors.push(FieldError::new("endAt", "End time cannot be before start time"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

impl Fleet {
    /// Latest start first.
    pub fn list_trips(&self, caller: &Caller) -> Result<Vec<Trip>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.list_trips(org_id)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_trip(&self, caller: &Caller, id: TripId) -> Result<Trip, ApiError> {
        let org_id = caller.org_for_record(NOT_FOUND)?;
        self.store
            .get_trip(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub fn create_trip(&self, caller: &Caller, input: NewTrip) -> Result<Trip, ApiError> {
        let org_id = caller.org_for_create()?;
        let vehicle = self
            .store
            .get_vehicle(org_id, input.vehicle_id)?
            .ok_or_else(|| ApiError::bad_request("VALIDATION", "Vehicle not found"))?;
        let driver = self
            .store
            .get_driver(org_id, input.driver_id)?
            .ok_or_else(|| ApiError::bad_request("VALIDATION", "Driver not found"))?;

        let at = now();
        let trip = Trip {
            id: TripId::new_v4(),
            org_id,
            vehicle_id: vehicle.id,
            driver_id: driver.id,
            start_at: input.start_at,
            end_at: None,
            start_mileage: input.start_mileage,
            end_mileage: None,
            status: input.status,
            notes: input.notes,
            created_at: at,
            updated_at: at,
            vehicle: vehicle.summary(),
            driver: driver.summary(),
        };
        self.store.insert_trip(&trip)?;
        tracing::info!(trip_id = %trip.id, vehicle_id = %vehicle.id, "Created trip");
        Ok(trip)
    }

    pub fn update_trip(
        &self,
        caller: &Caller,
        id: TripId,
        patch: TripPatch,
    ) -> Result<Trip, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        let mut trip = self
            .store
            .get_trip(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        patch.end_at.apply(&mut trip.end_at);
        patch.end_mileage.apply(&mut trip.end_mileage);
        if let Some(status) = patch.status {
            trip.status = status;
        }
        patch.notes.apply(&mut trip.notes);
        check_trip_bounds(&trip)?;
        trip.updated_at = now();

        if !self.store.update_trip(&trip)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        if trip.status == TripStatus::Completed {
            tracing::info!(trip_id = %trip.id, "Trip completed");
        }
        Ok(trip)
    }

    pub fn delete_trip(&self, caller: &Caller, id: TripId) -> Result<Ack, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        if !self.store.delete_trip(org_id, id)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        tracing::info!(trip_id = %id, "Deleted trip");
        Ok(Ack::OK)
    }
}
