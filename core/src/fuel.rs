use fleet_store::now;
use fleet_types::{FuelRecord, FuelRecordId, Trip};

use crate::access::Caller;
use crate::errors::ApiError;
use crate::input::NewFuelRecord;
use crate::{Ack, Fleet};

const NOT_FOUND: &str = "Fuel record not found";

impl Fleet {
    /// Latest refuel first.
    pub fn list_fuel_records(&self, caller: &Caller) -> Result<Vec<FuelRecord>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.list_fuel_records(org_id)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_fuel_record(&self, caller: &Caller, id: FuelRecordId) -> Result<FuelRecord, ApiError> {
        let org_id = caller.org_for_record(NOT_FOUND)?;
        self.store
            .get_fuel_record(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub fn create_fuel_record(
        &self,
        caller: &Caller,
        input: NewFuelRecord,
    ) -> Result<FuelRecord, ApiError> {
        let org_id = caller.org_for_create()?;
        let vehicle = self
            .store
            .get_vehicle(org_id, input.vehicle_id)?
            .ok_or_else(|| ApiError::bad_request("VALIDATION", "Vehicle not found"))?;
        let trip = match input.trip_id {
            Some(trip_id) => Some(
                self.store
                    .get_trip(org_id, trip_id)?
                    .ok_or_else(|| ApiError::bad_request("VALIDATION", "Trip not found"))?,
            ),
            None => None,
        };

        let at = now();
        let record = FuelRecord {
            id: FuelRecordId::new_v4(),
            org_id,
            vehicle_id: vehicle.id,
            trip_id: trip.as_ref().map(|t| t.id),
            amount_liters: input.amount_liters,
            cost_cents: input.cost_cents,
            recorded_at: input.recorded_at.unwrap_or(at),
            notes: input.notes,
            created_at: at,
            vehicle: vehicle.summary(),
            trip: trip.as_ref().map(Trip::summary),
        };
        self.store.insert_fuel_record(&record)?;
        tracing::info!(
            fuel_record_id = %record.id,
            vehicle_id = %vehicle.id,
            liters = record.amount_liters,
            "Recorded fuel"
        );
        Ok(record)
    }

    pub fn delete_fuel_record(&self, caller: &Caller, id: FuelRecordId) -> Result<Ack, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        if !self.store.delete_fuel_record(org_id, id)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        tracing::info!(fuel_record_id = %id, "Deleted fuel record");
        Ok(Ack::OK)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use fleet_types::{TripId, TripStatus, UserRole, VehicleId};

    use super::*;
    use crate::input::NewTrip;
    use crate::test_support::{admin, driver, fleet, member, org, vehicle};

    fn refuel(vehicle_id: VehicleId, trip_id: Option<TripId>) -> NewFuelRecord {
        NewFuelRecord {
            vehicle_id,
            trip_id,
            amount_liters: 120.5,
            cost_cents: Some(18_075),
            recorded_at: None,
            notes: None,
        }
    }

    #[test]
    fn recorded_at_defaults_to_now() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let boss = admin(&fleet, acme.id);
        let truck = vehicle(&fleet, &boss, "Volvo");

        let before = now();
        let record = fleet.create_fuel_record(&boss, refuel(truck.id, None)).unwrap();
        assert!(record.recorded_at >= before);
        assert_eq!(record.vehicle.make, "Volvo");
        assert!(record.trip.is_none());
        assert_eq!(fleet.get_fuel_record(&boss, record.id).unwrap(), record);
    }

    #[test]
    fn trip_link_is_embedded() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let boss = admin(&fleet, acme.id);
        let truck = vehicle(&fleet, &boss, "Volvo");
        let marko = driver(&fleet, &boss, "Marko");
        let trip = fleet
            .create_trip(
                &boss,
                NewTrip {
                    vehicle_id: truck.id,
                    driver_id: marko.id,
                    start_at: Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap(),
                    start_mileage: 0,
                    status: TripStatus::InProgress,
                    notes: None,
                },
            )
            .unwrap();

        let record = fleet
            .create_fuel_record(
                &boss,
                NewFuelRecord {
                    recorded_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()),
                    ..refuel(truck.id, Some(trip.id))
                },
            )
            .unwrap();
        let linked = record.trip.expect("trip summary");
        assert_eq!(linked.id, trip.id);
        assert_eq!(linked.start_at, trip.start_at);
        let listed = fleet.list_fuel_records(&boss).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].trip.as_ref().map(|t| t.id), Some(trip.id));
    }

    #[test]
    fn foreign_references_are_validation_errors() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let rival = org(&fleet, "Rival");
        let boss = admin(&fleet, acme.id);
        let foreign = vehicle(&fleet, &admin(&fleet, rival.id), "MAN");
        let own = vehicle(&fleet, &boss, "Volvo");

        let err = fleet.create_fuel_record(&boss, refuel(foreign.id, None)).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "Vehicle not found");

        let err = fleet
            .create_fuel_record(&boss, refuel(own.id, Some(TripId::new_v4())))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
        assert_eq!(err.to_string(), "Trip not found");
    }

    #[test]
    fn auditor_cannot_delete() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let boss = admin(&fleet, acme.id);
        let truck = vehicle(&fleet, &boss, "Volvo");
        let record = fleet.create_fuel_record(&boss, refuel(truck.id, None)).unwrap();

        let auditor = member(&fleet, Some(acme.id), UserRole::Auditor);
        assert_eq!(fleet.delete_fuel_record(&auditor, record.id).unwrap_err().status(), 403);
        assert!(fleet.delete_fuel_record(&boss, record.id).unwrap().ok);
        assert!(fleet.list_fuel_records(&boss).unwrap().is_empty());
    }
}
