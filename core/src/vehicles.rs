use fleet_store::{Write, now};
use fleet_types::{OrgId, Vehicle, VehicleId};

use crate::access::Caller;
use crate::errors::ApiError;
use crate::input::{NewVehicle, VehiclePatch};
use crate::{Ack, Fleet};

const NOT_FOUND: &str = "Vehicle not found";

fn duplicate_vin() -> ApiError {
    ApiError::bad_request("DUPLICATE_VIN", "VIN already exists in this organization")
}

impl Fleet {
    /// Most recently updated first.
    pub fn list_vehicles(&self, caller: &Caller) -> Result<Vec<Vehicle>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.list_vehicles(org_id)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_vehicle(&self, caller: &Caller, id: VehicleId) -> Result<Vehicle, ApiError> {
        let org_id = caller.org_for_record(NOT_FOUND)?;
        self.find_vehicle(org_id, id)
    }

    pub fn create_vehicle(&self, caller: &Caller, input: NewVehicle) -> Result<Vehicle, ApiError> {
        let org_id = caller.org_for_create()?;
        if let Some(vin) = input.vin.as_deref()
            && self.store.vin_in_use(org_id, vin, None)?
        {
            return Err(duplicate_vin());
        }

        let at = now();
        let vehicle = Vehicle {
            id: VehicleId::new_v4(),
            org_id,
            make: input.make,
            model: input.model,
            vin: input.vin,
            registration: input.registration,
            mileage: input.mileage,
            purchase_date: input.purchase_date,
            status: input.status,
            created_at: at,
            updated_at: at,
        };
        if self.store.insert_vehicle(&vehicle)? == Write::Duplicate {
            return Err(duplicate_vin());
        }
        tracing::info!(vehicle_id = %vehicle.id, org_id = %org_id, "Created vehicle");
        Ok(vehicle)
    }

    pub fn update_vehicle(
        &self,
        caller: &Caller,
        id: VehicleId,
        patch: VehiclePatch,
    ) -> Result<Vehicle, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        let mut vehicle = self.find_vehicle(org_id, id)?;

        if let Some(vin) = patch.vin.resolve(vehicle.vin.as_ref())
            && vehicle.vin.as_ref() != Some(vin)
            && self.store.vin_in_use(org_id, vin, Some(id))?
        {
            return Err(duplicate_vin());
        }

        if let Some(make) = patch.make {
            vehicle.make = make;
        }
        if let Some(model) = patch.model {
            vehicle.model = model;
        }
        patch.vin.apply(&mut vehicle.vin);
        patch.registration.apply(&mut vehicle.registration);
        if let Some(mileage) = patch.mileage {
            vehicle.mileage = mileage;
        }
        patch.purchase_date.apply(&mut vehicle.purchase_date);
        if let Some(status) = patch.status {
            vehicle.status = status;
        }
        vehicle.updated_at = now();

        match self.store.update_vehicle(&vehicle)? {
            Write::Done => Ok(vehicle),
            Write::Missing => Err(ApiError::not_found(NOT_FOUND)),
            Write::Duplicate => Err(duplicate_vin()),
        }
    }

    /// Trips and fuel records of the vehicle go with it.
    pub fn delete_vehicle(&self, caller: &Caller, id: VehicleId) -> Result<Ack, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        if !self.store.delete_vehicle(org_id, id)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        tracing::info!(vehicle_id = %id, "Deleted vehicle");
        Ok(Ack::OK)
    }

    pub(crate) fn find_vehicle(&self, org_id: OrgId, id: VehicleId) -> Result<Vehicle, ApiError> {
        self.store
            .get_vehicle(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }
}
