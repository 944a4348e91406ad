use fleet_store::now;
use fleet_types::{Driver, DriverId, OrgId, UserId};

use crate::access::Caller;
use crate::errors::ApiError;
use crate::input::{DriverPatch, NewDriver, Patch};
use crate::{Ack, Fleet};

const NOT_FOUND: &str = "Driver not found";

impl Fleet {
    pub fn list_drivers(&self, caller: &Caller) -> Result<Vec<Driver>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.list_drivers(org_id)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_driver(&self, caller: &Caller, id: DriverId) -> Result<Driver, ApiError> {
        let org_id = caller.org_for_record(NOT_FOUND)?;
        self.find_driver(org_id, id)
    }

    pub fn create_driver(&self, caller: &Caller, input: NewDriver) -> Result<Driver, ApiError> {
        let org_id = caller.org_for_create()?;
        if let Some(user_id) = input.user_id {
            self.check_linked_user(org_id, user_id)?;
        }

        let at = now();
        let driver = Driver {
            id: DriverId::new_v4(),
            org_id,
            name: input.name,
            license_number: input.license_number,
            license_expiry: input.license_expiry,
            phone: input.phone,
            user_id: input.user_id,
            status: input.status,
            created_at: at,
            updated_at: at,
            user: None,
        };
        self.store.insert_driver(&driver)?;
        tracing::info!(driver_id = %driver.id, org_id = %org_id, "Created driver");
        self.find_driver(org_id, driver.id)
    }

    pub fn update_driver(
        &self,
        caller: &Caller,
        id: DriverId,
        patch: DriverPatch,
    ) -> Result<Driver, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        let mut driver = self.find_driver(org_id, id)?;
        if let Patch::Set(user_id) = patch.user_id {
            self.check_linked_user(org_id, user_id)?;
        }

        if let Some(name) = patch.name {
            driver.name = name;
        }
        patch.license_number.apply(&mut driver.license_number);
        patch.license_expiry.apply(&mut driver.license_expiry);
        patch.phone.apply(&mut driver.phone);
        patch.user_id.apply(&mut driver.user_id);
        if let Some(status) = patch.status {
            driver.status = status;
        }
        driver.updated_at = now();

        if !self.store.update_driver(&driver)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        self.find_driver(org_id, id)
    }

    /// Trips of the driver go with it.
    pub fn delete_driver(&self, caller: &Caller, id: DriverId) -> Result<Ack, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        if !self.store.delete_driver(org_id, id)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        tracing::info!(driver_id = %id, "Deleted driver");
        Ok(Ack::OK)
    }

    pub(crate) fn find_driver(&self, org_id: OrgId, id: DriverId) -> Result<Driver, ApiError> {
        self.store
            .get_driver(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    /// A driver may only be linked to a login of the same organization.
    fn check_linked_user(&self, org_id: OrgId, user_id: UserId) -> Result<(), ApiError> {
        match self.store.user_by_id(user_id)? {
            Some(user) if user.org_id == Some(org_id) => Ok(()),
            _ => Err(ApiError::field("userId", "User not found in organization")),
        }
    }
}
