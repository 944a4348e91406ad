use fleet_store::now;
use fleet_types::{Location, LocationId, LocationType};

use crate::access::Caller;
use crate::errors::ApiError;
use crate::input::{LocationPatch, NewLocation};
use crate::{Ack, Fleet};

const NOT_FOUND: &str = "Location not found";

impl Fleet {
    /// Ordered by name. `kind` narrows the listing to one location type.
    pub fn list_locations(
        &self,
        caller: &Caller,
        kind: Option<LocationType>,
    ) -> Result<Vec<Location>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.list_locations(org_id, kind)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_location(&self, caller: &Caller, id: LocationId) -> Result<Location, ApiError> {
        let org_id = caller.org_for_record(NOT_FOUND)?;
        self.store
            .get_location(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub fn create_location(&self, caller: &Caller, input: NewLocation) -> Result<Location, ApiError> {
        let org_id = caller.org_for_create()?;
        let at = now();
        let location = Location {
            id: LocationId::new_v4(),
            org_id,
            name: input.name,
            location_type: input.location_type,
            address: input.address,
            status: input.status,
            created_at: at,
            updated_at: at,
        };
        self.store.insert_location(&location)?;
        tracing::info!(location_id = %location.id, kind = %location.location_type, "Created location");
        Ok(location)
    }

    pub fn update_location(
        &self,
        caller: &Caller,
        id: LocationId,
        patch: LocationPatch,
    ) -> Result<Location, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        let mut location = self
            .store
            .get_location(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        if let Some(name) = patch.name {
            location.name = name;
        }
        if let Some(kind) = patch.location_type {
            location.location_type = kind;
        }
        patch.address.apply(&mut location.address);
        if let Some(status) = patch.status {
            location.status = status;
        }
        location.updated_at = now();

        if !self.store.update_location(&location)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        Ok(location)
    }

    pub fn delete_location(&self, caller: &Caller, id: LocationId) -> Result<Ack, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        if !self.store.delete_location(org_id, id)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        tracing::info!(location_id = %id, "Deleted location");
        Ok(Ack::OK)
    }
}

#[cfg(test)]
mod tests {
    use fleet_types::LocationStatus;

    use super::*;
    use crate::input::Patch;
    use crate::test_support::{admin, fleet, org};

    fn new_location(name: &str, kind: LocationType) -> NewLocation {
        NewLocation {
            name: name.to_string(),
            location_type: kind,
            address: Some("Bulevar 1".to_string()),
            status: LocationStatus::Active,
        }
    }

    #[test]
    fn list_filters_by_type() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let boss = admin(&fleet, acme.id);
        let depot = fleet
            .create_location(&boss, new_location("Depot", LocationType::Parking))
            .unwrap();
        let workshop = fleet
            .create_location(&boss, new_location("Workshop", LocationType::Service))
            .unwrap();

        let all: Vec<_> = fleet
            .list_locations(&boss, None)
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(all, vec![depot.id, workshop.id]);
        assert_eq!(
            fleet
                .list_locations(&boss, Some(LocationType::Service))
                .unwrap(),
            vec![workshop]
        );
    }

    #[test]
    fn update_changes_type_and_clears_address() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let boss = admin(&fleet, acme.id);
        let depot = fleet
            .create_location(&boss, new_location("Depot", LocationType::Parking))
            .unwrap();

        let updated = fleet
            .update_location(
                &boss,
                depot.id,
                LocationPatch {
                    location_type: Some(LocationType::Service),
                    address: Patch::Clear,
                    status: Some(LocationStatus::Paused),
                    ..LocationPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.location_type, LocationType::Service);
        assert_eq!(updated.address, None);
        assert_eq!(updated.name, "Depot");
        assert_eq!(fleet.get_location(&boss, depot.id).unwrap(), updated);
    }

    #[test]
    fn other_org_cannot_delete() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let rival = org(&fleet, "Rival");
        let depot = fleet
            .create_location(&admin(&fleet, acme.id), new_location("Depot", LocationType::Parking))
            .unwrap();
        let err = fleet
            .delete_location(&admin(&fleet, rival.id), depot.id)
            .unwrap_err();
        assert_eq!(err.to_string(), "Location not found");
    }
}
