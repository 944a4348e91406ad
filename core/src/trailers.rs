use fleet_store::now;
use fleet_types::{Trailer, TrailerId};

use crate::access::Caller;
use crate::errors::ApiError;
use crate::input::{NewTrailer, TrailerPatch};
use crate::{Ack, Fleet};

const NOT_FOUND: &str = "Trailer not found";

impl Fleet {
    pub fn list_trailers(&self, caller: &Caller) -> Result<Vec<Trailer>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.list_trailers(org_id)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_trailer(&self, caller: &Caller, id: TrailerId) -> Result<Trailer, ApiError> {
        let org_id = caller.org_for_record(NOT_FOUND)?;
        self.store
            .get_trailer(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub fn create_trailer(&self, caller: &Caller, input: NewTrailer) -> Result<Trailer, ApiError> {
        let org_id = caller.org_for_create()?;
        let at = now();
        let trailer = Trailer {
            id: TrailerId::new_v4(),
            org_id,
            make: input.make,
            model: input.model,
            registration: input.registration,
            mileage: input.mileage,
            purchase_date: input.purchase_date,
            status: input.status,
            created_at: at,
            updated_at: at,
        };
        self.store.insert_trailer(&trailer)?;
        tracing::info!(trailer_id = %trailer.id, org_id = %org_id, "Created trailer");
        Ok(trailer)
    }

    pub fn update_trailer(
        &self,
        caller: &Caller,
        id: TrailerId,
        patch: TrailerPatch,
    ) -> Result<Trailer, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        let mut trailer = self
            .store
            .get_trailer(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        if let Some(make) = patch.make {
            trailer.make = make;
        }
        if let Some(model) = patch.model {
            trailer.model = model;
        }
        patch.registration.apply(&mut trailer.registration);
        if let Some(mileage) = patch.mileage {
            trailer.mileage = mileage;
        }
        patch.purchase_date.apply(&mut trailer.purchase_date);
        if let Some(status) = patch.status {
            trailer.status = status;
        }
        trailer.updated_at = now();

        if !self.store.update_trailer(&trailer)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        Ok(trailer)
    }

    pub fn delete_trailer(&self, caller: &Caller, id: TrailerId) -> Result<Ack, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        if !self.store.delete_trailer(org_id, id)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        tracing::info!(trailer_id = %id, "Deleted trailer");
        Ok(Ack::OK)
    }
}
