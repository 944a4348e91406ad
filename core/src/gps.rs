use fleet_store::now;
use fleet_types::GpsPosition;

use crate::access::Caller;
use crate::errors::ApiError;
use crate::Fleet;

/// Vehicles placed on the map at once.
const MAX_TRACKED: u32 = 20;
const BASE_LAT: f64 = 44.8;
const BASE_LNG: f64 = 20.45;

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Deterministic stand-in position for the `index`-th tracked vehicle.
fn mock_position(index: usize) -> (f64, f64) {
    let i = index as f64;
    (
        round6(BASE_LAT + 0.01 * i + 0.005 * i.sin()),
        round6(BASE_LNG + 0.01 * i + 0.005 * i.cos()),
    )
}

impl Fleet {
    /// Mock positions for the organization's active vehicles, oldest first.
    pub fn gps_positions(&self, caller: &Caller) -> Result<Vec<GpsPosition>, ApiError> {
        let Some(org_id) = caller.org_id else {
            return Ok(Vec::new());
        };
        let at = now();
        let positions = self
            .store
            .active_vehicles(org_id, MAX_TRACKED)?
            .into_iter()
            .enumerate()
            .map(|(index, vehicle)| {
                let (lat, lng) = mock_position(index);
                GpsPosition {
                    vehicle_id: vehicle.id,
                    lat,
                    lng,
                    updated_at: at,
                }
            })
            .collect();
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use fleet_types::{UserRole, VehicleStatus};

    use super::*;
    use crate::input::VehiclePatch;
    use crate::test_support::{admin, fleet, member, org, vehicle};

    #[test]
    fn positions_follow_formula() {
        assert_eq!(mock_position(0), (44.8, 20.455));
        let (lat, lng) = mock_position(1);
        assert_eq!(lat, 44.814207);
        assert_eq!(lng, 20.462702);
    }

    #[test]
    fn only_active_vehicles_are_tracked() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let boss = admin(&fleet, acme.id);
        let first = vehicle(&fleet, &boss, "Volvo");
        let parked = vehicle(&fleet, &boss, "MAN");
        fleet
            .update_vehicle(
                &boss,
                parked.id,
                VehiclePatch {
                    status: Some(VehicleStatus::InService),
                    ..VehiclePatch::default()
                },
            )
            .unwrap();

        let positions = fleet.gps_positions(&boss).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].vehicle_id, first.id);
        assert_eq!((positions[0].lat, positions[0].lng), mock_position(0));

        let orphan = member(&fleet, None, UserRole::Admin);
        assert!(fleet.gps_positions(&orphan).unwrap().is_empty());
    }

    #[test]
    fn at_most_twenty_vehicles() {
        let fleet = fleet();
        let acme = org(&fleet, "Acme");
        let boss = admin(&fleet, acme.id);
        for n in 0..22 {
            vehicle(&fleet, &boss, &format!("Truck {n}"));
        }
        assert_eq!(fleet.gps_positions(&boss).unwrap().len(), 20);
    }
}
