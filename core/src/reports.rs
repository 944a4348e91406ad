//! Read-only aggregates over the caller's organization.
//!
//! A caller without an organization gets zeroed counts and empty lists
//! rather than an error.

use fleet_types::{FuelReportItem, LocationsReportItem, ReportSummary, TripsReport};

pub use fleet_store::DateRange as ReportRange;

use crate::access::Caller;
use crate::errors::ApiError;
use crate::Fleet;

impl Fleet {
    /// Trip and fuel counts honour `range`; the other counts are totals.
    pub fn report_summary(
        &self,
        caller: &Caller,
        range: ReportRange,
    ) -> Result<ReportSummary, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.report_summary(org_id, range)?),
            None => Ok(ReportSummary::default()),
        }
    }

    pub fn fuel_report(
        &self,
        caller: &Caller,
        range: ReportRange,
    ) -> Result<Vec<FuelReportItem>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.fuel_report(org_id, range)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn trips_report(&self, caller: &Caller, range: ReportRange) -> Result<TripsReport, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.trips_report(org_id, range)?),
            None => Ok(TripsReport::default()),
        }
    }

    pub fn locations_report(&self, caller: &Caller) -> Result<Vec<LocationsReportItem>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.locations_report(org_id)?),
            None => Ok(Vec::new()),
        }
    }
}
