use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {kind} id: {raw}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub raw: String,
}

/// Every table is keyed by a random UUID. The newtypes keep a trip id from
/// being passed where a vehicle id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn parse(raw: &str) -> Result<Self, IdParseError> {
                Uuid::parse_str(raw.trim())
                    .map(Self)
                    .map_err(|_| IdParseError {
                        kind: $kind,
                        raw: raw.to_string(),
                    })
            }

            #[must_use]
            pub const fn value(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

uuid_id!(
    /// Tenant scope. Every fleet record belongs to exactly one organization.
    OrgId,
    "organization"
);
uuid_id!(UserId, "user");
uuid_id!(VehicleId, "vehicle");
uuid_id!(TrailerId, "trailer");
uuid_id!(DriverId, "driver");
uuid_id!(TripId, "trip");
uuid_id!(FuelRecordId, "fuel record");
uuid_id!(LocationId, "location");
uuid_id!(DocumentId, "document");
uuid_id!(AuditId, "audit");
uuid_id!(ResetTokenId, "reset token");
uuid_id!(IntegrityLogId, "integrity log");
