//! Wire-level enums: roles, statuses and kinds.
//!
//! All of them travel as SCREAMING_SNAKE_CASE strings in JSON and are stored
//! verbatim in SQLite, so `as_str` and `parse` are the single mapping.

use serde::{Deserialize, Serialize};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Exact match on the wire name.
            #[must_use]
            pub fn parse(raw: &str) -> Option<Self> {
                match raw {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }

            #[must_use]
            pub const fn all() -> &'static [Self] {
                &[$(Self::$variant),+]
            }

            /// Comma-separated wire names, for validation messages.
            #[must_use]
            pub fn expected() -> String {
                Self::all()
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Access role carried in the JWT and checked by the services.
    UserRole {
        Admin => "ADMIN",
        Driver => "DRIVER",
        Auditor => "AUDITOR",
    }
);

impl UserRole {
    /// Auditors may read everything in their organization but change nothing.
    #[must_use]
    pub const fn can_write(self) -> bool {
        !matches!(self, Self::Auditor)
    }
}

wire_enum!(
    /// Account state. Only `ACTIVE` accounts may log in or call the API.
    AccountStatus {
        Active => "ACTIVE",
        Paused => "PAUSED",
        Frozen => "FROZEN",
    }
);

wire_enum!(
    /// Shared by vehicles and trailers.
    VehicleStatus {
        Active => "ACTIVE",
        Paused => "PAUSED",
        Frozen => "FROZEN",
        InService => "IN_SERVICE",
    }
);

wire_enum!(
    DriverStatus {
        Active => "ACTIVE",
        Paused => "PAUSED",
        Frozen => "FROZEN",
    }
);

wire_enum!(
    TripStatus {
        PreTrip => "PRE_TRIP",
        InProgress => "IN_PROGRESS",
        PostTrip => "POST_TRIP",
        Completed => "COMPLETED",
    }
);

wire_enum!(
    LocationType {
        Parking => "PARKING",
        Service => "SERVICE",
    }
);

wire_enum!(
    LocationStatus {
        Active => "ACTIVE",
        Paused => "PAUSED",
        Frozen => "FROZEN",
    }
);

wire_enum!(
    /// What a document is attached to.
    DocumentEntityType {
        Trip => "TRIP",
        Vehicle => "VEHICLE",
        Driver => "DRIVER",
    }
);

wire_enum!(
    AuditAction {
        LoginSuccess => "LOGIN_SUCCESS",
        LoginFailed => "LOGIN_FAILED",
    }
);

/// How a user authenticates. Stored lowercase, unlike the other enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Email,
    Google,
    Facebook,
}

impl AuthProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Email => "email",
            AuthProvider::Google => "google",
            AuthProvider::Facebook => "facebook",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "email" => Some(AuthProvider::Email),
            "google" => Some(AuthProvider::Google),
            "facebook" => Some(AuthProvider::Facebook),
            _ => None,
        }
    }
}
