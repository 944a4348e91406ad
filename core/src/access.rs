//! The authenticated caller and tenant scoping rules.

use fleet_types::{OrgId, User, UserId, UserRole};

use crate::errors::ApiError;

/// The user behind a verified bearer token, as loaded from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub org_id: Option<OrgId>,
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            org_id: user.org_id,
        }
    }
}

impl Caller {
    pub(crate) fn require_writer(&self) -> Result<(), ApiError> {
        if self.role.can_write() {
            Ok(())
        } else {
            Err(ApiError::forbidden("FORBIDDEN", "Read-only role"))
        }
    }

    pub(crate) fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == UserRole::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("FORBIDDEN", "Admin only"))
        }
    }

    /// Organization new records are created in.
    pub(crate) fn org_for_create(&self) -> Result<OrgId, ApiError> {
        self.require_writer()?;
        self.org_id
            .ok_or_else(|| ApiError::forbidden("ORG_REQUIRED", "Organization required"))
    }

    /// Organization an existing record must belong to. A caller without one
    /// sees nothing, so the record reads as missing.
    pub(crate) fn org_for_record(&self, missing: &str) -> Result<OrgId, ApiError> {
        self.org_id.ok_or_else(|| ApiError::not_found(missing))
    }

    /// `org_for_record` for update and delete.
    pub(crate) fn org_for_change(&self, missing: &str) -> Result<OrgId, ApiError> {
        self.require_writer()?;
        self.org_for_record(missing)
    }
}
