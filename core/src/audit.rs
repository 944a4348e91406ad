use fleet_store::{AuditQuery, AuditSort, SortOrder};
use fleet_types::LoginAuditEntry;
use serde::Serialize;

use crate::access::Caller;
use crate::errors::ApiError;
use crate::input::AuditParams;
use crate::Fleet;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// One page of the login audit. Serialized as the whole response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditListing {
    pub data: Vec<LoginAuditEntry>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl Fleet {
    /// Administrators only. Unknown sort keys and orders fall back to the
    /// defaults (`createdAt`, `desc`).
    pub fn list_login_audit(
        &self,
        caller: &Caller,
        params: AuditParams,
    ) -> Result<AuditListing, ApiError> {
        caller.require_admin()?;

        let page = params.page.unwrap_or(1).max(1);
        let limit = params
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let query = AuditQuery {
            org_id: caller.org_id,
            search: params.search,
            sort: params
                .sort
                .as_deref()
                .and_then(AuditSort::parse)
                .unwrap_or_default(),
            order: params
                .order
                .as_deref()
                .and_then(SortOrder::parse)
                .unwrap_or_default(),
            offset: (page - 1).saturating_mul(limit),
            limit,
        };
        let result = self.store.search_login_audit(&query)?;

        Ok(AuditListing {
            data: result.entries,
            total: result.total,
            page,
            limit,
        })
    }
}
