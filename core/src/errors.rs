//! The service error taxonomy.
//!
//! Every service returns `Result<T, ApiError>`. The HTTP layer maps the error
//! to a status code and a `{message, code, errors?}` body in one place.

use serde::Serialize;
use thiserror::Error;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 `VALIDATION` with per-field messages.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    /// A business-rule rejection with a fixed status and code.
    #[error("{message}")]
    Rejected {
        status: u16,
        code: &'static str,
        message: String,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn rejected(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::rejected(400, code, message)
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::rejected(401, code, message)
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::rejected(403, code, message)
    }

    /// 404 `NOT_FOUND`. Also used for records of another organization.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::rejected(404, "NOT_FOUND", message)
    }

    pub fn unavailable(code: &'static str, message: impl Into<String>) -> Self {
        Self::rejected(503, code, message)
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Internal(_) => 500,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION",
            ApiError::Rejected { code, .. } => code,
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ApiError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let err = ApiError::field("make", "Make is required");
        assert_eq!(err.status(), 400);
        assert_eq!(err.code(), "VALIDATION");
        assert_eq!(err.to_string(), "Validation failed");
        assert_eq!(err.field_errors()[0].field, "make");
    }

    #[test]
    fn rejected_keeps_status_and_code() {
        let err = ApiError::forbidden("ORG_REQUIRED", "Organization required");
        assert_eq!(err.status(), 403);
        assert_eq!(err.code(), "ORG_REQUIRED");
        assert_eq!(err.to_string(), "Organization required");
        assert!(err.field_errors().is_empty());
    }

    #[test]
    fn anyhow_becomes_internal() {
        let err: ApiError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.status(), 500);
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.to_string(), "disk full");
    }
}
