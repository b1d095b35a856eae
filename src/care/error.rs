use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::auth::repo_types::Role;

/// Kinds of stored records, used to name the missing one in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    User,
    Patient,
    Caregiver,
    Medication,
    Reminder,
    Prescription,
    Note,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::User => "user",
            Entity::Patient => "patient",
            Entity::Caregiver => "caregiver",
            Entity::Medication => "medication",
            Entity::Reminder => "reminder",
            Entity::Prescription => "prescription",
            Entity::Note => "note",
        }
    }

    /// Name of the identifier field for this entity, as it appears in paths and bodies.
    pub fn id_field(self) -> &'static str {
        match self {
            Entity::User => "user_id",
            Entity::Patient => "patient_id",
            Entity::Caregiver => "caregiver_id",
            Entity::Medication => "medication_id",
            Entity::Reminder => "reminder_id",
            Entity::Prescription => "prescription_id",
            Entity::Note => "note_id",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the care domain and surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum CareError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: Uuid },
    #[error("no {0} profile for this account")]
    NoProfile(Role),
    #[error("conflicting concurrent update: {0}")]
    Conflict(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("store operation failed: {0:#}")]
    Persistence(anyhow::Error),
}

impl CareError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CareError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        CareError::NotFound { entity, id }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        CareError::Forbidden(reason.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CareError::Validation { .. } => StatusCode::BAD_REQUEST,
            CareError::NotFound { .. } | CareError::NoProfile(_) => StatusCode::NOT_FOUND,
            CareError::Conflict(_) => StatusCode::CONFLICT,
            CareError::Unauthorized => StatusCode::UNAUTHORIZED,
            CareError::Forbidden(_) => StatusCode::FORBIDDEN,
            CareError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CareError::Validation { .. } => "VALIDATION",
            CareError::NotFound { .. } | CareError::NoProfile(_) => "NOT_FOUND",
            CareError::Conflict(_) => "CONFLICT",
            CareError::Unauthorized => "AUTH_REQUIRED",
            CareError::Forbidden(_) => "FORBIDDEN",
            CareError::Persistence(_) => "INTERNAL",
        }
    }
}

// 40001 serialization_failure, 40P01 deadlock_detected, 23505 unique_violation
impl From<sqlx::Error> for CareError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            match db.code().as_deref() {
                Some("40001") | Some("40P01") => {
                    return CareError::Conflict(
                        "transaction aborted by a concurrent update, retry".into(),
                    )
                }
                Some("23505") => return CareError::Conflict(db.message().to_string()),
                _ => {}
            }
        }
        CareError::Persistence(anyhow::Error::new(e))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for CareError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            CareError::Persistence(inner) => {
                error!(error = %format!("{inner:#}"), "store failure");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
