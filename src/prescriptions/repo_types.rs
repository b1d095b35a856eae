use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub author_id: Option<Uuid>,
    pub medication_name: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub prescribed_by: Option<String>,
    #[serde(with = "crate::dates::option")]
    pub issued_on: Option<Date>,
    #[serde(skip_serializing)]
    pub attachment_key: Option<String>, // object storage key, served via presigned URL
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
