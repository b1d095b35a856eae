use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub added_by: Option<Uuid>, // NULL once the adding user is deleted
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: Option<String>,
    #[serde(with = "crate::dates::option")]
    pub start_date: Option<Date>,
    #[serde(with = "crate::dates::option")]
    pub end_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
