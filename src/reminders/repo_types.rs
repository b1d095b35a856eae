use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum ReminderStatus {
    Upcoming,
    Completed,
    Missed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reminder {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub patient_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub status: ReminderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Reminder counts for one patient, input to the adherence calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct ReminderTally {
    pub completed: i64,
    pub missed: i64,
    /// Still `upcoming` although `scheduled_at` has passed.
    pub overdue: i64,
    /// Still `upcoming` and scheduled in the future.
    pub pending: i64,
}
