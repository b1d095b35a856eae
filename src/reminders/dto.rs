use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Reminder, ReminderStatus};

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    pub medication_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReminderStatus {
    pub status: ReminderStatus,
}

#[derive(Debug, Deserialize)]
pub struct ReminderFilter {
    #[serde(default)]
    pub status: Option<ReminderStatus>,
}

#[derive(Debug, Serialize)]
pub struct ReminderList {
    pub reminders: Vec<Reminder>,
    pub adherence: Option<f64>,
}
