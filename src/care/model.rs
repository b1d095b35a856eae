use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Patient profile. `caregiver_ids` is one side of the caregiver link.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "crate::dates::option")]
    pub date_of_birth: Option<Date>,
    pub conditions: Vec<String>,
    pub caregiver_ids: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Caregiver profile. `patient_ids` mirrors `Patient::caregiver_ids`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Caregiver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: Option<String>,
    pub organization: Option<String>,
    pub patient_ids: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PatientSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "crate::dates::option")]
    pub date_of_birth: Option<Date>,
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CaregiverSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub specialization: Option<String>,
    pub organization: Option<String>,
}

/// Caregiver with its patient set resolved to summaries.
#[derive(Debug, Clone, Serialize)]
pub struct CaregiverDetails {
    #[serde(flatten)]
    pub caregiver: Caregiver,
    pub patients: Vec<PatientSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientDetails {
    #[serde(flatten)]
    pub patient: Patient,
    pub caregivers: Vec<CaregiverSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaregiverRemoval {
    pub caregiver_id: Uuid,
    pub user_id: Uuid,
    pub patients_unlinked: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatientRemoval {
    pub patient_id: Uuid,
    pub user_id: Uuid,
    pub caregivers_unlinked: u64,
    pub medications_deleted: u64,
    pub reminders_deleted: u64,
    pub prescriptions_deleted: u64,
    pub notes_deleted: u64,
    /// Object-storage keys of deleted prescription attachments, removed after commit.
    #[serde(skip)]
    pub attachment_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedicationRemoval {
    pub medication_id: Uuid,
    pub patient_id: Uuid,
    pub reminders_deleted: u64,
}

/// Reorder rows fetched with `= ANY($1)` to follow the order of `ids`.
pub(crate) fn order_by_ids<T>(ids: &[Uuid], mut rows: Vec<T>, key: impl Fn(&T) -> Uuid) -> Vec<T> {
    rows.sort_by_key(|row| {
        let id = key(row);
        ids.iter().position(|x| *x == id).unwrap_or(usize::MAX)
    });
    rows
}
