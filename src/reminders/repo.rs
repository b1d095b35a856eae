use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo_types::{Reminder, ReminderStatus},
    status,
};
use crate::care::{CareError, Entity};

const REMINDER_COLUMNS: &str = "id, medication_id, patient_id, scheduled_at, status, created_at";

pub async fn list_for_patient(
    db: &PgPool,
    patient_id: Uuid,
    status: Option<ReminderStatus>,
) -> Result<Vec<Reminder>, CareError> {
    let rows = sqlx::query_as::<_, Reminder>(&format!(
        r#"
        SELECT {REMINDER_COLUMNS}
          FROM reminders
         WHERE patient_id = $1 AND ($2::text IS NULL OR status = $2)
         ORDER BY scheduled_at ASC
        "#
    ))
    .bind(patient_id)
    .bind(status)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Insert a reminder for a medication of `patient_id`. The medication check and
/// the insert are one statement, so a medication deleted meanwhile yields `NotFound`.
pub async fn create(
    db: &PgPool,
    patient_id: Uuid,
    medication_id: Uuid,
    scheduled_at: OffsetDateTime,
) -> Result<Reminder, CareError> {
    sqlx::query_as::<_, Reminder>(&format!(
        r#"
        INSERT INTO reminders (id, medication_id, patient_id, scheduled_at, status)
        SELECT $1, m.id, m.patient_id, $4, 'upcoming'
          FROM medications m
         WHERE m.id = $2 AND m.patient_id = $3
        RETURNING {REMINDER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(medication_id)
    .bind(patient_id)
    .bind(scheduled_at)
    .fetch_optional(db)
    .await?
    .ok_or(CareError::not_found(Entity::Medication, medication_id))
}

/// Move a reminder to `next`, holding its row lock while the transition is checked.
pub async fn set_status(
    db: &PgPool,
    reminder_id: Uuid,
    patient_id: Uuid,
    next: ReminderStatus,
) -> Result<Reminder, CareError> {
    let mut tx = db.begin().await?;

    let current = sqlx::query_scalar::<_, ReminderStatus>(
        "SELECT status FROM reminders WHERE id = $1 AND patient_id = $2 FOR UPDATE",
    )
    .bind(reminder_id)
    .bind(patient_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CareError::not_found(Entity::Reminder, reminder_id))?;

    let next = status::transition(current, next)?;

    let reminder = sqlx::query_as::<_, Reminder>(&format!(
        "UPDATE reminders SET status = $2 WHERE id = $1 RETURNING {REMINDER_COLUMNS}"
    ))
    .bind(reminder_id)
    .bind(next)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(reminder)
}
