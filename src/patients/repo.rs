use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use crate::care::{model::Patient, CareError, Entity};

/// Update the editable profile fields. `caregiver_ids` is only ever written by the care store.
pub async fn update_profile(
    db: &PgPool,
    patient_id: Uuid,
    date_of_birth: Option<Date>,
    conditions: Option<&[String]>,
) -> Result<Patient, CareError> {
    sqlx::query_as::<_, Patient>(
        r#"
        UPDATE patients
           SET date_of_birth = COALESCE($2, date_of_birth),
               conditions    = COALESCE($3, conditions)
         WHERE id = $1
        RETURNING id, user_id, date_of_birth, conditions, caregiver_ids, created_at
        "#,
    )
    .bind(patient_id)
    .bind(date_of_birth)
    .bind(conditions)
    .fetch_optional(db)
    .await?
    .ok_or(CareError::not_found(Entity::Patient, patient_id))
}
