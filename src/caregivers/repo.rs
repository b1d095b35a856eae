use sqlx::PgPool;
use uuid::Uuid;

use crate::care::{model::Caregiver, CareError, Entity};

/// Update the editable profile fields. An empty string clears the column.
pub async fn update_profile(
    db: &PgPool,
    caregiver_id: Uuid,
    specialization: Option<&str>,
    organization: Option<&str>,
) -> Result<Caregiver, CareError> {
    sqlx::query_as::<_, Caregiver>(
        r#"
        UPDATE caregivers
           SET specialization = CASE WHEN $2::text IS NULL THEN specialization ELSE NULLIF($2, '') END,
               organization   = CASE WHEN $3::text IS NULL THEN organization ELSE NULLIF($3, '') END
         WHERE id = $1
        RETURNING id, user_id, specialization, organization, patient_ids, created_at
        "#,
    )
    .bind(caregiver_id)
    .bind(specialization)
    .bind(organization)
    .fetch_optional(db)
    .await?
    .ok_or(CareError::not_found(Entity::Caregiver, caregiver_id))
}
