use sqlx::PgPool;
use uuid::Uuid;

use super::{dto::PrescriptionInput, repo_types::Prescription};
use crate::care::{CareError, Entity};

const PRESCRIPTION_COLUMNS: &str = "id, patient_id, author_id, medication_name, dosage, instructions, \
     prescribed_by, issued_on, attachment_key, created_at";

pub async fn list_for_patient(db: &PgPool, patient_id: Uuid) -> Result<Vec<Prescription>, CareError> {
    let rows = sqlx::query_as::<_, Prescription>(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE patient_id = $1 ORDER BY created_at DESC"
    ))
    .bind(patient_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_for_patient(
    db: &PgPool,
    prescription_id: Uuid,
    patient_id: Uuid,
) -> Result<Prescription, CareError> {
    sqlx::query_as::<_, Prescription>(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = $1 AND patient_id = $2"
    ))
    .bind(prescription_id)
    .bind(patient_id)
    .fetch_optional(db)
    .await?
    .ok_or(CareError::not_found(Entity::Prescription, prescription_id))
}

pub async fn create(
    db: &PgPool,
    patient_id: Uuid,
    author_id: Uuid,
    input: &PrescriptionInput,
) -> Result<Prescription, CareError> {
    let row = sqlx::query_as::<_, Prescription>(&format!(
        r#"
        INSERT INTO prescriptions
            (id, patient_id, author_id, medication_name, dosage, instructions, prescribed_by, issued_on)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {PRESCRIPTION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(author_id)
    .bind(&input.medication_name)
    .bind(&input.dosage)
    .bind(&input.instructions)
    .bind(&input.prescribed_by)
    .bind(input.issued_on)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Point the prescription at a new object. Returns the previous key, if any.
pub async fn replace_attachment(
    db: &PgPool,
    prescription_id: Uuid,
    patient_id: Uuid,
    key: &str,
) -> Result<Option<String>, CareError> {
    let mut tx = db.begin().await?;

    let previous = sqlx::query_scalar::<_, Option<String>>(
        "SELECT attachment_key FROM prescriptions WHERE id = $1 AND patient_id = $2 FOR UPDATE",
    )
    .bind(prescription_id)
    .bind(patient_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CareError::not_found(Entity::Prescription, prescription_id))?;

    sqlx::query("UPDATE prescriptions SET attachment_key = $2 WHERE id = $1")
        .bind(prescription_id)
        .bind(key)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(previous)
}
