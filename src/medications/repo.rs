use sqlx::PgPool;
use uuid::Uuid;

use super::{dto::MedicationInput, repo_types::Medication};
use crate::care::{CareError, Entity};

const MEDICATION_COLUMNS: &str =
    "id, patient_id, added_by, name, dosage, frequency, instructions, start_date, end_date, created_at";

impl From<Medication> for MedicationInput {
    fn from(m: Medication) -> Self {
        Self {
            name: m.name,
            dosage: m.dosage,
            frequency: m.frequency,
            instructions: m.instructions,
            start_date: m.start_date,
            end_date: m.end_date,
        }
    }
}

pub async fn list_for_patient(db: &PgPool, patient_id: Uuid) -> Result<Vec<Medication>, CareError> {
    let rows = sqlx::query_as::<_, Medication>(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications WHERE patient_id = $1 ORDER BY created_at DESC"
    ))
    .bind(patient_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_for_patient(
    db: &PgPool,
    medication_id: Uuid,
    patient_id: Uuid,
) -> Result<Medication, CareError> {
    sqlx::query_as::<_, Medication>(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = $1 AND patient_id = $2"
    ))
    .bind(medication_id)
    .bind(patient_id)
    .fetch_optional(db)
    .await?
    .ok_or(CareError::not_found(Entity::Medication, medication_id))
}

pub async fn create(
    db: &PgPool,
    patient_id: Uuid,
    added_by: Uuid,
    input: &MedicationInput,
) -> Result<Medication, CareError> {
    let row = sqlx::query_as::<_, Medication>(&format!(
        r#"
        INSERT INTO medications
            (id, patient_id, added_by, name, dosage, frequency, instructions, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {MEDICATION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(added_by)
    .bind(&input.name)
    .bind(&input.dosage)
    .bind(&input.frequency)
    .bind(&input.instructions)
    .bind(input.start_date)
    .bind(input.end_date)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    medication_id: Uuid,
    patient_id: Uuid,
    input: &MedicationInput,
) -> Result<Medication, CareError> {
    sqlx::query_as::<_, Medication>(&format!(
        r#"
        UPDATE medications
           SET name = $3, dosage = $4, frequency = $5, instructions = $6,
               start_date = $7, end_date = $8
         WHERE id = $1 AND patient_id = $2
        RETURNING {MEDICATION_COLUMNS}
        "#
    ))
    .bind(medication_id)
    .bind(patient_id)
    .bind(&input.name)
    .bind(&input.dosage)
    .bind(&input.frequency)
    .bind(&input.instructions)
    .bind(input.start_date)
    .bind(input.end_date)
    .fetch_optional(db)
    .await?
    .ok_or(CareError::not_found(Entity::Medication, medication_id))
}
