use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::Note;
use crate::care::{CareError, Entity};

const NOTE_COLUMNS: &str = "id, patient_id, author_id, body, created_at";

pub async fn list_for_patient(db: &PgPool, patient_id: Uuid) -> Result<Vec<Note>, CareError> {
    let rows = sqlx::query_as::<_, Note>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE patient_id = $1 ORDER BY created_at DESC"
    ))
    .bind(patient_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create(db: &PgPool, patient_id: Uuid, author_id: Uuid, body: &str) -> Result<Note, CareError> {
    let note = sqlx::query_as::<_, Note>(&format!(
        "INSERT INTO notes (id, patient_id, author_id, body) VALUES ($1, $2, $3, $4) RETURNING {NOTE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(author_id)
    .bind(body)
    .fetch_one(db)
    .await?;
    Ok(note)
}

pub async fn find_for_patient(db: &PgPool, note_id: Uuid, patient_id: Uuid) -> Result<Note, CareError> {
    sqlx::query_as::<_, Note>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND patient_id = $2"
    ))
    .bind(note_id)
    .bind(patient_id)
    .fetch_optional(db)
    .await?
    .ok_or(CareError::not_found(Entity::Note, note_id))
}

pub async fn delete(db: &PgPool, note_id: Uuid) -> Result<(), CareError> {
    sqlx::query("DELETE FROM notes WHERE id = $1")
        .bind(note_id)
        .execute(db)
        .await?;
    Ok(())
}
