use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{jwt::AuthUser, repo_types::Role},
    care::{
        access,
        ids::{parse_id, parse_pair},
        CareError, Entity,
    },
    state::AppState,
};

use super::{dto::CreateNoteRequest, repo, repo_types::Note};

pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/patients/:patient_id/notes", get(list_notes).post(create_note))
        .route("/patients/:patient_id/notes/:note_id", delete(delete_note))
}

/// Authors may delete their own notes; admins may delete any.
pub fn may_delete(user: &AuthUser, note: &Note) -> bool {
    user.role == Role::Admin || note.author_id == Some(user.id)
}

#[instrument(skip(state))]
pub async fn list_notes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<Note>>, CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;
    Ok(Json(repo::list_for_patient(&state.db, patient_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;
    let text = body.validate()?;

    let note = repo::create(&state.db, patient_id, user.id, &text).await?;
    info!(note_id = %note.id, %patient_id, author_id = %user.id, "note added");
    Ok((StatusCode::CREATED, Json(note)))
}

#[instrument(skip(state))]
pub async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path((patient_id, note_id)): Path<(String, String)>,
) -> Result<StatusCode, CareError> {
    let (patient_id, note_id) = parse_pair((Entity::Patient, &patient_id), (Entity::Note, &note_id))?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;

    let note = repo::find_for_patient(&state.db, note_id, patient_id).await?;
    if !may_delete(&user, &note) {
        warn!(%note_id, user_id = %user.id, "note delete by non-author refused");
        return Err(CareError::forbidden("only the author or an admin may delete a note"));
    }

    repo::delete(&state.db, note_id).await?;
    info!(%note_id, %patient_id, "note deleted");
    Ok(StatusCode::NO_CONTENT)
}
