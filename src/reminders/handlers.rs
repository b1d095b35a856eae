use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    care::{
        access,
        ids::{parse_id, parse_pair},
        CareError, Entity,
    },
    state::AppState,
};

use super::{
    adherence,
    dto::{CreateReminderRequest, ReminderFilter, ReminderList, UpdateReminderStatus},
    repo,
    repo_types::Reminder,
};

pub fn reminder_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/patients/:patient_id/reminders",
            get(list_reminders).post(create_reminder),
        )
        .route(
            "/patients/:patient_id/reminders/:reminder_id",
            patch(update_reminder_status),
        )
}

#[instrument(skip(state))]
pub async fn list_reminders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
    Query(filter): Query<ReminderFilter>,
) -> Result<Json<ReminderList>, CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;

    let reminders = repo::list_for_patient(&state.db, patient_id, filter.status).await?;
    let tally = adherence::tally_for_patient(&state.db, patient_id).await?;
    Ok(Json(ReminderList {
        reminders,
        adherence: adherence::percentage(&tally),
    }))
}

#[instrument(skip(state, body))]
pub async fn create_reminder(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
    Json(body): Json<CreateReminderRequest>,
) -> Result<(StatusCode, Json<Reminder>), CareError> {
    let (patient_id, medication_id) = parse_pair(
        (Entity::Patient, &patient_id),
        (Entity::Medication, &body.medication_id),
    )?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;

    let reminder = repo::create(&state.db, patient_id, medication_id, body.scheduled_at).await?;
    info!(reminder_id = %reminder.id, %medication_id, %patient_id, "reminder scheduled");
    Ok((StatusCode::CREATED, Json(reminder)))
}

#[instrument(skip(state))]
pub async fn update_reminder_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((patient_id, reminder_id)): Path<(String, String)>,
    Json(body): Json<UpdateReminderStatus>,
) -> Result<Json<Reminder>, CareError> {
    let (patient_id, reminder_id) = parse_pair(
        (Entity::Patient, &patient_id),
        (Entity::Reminder, &reminder_id),
    )?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;

    let reminder = repo::set_status(&state.db, reminder_id, patient_id, body.status).await?;
    info!(%reminder_id, %patient_id, status = %reminder.status, "reminder status changed");
    Ok(Json(reminder))
}
