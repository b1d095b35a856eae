use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    care::{
        access,
        ids::{parse_id, parse_pair},
        model::MedicationRemoval,
        service, CareError, Entity,
    },
    state::AppState,
};

use super::{
    dto::{CreateMedicationRequest, UpdateMedicationRequest},
    repo,
    repo_types::Medication,
};

pub fn medication_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/patients/:patient_id/medications",
            get(list_medications).post(create_medication),
        )
        .route(
            "/patients/:patient_id/medications/:medication_id",
            put(update_medication).delete(delete_medication),
        )
}

#[instrument(skip(state))]
pub async fn list_medications(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<Medication>>, CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;
    Ok(Json(repo::list_for_patient(&state.db, patient_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_medication(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
    Json(body): Json<CreateMedicationRequest>,
) -> Result<(StatusCode, Json<Medication>), CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;
    let input = body.validate()?;

    let medication = repo::create(&state.db, patient_id, user.id, &input).await?;
    info!(medication_id = %medication.id, %patient_id, added_by = %user.id, "medication added");
    Ok((StatusCode::CREATED, Json(medication)))
}

#[instrument(skip(state, body))]
pub async fn update_medication(
    State(state): State<AppState>,
    user: AuthUser,
    Path((patient_id, medication_id)): Path<(String, String)>,
    Json(body): Json<UpdateMedicationRequest>,
) -> Result<Json<Medication>, CareError> {
    let (patient_id, medication_id) = parse_pair(
        (Entity::Patient, &patient_id),
        (Entity::Medication, &medication_id),
    )?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;

    let current = repo::find_for_patient(&state.db, medication_id, patient_id).await?;
    let input = body.apply_to(current.into())?;
    let medication = repo::update(&state.db, medication_id, patient_id, &input).await?;
    info!(%medication_id, %patient_id, "medication updated");
    Ok(Json(medication))
}

#[instrument(skip(state))]
pub async fn delete_medication(
    State(state): State<AppState>,
    user: AuthUser,
    Path((patient_id, medication_id)): Path<(String, String)>,
) -> Result<Json<MedicationRemoval>, CareError> {
    let (patient_id, medication_id) = parse_pair(
        (Entity::Patient, &patient_id),
        (Entity::Medication, &medication_id),
    )?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;
    Ok(Json(
        service::delete_medication(state.care.as_ref(), medication_id, patient_id).await?,
    ))
}
