use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    care::{access, ids::parse_id, model::PatientDetails, service, CareError, Entity},
    state::AppState,
};

use super::{dto::UpdatePatientRequest, repo};

pub fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/patients/me", get(get_own_profile).put(update_own_profile))
        .route(
            "/patients/me/caregivers/:caregiver_id",
            post(grant_caregiver).delete(revoke_caregiver),
        )
        .route("/patients/:patient_id", get(get_patient))
}

#[instrument(skip(state))]
pub async fn get_own_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PatientDetails>, CareError> {
    let patient = access::own_patient(state.care.as_ref(), &user).await?;
    Ok(Json(service::patient_details(state.care.as_ref(), patient.id).await?))
}

#[instrument(skip(state, body))]
pub async fn update_own_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdatePatientRequest>,
) -> Result<Json<PatientDetails>, CareError> {
    let patient = access::own_patient(state.care.as_ref(), &user).await?;
    let body = body.validate()?;

    repo::update_profile(
        &state.db,
        patient.id,
        body.date_of_birth,
        body.conditions.as_deref(),
    )
    .await?;
    info!(patient_id = %patient.id, "patient profile updated");

    Ok(Json(service::patient_details(state.care.as_ref(), patient.id).await?))
}

#[instrument(skip(state))]
pub async fn get_patient(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientDetails>, CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;
    Ok(Json(service::patient_details(state.care.as_ref(), patient_id).await?))
}

/// The patient links a caregiver to its own profile.
#[instrument(skip(state))]
pub async fn grant_caregiver(
    State(state): State<AppState>,
    user: AuthUser,
    Path(caregiver_id): Path<String>,
) -> Result<Json<PatientDetails>, CareError> {
    let caregiver_id = parse_id(Entity::Caregiver, &caregiver_id)?;
    let patient = access::own_patient(state.care.as_ref(), &user).await?;
    service::assign(state.care.as_ref(), caregiver_id, patient.id).await?;
    Ok(Json(service::patient_details(state.care.as_ref(), patient.id).await?))
}

#[instrument(skip(state))]
pub async fn revoke_caregiver(
    State(state): State<AppState>,
    user: AuthUser,
    Path(caregiver_id): Path<String>,
) -> Result<Json<PatientDetails>, CareError> {
    let caregiver_id = parse_id(Entity::Caregiver, &caregiver_id)?;
    let patient = access::own_patient(state.care.as_ref(), &user).await?;
    service::unassign(state.care.as_ref(), caregiver_id, patient.id).await?;
    Ok(Json(service::patient_details(state.care.as_ref(), patient.id).await?))
}
