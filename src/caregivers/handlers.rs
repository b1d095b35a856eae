use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    care::{
        access,
        ids::parse_id,
        model::{CaregiverDetails, PatientRemoval},
        service, CareError, Entity,
    },
    state::AppState,
};

use super::{dto::UpdateCaregiverRequest, repo};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/caregivers/me", get(get_own_profile).put(update_own_profile))
}

pub fn assignment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/caregivers/me/patients/:patient_id",
            delete(unassign_patient),
        )
        .route(
            "/caregivers/me/patients/:patient_id/record",
            delete(delete_patient_record),
        )
}

#[instrument(skip(state))]
pub async fn get_own_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CaregiverDetails>, CareError> {
    let caregiver = access::own_caregiver(state.care.as_ref(), &user).await?;
    Ok(Json(service::caregiver_details(state.care.as_ref(), caregiver.id).await?))
}

#[instrument(skip(state, body))]
pub async fn update_own_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateCaregiverRequest>,
) -> Result<Json<CaregiverDetails>, CareError> {
    let caregiver = access::own_caregiver(state.care.as_ref(), &user).await?;
    let body = body.validate()?;

    repo::update_profile(
        &state.db,
        caregiver.id,
        body.specialization.as_deref(),
        body.organization.as_deref(),
    )
    .await?;
    info!(caregiver_id = %caregiver.id, "caregiver profile updated");

    Ok(Json(service::caregiver_details(state.care.as_ref(), caregiver.id).await?))
}

#[instrument(skip(state))]
pub async fn unassign_patient(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
) -> Result<Json<CaregiverDetails>, CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    let caregiver = access::own_caregiver(state.care.as_ref(), &user).await?;
    Ok(Json(service::unassign(state.care.as_ref(), caregiver.id, patient_id).await?))
}

/// Delete a linked patient together with its account and records.
#[instrument(skip(state))]
pub async fn delete_patient_record(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientRemoval>, CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    let caregiver = access::own_caregiver(state.care.as_ref(), &user).await?;

    if !caregiver.patient_ids.contains(&patient_id) {
        warn!(caregiver_id = %caregiver.id, %patient_id, "delete of unlinked patient refused");
        return Err(CareError::forbidden("patient is not linked to this caregiver"));
    }

    let removal =
        service::delete_patient(state.care.as_ref(), state.storage.as_ref(), patient_id).await?;
    Ok(Json(removal))
}
