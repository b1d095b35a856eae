use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::PublicUser,
        jwt::AuthUser,
        repo_types::{Role, User},
    },
    care::{
        access::require_role,
        audit::{LinkIssue, RepairReport},
        ids::{parse_id, parse_pair},
        model::{CaregiverDetails, CaregiverRemoval, PatientRemoval},
        service, CareError, Entity,
    },
    reminders::adherence,
    state::AppState,
};

use super::{
    dto::{AdherenceReport, DashboardStats, UserListQuery, UserStatusRequest},
    repo,
};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/adherence", get(adherence_report))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:user_id/status", patch(set_user_status))
}

pub fn relationship_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/caregivers/:caregiver_id/patients/:patient_id",
            post(assign).delete(unassign),
        )
        .route("/admin/caregivers/:caregiver_id", delete(delete_caregiver))
        .route("/admin/patients/:patient_id", delete(delete_patient))
        .route("/admin/links/audit", get(audit_links))
        .route("/admin/links/repair", post(repair_links))
}

#[instrument(skip(state))]
pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardStats>, CareError> {
    require_role(&user, Role::Admin)?;
    let counts = repo::counts(&state.db).await?;
    let report = adherence::report(&state.db).await?;
    Ok(Json(DashboardStats {
        counts,
        average_adherence: adherence::mean(report.iter().map(|p| p.adherence)),
    }))
}

#[instrument(skip(state))]
pub async fn adherence_report(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AdherenceReport>, CareError> {
    require_role(&user, Role::Admin)?;
    let patients = adherence::report(&state.db).await?;
    Ok(Json(AdherenceReport {
        average_adherence: adherence::mean(patients.iter().map(|p| p.adherence)),
        patients,
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<UserListQuery>,
) -> Result<Json<Vec<PublicUser>>, CareError> {
    require_role(&user, Role::Admin)?;
    let (limit, offset) = q.page();
    let users = User::list(&state.db, q.role, limit, offset)
        .await
        .map_err(CareError::Persistence)?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn set_user_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
    Json(body): Json<UserStatusRequest>,
) -> Result<Json<PublicUser>, CareError> {
    require_role(&user, Role::Admin)?;
    let user_id = parse_id(Entity::User, &user_id)?;
    if user_id == user.id && !body.active {
        warn!(%user_id, "admin tried to deactivate own account");
        return Err(CareError::invalid("active", "cannot deactivate your own account"));
    }

    let updated = User::set_active(&state.db, user_id, body.active)
        .await
        .map_err(CareError::Persistence)?
        .ok_or(CareError::not_found(Entity::User, user_id))?;
    info!(%user_id, active = body.active, by = %user.id, "user status changed");
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn assign(
    State(state): State<AppState>,
    user: AuthUser,
    Path((caregiver_id, patient_id)): Path<(String, String)>,
) -> Result<Json<CaregiverDetails>, CareError> {
    require_role(&user, Role::Admin)?;
    let (caregiver_id, patient_id) = parse_pair(
        (Entity::Caregiver, &caregiver_id),
        (Entity::Patient, &patient_id),
    )?;
    Ok(Json(service::assign(state.care.as_ref(), caregiver_id, patient_id).await?))
}

#[instrument(skip(state))]
pub async fn unassign(
    State(state): State<AppState>,
    user: AuthUser,
    Path((caregiver_id, patient_id)): Path<(String, String)>,
) -> Result<Json<CaregiverDetails>, CareError> {
    require_role(&user, Role::Admin)?;
    let (caregiver_id, patient_id) = parse_pair(
        (Entity::Caregiver, &caregiver_id),
        (Entity::Patient, &patient_id),
    )?;
    Ok(Json(service::unassign(state.care.as_ref(), caregiver_id, patient_id).await?))
}

#[instrument(skip(state))]
pub async fn delete_caregiver(
    State(state): State<AppState>,
    user: AuthUser,
    Path(caregiver_id): Path<String>,
) -> Result<Json<CaregiverRemoval>, CareError> {
    require_role(&user, Role::Admin)?;
    let caregiver_id = parse_id(Entity::Caregiver, &caregiver_id)?;
    Ok(Json(service::delete_caregiver(state.care.as_ref(), caregiver_id).await?))
}

#[instrument(skip(state))]
pub async fn delete_patient(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientRemoval>, CareError> {
    require_role(&user, Role::Admin)?;
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    Ok(Json(
        service::delete_patient(state.care.as_ref(), state.storage.as_ref(), patient_id).await?,
    ))
}

#[instrument(skip(state))]
pub async fn audit_links(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<LinkIssue>>, CareError> {
    require_role(&user, Role::Admin)?;
    Ok(Json(service::audit_links(state.care.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn repair_links(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<RepairReport>, CareError> {
    require_role(&user, Role::Admin)?;
    Ok(Json(service::repair_links(state.care.as_ref()).await?))
}
