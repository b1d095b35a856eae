use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

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
    dto::{CreatePrescriptionRequest, PrescriptionView},
    repo,
    services::{self, UploadItem},
};

const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/patients/:patient_id/prescriptions",
            get(list_prescriptions).post(create_prescription),
        )
        .route(
            "/patients/:patient_id/prescriptions/:prescription_id/attachment",
            get(get_attachment),
        )
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/patients/:patient_id/prescriptions/:prescription_id/attachment",
            put(upload_attachment),
        )
        .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES))
}

#[derive(Debug, Serialize)]
pub struct AttachmentStored {
    pub prescription_id: Uuid,
    pub has_attachment: bool,
}

#[instrument(skip(state))]
pub async fn list_prescriptions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<PrescriptionView>>, CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;

    let rows = repo::list_for_patient(&state.db, patient_id).await?;
    Ok(Json(rows.into_iter().map(PrescriptionView::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn create_prescription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patient_id): Path<String>,
    Json(body): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<PrescriptionView>), CareError> {
    let patient_id = parse_id(Entity::Patient, &patient_id)?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;
    let input = body.validate()?;

    let prescription = repo::create(&state.db, patient_id, user.id, &input).await?;
    info!(prescription_id = %prescription.id, %patient_id, author_id = %user.id, "prescription recorded");
    Ok((StatusCode::CREATED, Json(prescription.into())))
}

/// PUT (multipart) with a single `file` field: PDF or image.
#[instrument(skip(state, mp))]
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((patient_id, prescription_id)): Path<(String, String)>,
    mut mp: Multipart,
) -> Result<Json<AttachmentStored>, CareError> {
    let (patient_id, prescription_id) = parse_pair(
        (Entity::Patient, &patient_id),
        (Entity::Prescription, &prescription_id),
    )?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;

    let mut file = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| CareError::invalid("file", e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| CareError::invalid("file", e.body_text()))?;
        file = Some(UploadItem { body, content_type });
        break;
    }
    let file = file.ok_or_else(|| CareError::invalid("file", "is required"))?;

    services::upload_attachment(&state, patient_id, prescription_id, file).await?;
    Ok(Json(AttachmentStored {
        prescription_id,
        has_attachment: true,
    }))
}

/// Redirect to a short-lived presigned URL for the attachment.
#[instrument(skip(state))]
pub async fn get_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((patient_id, prescription_id)): Path<(String, String)>,
) -> Result<Redirect, CareError> {
    let (patient_id, prescription_id) = parse_pair(
        (Entity::Patient, &patient_id),
        (Entity::Prescription, &prescription_id),
    )?;
    access::patient_for(state.care.as_ref(), &user, patient_id).await?;

    let url = services::presign_attachment(&state, patient_id, prescription_id).await?;
    Ok(Redirect::temporary(&url))
}
