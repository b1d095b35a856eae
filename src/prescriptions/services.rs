use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo;
use crate::{
    care::CareError,
    state::AppState,
    storage::{attachment_key, ext_from_mime},
};

pub const PRESIGN_TTL_SECS: u64 = 10 * 60;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Store the file, then swap the key on the row. The replaced object is removed
/// afterwards; if the row update fails the new object is removed instead.
pub async fn upload_attachment(
    st: &AppState,
    patient_id: Uuid,
    prescription_id: Uuid,
    file: UploadItem,
) -> Result<String, CareError> {
    let ext = ext_from_mime(&file.content_type).ok_or_else(|| {
        CareError::invalid(
            "file",
            format!("unsupported content type {}", file.content_type),
        )
    })?;
    if file.body.is_empty() {
        return Err(CareError::invalid("file", "is empty"));
    }

    // 404 before touching storage
    repo::find_for_patient(&st.db, prescription_id, patient_id).await?;

    let key = attachment_key(patient_id, prescription_id, ext);
    st.storage
        .put_object(&key, file.body, &file.content_type)
        .await
        .with_context(|| format!("put_object {key}"))
        .map_err(CareError::Persistence)?;

    let previous = match repo::replace_attachment(&st.db, prescription_id, patient_id, &key).await {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(cleanup) = st.storage.delete_object(&key).await {
                warn!(key = %key, error = %format!("{cleanup:#}"), "orphaned attachment left in storage");
            }
            return Err(e);
        }
    };

    if let Some(old) = previous {
        if let Err(e) = st.storage.delete_object(&old).await {
            warn!(key = %old, error = %format!("{e:#}"), "replaced attachment not removed");
        }
    }

    info!(%prescription_id, %patient_id, key = %key, "prescription attachment stored");
    Ok(key)
}

pub async fn presign_attachment(
    st: &AppState,
    patient_id: Uuid,
    prescription_id: Uuid,
) -> Result<String, CareError> {
    let prescription = repo::find_for_patient(&st.db, prescription_id, patient_id).await?;
    let key = prescription
        .attachment_key
        .ok_or_else(|| CareError::invalid("prescription_id", "prescription has no attachment"))?;
    st.storage
        .presign_get(&key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {key}"))
        .map_err(CareError::Persistence)
}
