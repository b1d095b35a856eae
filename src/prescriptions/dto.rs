use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::repo_types::Prescription;
use crate::care::{
    input::{optional_text, required_text, MAX_NAME_LEN, MAX_TEXT_LEN},
    CareError,
};

#[derive(Debug, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub medication_name: String,
    pub dosage: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub prescribed_by: Option<String>,
    #[serde(default, with = "crate::dates::option")]
    pub issued_on: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescriptionInput {
    pub medication_name: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub prescribed_by: Option<String>,
    pub issued_on: Option<Date>,
}

impl CreatePrescriptionRequest {
    pub fn validate(self) -> Result<PrescriptionInput, CareError> {
        if let Some(issued) = self.issued_on {
            if issued > OffsetDateTime::now_utc().date() {
                return Err(CareError::invalid("issued_on", "must not be in the future"));
            }
        }
        Ok(PrescriptionInput {
            medication_name: required_text("medication_name", &self.medication_name, MAX_NAME_LEN)?,
            dosage: required_text("dosage", &self.dosage, MAX_NAME_LEN)?,
            instructions: optional_text("instructions", self.instructions.as_deref(), MAX_TEXT_LEN)?,
            prescribed_by: optional_text("prescribed_by", self.prescribed_by.as_deref(), MAX_NAME_LEN)?,
            issued_on: self.issued_on,
        })
    }
}

/// Prescription as returned to clients; the storage key stays internal.
#[derive(Debug, Serialize)]
pub struct PrescriptionView {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub has_attachment: bool,
}

impl From<Prescription> for PrescriptionView {
    fn from(prescription: Prescription) -> Self {
        Self {
            has_attachment: prescription.attachment_key.is_some(),
            prescription,
        }
    }
}
