use serde::Deserialize;

use crate::care::CareError;

const MAX_FIELD_LEN: usize = 200;

/// `PUT /caregivers/me`. Absent fields are left unchanged, blank ones are cleared.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCaregiverRequest {
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

impl UpdateCaregiverRequest {
    pub fn validate(self) -> Result<Self, CareError> {
        Ok(Self {
            specialization: clean("specialization", self.specialization)?,
            organization: clean("organization", self.organization)?,
        })
    }
}

fn clean(field: &'static str, value: Option<String>) -> Result<Option<String>, CareError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.len() > MAX_FIELD_LEN => Err(CareError::invalid(
            field,
            format!("must be at most {MAX_FIELD_LEN} characters"),
        )),
        other => Ok(other),
    }
}
