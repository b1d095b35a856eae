use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::care::CareError;

/// `PUT /patients/me`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePatientRequest {
    #[serde(default, with = "crate::dates::option")]
    pub date_of_birth: Option<Date>,
    #[serde(default)]
    pub conditions: Option<Vec<String>>,
}

impl UpdatePatientRequest {
    pub fn validate(mut self) -> Result<Self, CareError> {
        if let Some(dob) = self.date_of_birth {
            if dob > OffsetDateTime::now_utc().date() {
                return Err(CareError::invalid("date_of_birth", "must not be in the future"));
            }
        }
        if let Some(conditions) = self.conditions.take() {
            let mut cleaned: Vec<String> = Vec::with_capacity(conditions.len());
            for c in conditions.into_iter().map(|c| c.trim().to_string()) {
                if !c.is_empty() && !cleaned.contains(&c) {
                    cleaned.push(c);
                }
            }
            self.conditions = Some(cleaned);
        }
        Ok(self)
    }
}
