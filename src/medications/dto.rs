use serde::Deserialize;
use time::Date;

use crate::care::{
    input::{optional_text, required_text, MAX_NAME_LEN, MAX_TEXT_LEN},
    CareError,
};

#[derive(Debug, Deserialize)]
pub struct CreateMedicationRequest {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default, with = "crate::dates::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "crate::dates::option")]
    pub end_date: Option<Date>,
}

/// Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMedicationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default, with = "crate::dates::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "crate::dates::option")]
    pub end_date: Option<Date>,
}

/// Checked medication fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationInput {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub instructions: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

fn check_window(start: Option<Date>, end: Option<Date>) -> Result<(), CareError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(CareError::invalid("end_date", "must not precede start_date")),
        _ => Ok(()),
    }
}

impl CreateMedicationRequest {
    pub fn validate(self) -> Result<MedicationInput, CareError> {
        check_window(self.start_date, self.end_date)?;
        Ok(MedicationInput {
            name: required_text("name", &self.name, MAX_NAME_LEN)?,
            dosage: required_text("dosage", &self.dosage, MAX_NAME_LEN)?,
            frequency: required_text("frequency", &self.frequency, MAX_NAME_LEN)?,
            instructions: optional_text("instructions", self.instructions.as_deref(), MAX_TEXT_LEN)?,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

impl UpdateMedicationRequest {
    /// Merge onto the stored values, then check the result as a whole.
    pub fn apply_to(self, current: MedicationInput) -> Result<MedicationInput, CareError> {
        let merged = MedicationInput {
            name: match self.name {
                Some(v) => required_text("name", &v, MAX_NAME_LEN)?,
                None => current.name,
            },
            dosage: match self.dosage {
                Some(v) => required_text("dosage", &v, MAX_NAME_LEN)?,
                None => current.dosage,
            },
            frequency: match self.frequency {
                Some(v) => required_text("frequency", &v, MAX_NAME_LEN)?,
                None => current.frequency,
            },
            instructions: match self.instructions {
                Some(v) => optional_text("instructions", Some(&v), MAX_TEXT_LEN)?,
                None => current.instructions,
            },
            start_date: self.start_date.or(current.start_date),
            end_date: self.end_date.or(current.end_date),
        };
        check_window(merged.start_date, merged.end_date)?;
        Ok(merged)
    }
}
