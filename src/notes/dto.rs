use serde::Deserialize;

use crate::care::{
    input::{required_text, MAX_TEXT_LEN},
    CareError,
};

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub body: String,
}

impl CreateNoteRequest {
    pub fn validate(self) -> Result<String, CareError> {
        required_text("body", &self.body, MAX_TEXT_LEN)
    }
}
