//! Field checks shared by the typed request bodies.

use super::error::CareError;

pub const MAX_TEXT_LEN: usize = 2000;
pub const MAX_NAME_LEN: usize = 200;

/// Trimmed, non-empty and at most `max` characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, CareError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CareError::invalid(field, "is required"));
    }
    if value.chars().count() > max {
        return Err(CareError::invalid(field, format!("must be at most {max} characters")));
    }
    Ok(value.to_string())
}

/// Like [`required_text`], but blank input becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, CareError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max).map(Some),
    }
}
