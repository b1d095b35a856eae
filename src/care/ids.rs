use uuid::Uuid;

use super::error::{CareError, Entity};

/// Parse a raw identifier taken from a path or body before it reaches the store.
pub fn parse_id(entity: Entity, raw: &str) -> Result<Uuid, CareError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CareError::invalid(entity.id_field(), "must not be empty"));
    }
    Uuid::parse_str(trimmed)
        .map_err(|_| CareError::invalid(entity.id_field(), format!("'{trimmed}' is not a valid id")))
}

/// Parse a `(first, second)` pair of raw identifiers, failing on the first malformed one.
pub fn parse_pair(
    first: (Entity, &str),
    second: (Entity, &str),
) -> Result<(Uuid, Uuid), CareError> {
    Ok((parse_id(first.0, first.1)?, parse_id(second.0, second.1)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hyphenated_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(Entity::Patient, &id.to_string()).unwrap(), id);
    }

    #[test]
    fn rejects_mongo_style_and_garbage() {
        for raw in ["", "   ", "64b7f0c2a1b2c3d4e5f60718", "not-an-id", "123"] {
            let err = parse_id(Entity::Caregiver, raw).unwrap_err();
            match err {
                CareError::Validation { field, .. } => assert_eq!(field, "caregiver_id"),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn pair_reports_first_bad_field() {
        let ok = Uuid::new_v4().to_string();
        let err = parse_pair((Entity::Caregiver, &ok), (Entity::Patient, "nope")).unwrap_err();
        assert!(matches!(err, CareError::Validation { field: "patient_id", .. }));
    }
}
