//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Validates a lobby/user identifier: non-empty, at most 64 characters,
/// limited to alphanumerics plus `-` and `_`.
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_IDENTIFIER_LEN {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(
            format!(
                "identifier must be between 1 and {MAX_IDENTIFIER_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("identifier_format");
        err.message =
            Some("identifier may only contain alphanumerics, dashes, and underscores".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a display name: non-blank and at most 64 characters.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("display name must not be blank".into());
        return Err(err);
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        let mut err = ValidationError::new("name_length");
        err.message = Some(format!("display name must be at most {MAX_IDENTIFIER_LEN} characters").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_identifiers() {
        assert!(validate_identifier("main-lobby").is_ok());
        assert!(validate_identifier("user_42").is_ok());
        assert!(validate_identifier("A1").is_ok());
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("has space").is_err());
        assert!(validate_identifier("emoji🎲").is_err());
        assert!(validate_identifier(&"x".repeat(65)).is_err());
    }

    #[test]
    fn rejects_blank_names() {
        assert!(validate_display_name("  ").is_err());
        assert!(validate_display_name("Ada").is_ok());
    }
}
