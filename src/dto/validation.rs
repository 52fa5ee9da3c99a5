//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::services::normalizer::normalize;

/// Longest game name accepted from a client.
pub const MAX_GAME_NAME_LEN: usize = 200;

/// Validates that a game name is not blank, not oversized, and keeps at least
/// one letter or digit once normalized.
///
/// # Examples
///
/// ```ignore
/// validate_game_name("Counter-Strike") // Ok
/// validate_game_name("   ")            // Err - blank
/// validate_game_name("???")            // Err - no usable characters
/// ```
pub fn validate_game_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("game_name_blank");
        err.message = Some("Game name must not be empty".into());
        return Err(err);
    }

    if name.chars().count() > MAX_GAME_NAME_LEN {
        let mut err = ValidationError::new("game_name_length");
        err.message = Some(
            format!("Game name must be at most {MAX_GAME_NAME_LEN} characters").into(),
        );
        return Err(err);
    }

    if normalize(name).is_empty() {
        let mut err = ValidationError::new("game_name_format");
        err.message = Some("Game name must contain at least one letter or digit".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a value is not only whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_game_name_valid() {
        assert!(validate_game_name("Counter-Strike").is_ok());
        assert!(validate_game_name("2048").is_ok());
        assert!(validate_game_name(" Pokémon ").is_ok());
    }

    #[test]
    fn test_validate_game_name_blank() {
        assert!(validate_game_name("").is_err());
        assert!(validate_game_name("  \t").is_err());
    }

    #[test]
    fn test_validate_game_name_unusable() {
        assert!(validate_game_name("???").is_err());
        assert!(validate_game_name(&"a".repeat(MAX_GAME_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("42").is_ok());
        assert!(validate_not_blank(" ").is_err());
    }
}
