//! Validation utilities.

use crate::{FieldError, RbacError};
use validator::{Validate, ValidationErrors};

/// Extension trait for validation.
pub trait ValidateExt: Validate {
    /// Validates the struct and returns an `RbacError` on failure.
    fn validate_input(&self) -> Result<(), RbacError> {
        self.validate().map_err(validation_errors_to_rbac_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Flattens `validator::ValidationErrors` into field errors.
#[must_use]
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: (*field).to_string(),
                message: error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), |m| m.to_string()),
                code: error.code.to_string(),
            })
        })
        .collect()
}

/// Converts `validator::ValidationErrors` to `RbacError`.
#[must_use]
pub fn validation_errors_to_rbac_error(errors: ValidationErrors) -> RbacError {
    let message = field_errors(&errors)
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");

    RbacError::Validation(message)
}

/// Naming rules imposed by the cloud provider's resource model.
pub mod rules {
    use validator::ValidationError;

    /// Maximum length of a cache user id.
    pub const MAX_CACHE_USER_ID_LEN: usize = 40;
    /// Maximum length of an IAM role name.
    pub const MAX_ROLE_NAME_LEN: usize = 64;
    /// Maximum length of a key alias (without the `alias/` prefix).
    pub const MAX_KEY_ALIAS_LEN: usize = 250;

    /// Validates that a string is not blank (not empty after trimming).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("not_blank"));
        }
        Ok(())
    }

    /// Validates a cache user id or user group id.
    ///
    /// Must start with a letter, contain only lowercase letters, digits and
    /// hyphens, and must not end with a hyphen or contain two consecutive
    /// hyphens.
    pub fn valid_cache_user_id(id: &str) -> Result<(), ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::new("cache_user_id_empty"));
        }
        if id.len() > MAX_CACHE_USER_ID_LEN {
            return Err(ValidationError::new("cache_user_id_too_long"));
        }
        if !id.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
            return Err(ValidationError::new("cache_user_id_must_start_with_letter"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::new("cache_user_id_invalid_characters"));
        }
        if id.ends_with('-') || id.contains("--") {
            return Err(ValidationError::new("cache_user_id_invalid_hyphens"));
        }
        Ok(())
    }

    /// Validates a cache user name (the name presented during AUTH).
    pub fn valid_cache_user_name(name: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::new("cache_user_name_empty"));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::new("cache_user_name_invalid_characters"));
        }
        Ok(())
    }

    /// Validates an IAM role name.
    pub fn valid_role_name(name: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::new("role_name_empty"));
        }
        if name.len() > MAX_ROLE_NAME_LEN {
            return Err(ValidationError::new("role_name_too_long"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c))
        {
            return Err(ValidationError::new("role_name_invalid_characters"));
        }
        Ok(())
    }

    /// Validates a key alias (the part after `alias/`).
    pub fn valid_key_alias(alias: &str) -> Result<(), ValidationError> {
        if alias.is_empty() {
            return Err(ValidationError::new("key_alias_empty"));
        }
        if alias.len() > MAX_KEY_ALIAS_LEN {
            return Err(ValidationError::new("key_alias_too_long"));
        }
        if alias.starts_with("aws/") {
            return Err(ValidationError::new("key_alias_reserved_prefix"));
        }
        if !alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/_-".contains(c))
        {
            return Err(ValidationError::new("key_alias_invalid_characters"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::rules::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("hello").is_ok());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("").is_err());
    }

    #[test]
    fn test_valid_cache_user_id() {
        assert!(valid_cache_user_id("producer").is_ok());
        assert!(valid_cache_user_id("groupdefaultuser").is_ok());
        assert!(valid_cache_user_id("mock-app-user-group").is_ok());
        assert!(valid_cache_user_id("").is_err());
        assert!(valid_cache_user_id("Producer").is_err()); // uppercase
        assert!(valid_cache_user_id("1producer").is_err()); // starts with digit
        assert!(valid_cache_user_id("pro--ducer").is_err());
        assert!(valid_cache_user_id("producer-").is_err());
        assert!(valid_cache_user_id(&"a".repeat(41)).is_err());
    }

    #[test]
    fn test_valid_cache_user_name() {
        assert!(valid_cache_user_name("default").is_ok());
        assert!(valid_cache_user_name("").is_err());
        assert!(valid_cache_user_name("two words").is_err());
    }

    #[test]
    fn test_valid_role_name() {
        assert!(valid_role_name("producerRole").is_ok());
        assert!(valid_role_name("svc+role=a,b.c@d_e-f").is_ok());
        assert!(valid_role_name("bad/role").is_err());
        assert!(valid_role_name(&"r".repeat(65)).is_err());
    }

    #[test]
    fn test_valid_key_alias() {
        assert!(valid_key_alias("redisRbacUser/producer").is_ok());
        assert!(valid_key_alias("aws/secretsmanager").is_err());
        assert!(valid_key_alias("bad alias").is_err());
        assert!(valid_key_alias("").is_err());
    }
}
