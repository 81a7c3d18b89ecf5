//! Configuration validation module.
//!
//! Collects every problem in a configuration before failing, so a broken
//! file is fixed in one pass rather than one error at a time.
//!
//! Duplicate cache user ids are deliberately not checked here: id
//! uniqueness is enforced by the cache service when the template is applied.

use crate::{AppConfig, SHARED_KEY_ID};
use rbac_core::field_errors;
use std::collections::HashSet;
use thiserror::Error;
use validator::Validate;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    /// A field of a list entry or section failed a naming rule.
    #[error("Invalid {section} entry '{entry}': field '{field}' failed {code}")]
    InvalidField {
        section: &'static str,
        entry: String,
        field: String,
        code: String,
    },
    /// No cache users configured.
    #[error("At least one cache user is required")]
    NoUsers,
    /// Two entries would produce the same construct path.
    #[error("Duplicate construct id '{0}'")]
    DuplicateConstructId(String),
    /// A role name is declared twice.
    #[error("Duplicate role name '{0}'")]
    DuplicateRole(String),
    /// An entry references a role that is not declared.
    #[error("{referenced_by} references unknown role '{role}'")]
    UnknownRole { referenced_by: String, role: String },
    /// An entry references a cache user that is not declared.
    #[error("{referenced_by} references unknown cache user '{user}'")]
    UnknownUser { referenced_by: String, user: String },
    /// The cluster has nowhere to go.
    #[error("network.subnet_ids must list at least one subnet")]
    MissingSubnets,
    /// Port number is invalid.
    #[error("Invalid port for {name}: {value} (must be 1-65535)")]
    InvalidPort { name: String, value: u16 },
    /// A cluster sizing value is out of range.
    #[error("Invalid cluster setting {name} = {value}: {reason}")]
    InvalidClusterSetting {
        name: &'static str,
        value: u32,
        reason: &'static str,
    },
    /// User groups only authenticate over TLS.
    #[error("cache.transit_encryption must be enabled when a user group is attached")]
    TransitEncryptionRequired,
    /// Shared key alias is invalid.
    #[error("Invalid shared key alias '{0}'")]
    InvalidKeyAlias(String),
    /// Log level is invalid.
    #[error("Invalid log level: '{value}' (valid: trace, debug, info, warn, error)")]
    InvalidLogLevel { value: String },
}

/// Result of configuration validation containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Creates a new validation result.
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Adds an error to the result.
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Records every field error of a validated entry.
    fn add_entry_errors<T: Validate>(&mut self, section: &'static str, entry: &str, value: &T) {
        if let Err(errors) = value.validate() {
            for field_error in field_errors(&errors) {
                self.add_error(ConfigValidationError::InvalidField {
                    section,
                    entry: entry.to_string(),
                    field: field_error.field,
                    code: field_error.code,
                });
            }
        }
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum shards per replication group.
    const MAX_NODE_GROUPS: u32 = 500;
    /// Maximum replicas per shard.
    const MAX_REPLICAS: u32 = 5;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_users(config, &mut result);
        Self::validate_roles(config, &mut result);
        Self::validate_references(config, &mut result);
        Self::validate_construct_ids(config, &mut result);
        Self::validate_network(&config.network, &mut result);
        Self::validate_cache(&config.cache, &mut result);
        Self::validate_secrets(&config.secrets, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result.into_result()
    }

    /// Validates user entries and the user group.
    fn validate_users(config: &AppConfig, result: &mut ValidationResult) {
        if config.users.is_empty() {
            result.add_error(ConfigValidationError::NoUsers);
        }

        for user in &config.users {
            result.add_entry_errors("users", &user.construct_id, user);
        }

        result.add_entry_errors("user_group", &config.user_group.construct_id, &config.user_group);
    }

    /// Validates role entries.
    fn validate_roles(config: &AppConfig, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for role in &config.roles {
            result.add_entry_errors("roles", &role.name, role);
            if !seen.insert(role.name.as_str()) {
                result.add_error(ConfigValidationError::DuplicateRole(role.name.clone()));
            }
        }
    }

    /// Validates that readers, grants and consumers point at declared entries.
    fn validate_references(config: &AppConfig, result: &mut ValidationResult) {
        for user in &config.users {
            for reader in &user.readers {
                if config.role(reader).is_none() {
                    result.add_error(ConfigValidationError::UnknownRole {
                        referenced_by: format!("user '{}'", user.user_id),
                        role: reader.clone(),
                    });
                }
            }
        }

        for grant in &config.grants {
            let referenced_by = format!("grant {} -> {}", grant.user, grant.role);
            if config.user(&grant.user).is_none() {
                result.add_error(ConfigValidationError::UnknownUser {
                    referenced_by: referenced_by.clone(),
                    user: grant.user.clone(),
                });
            }
            if config.role(&grant.role).is_none() {
                result.add_error(ConfigValidationError::UnknownRole {
                    referenced_by,
                    role: grant.role.clone(),
                });
            }
        }

        for consumer in &config.consumers {
            result.add_entry_errors("consumers", &consumer.name, consumer);
            let referenced_by = format!("consumer '{}'", consumer.name);
            if config.user(&consumer.user).is_none() {
                result.add_error(ConfigValidationError::UnknownUser {
                    referenced_by: referenced_by.clone(),
                    user: consumer.user.clone(),
                });
            }
            if config.role(&consumer.role).is_none() {
                result.add_error(ConfigValidationError::UnknownRole {
                    referenced_by,
                    role: consumer.role.clone(),
                });
            }
        }
    }

    /// Validates that top-level construct ids do not collide.
    fn validate_construct_ids(config: &AppConfig, result: &mut ValidationResult) {
        let ids = config
            .users
            .iter()
            .map(|u| u.construct_id.as_str())
            .chain(config.roles.iter().map(|r| r.name.as_str()))
            .chain(config.consumers.iter().map(|c| c.name.as_str()))
            .chain([
                config.user_group.construct_id.as_str(),
                config.network.subnet_group_construct_id.as_str(),
                config.cache.construct_id.as_str(),
            ])
            .chain(config.secrets.shared_key_alias.as_ref().map(|_| SHARED_KEY_ID));

        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for id in ids {
            if !seen.insert(id) && reported.insert(id) {
                result.add_error(ConfigValidationError::DuplicateConstructId(id.to_string()));
            }
        }
    }

    /// Validates network placement.
    fn validate_network(config: &crate::NetworkConfig, result: &mut ValidationResult) {
        if config.subnet_ids.is_empty() {
            result.add_error(ConfigValidationError::MissingSubnets);
        }
    }

    /// Validates replication group settings.
    fn validate_cache(config: &crate::CacheClusterConfig, result: &mut ValidationResult) {
        if config.port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "cache.port".to_string(),
                value: config.port,
            });
        }

        if config.num_node_groups == 0 || config.num_node_groups > Self::MAX_NODE_GROUPS {
            result.add_error(ConfigValidationError::InvalidClusterSetting {
                name: "num_node_groups",
                value: config.num_node_groups,
                reason: "must be between 1 and 500",
            });
        }

        if config.replicas_per_node_group > Self::MAX_REPLICAS {
            result.add_error(ConfigValidationError::InvalidClusterSetting {
                name: "replicas_per_node_group",
                value: config.replicas_per_node_group,
                reason: "must be at most 5",
            });
        }

        if config.multi_az && config.replicas_per_node_group == 0 {
            result.add_error(ConfigValidationError::InvalidClusterSetting {
                name: "replicas_per_node_group",
                value: 0,
                reason: "multi-AZ needs at least one replica",
            });
        }

        if !config.transit_encryption {
            result.add_error(ConfigValidationError::TransitEncryptionRequired);
        }
    }

    /// Validates credential settings.
    fn validate_secrets(config: &crate::SecretsConfig, result: &mut ValidationResult) {
        if let Some(alias) = &config.shared_key_alias {
            if rbac_core::rules::valid_key_alias(alias).is_err() {
                result.add_error(ConfigValidationError::InvalidKeyAlias(alias.clone()));
            }
        }
    }

    /// Validates observability configuration.
    fn validate_observability(
        config: &rbac_core::telemetry::TelemetryConfig,
        result: &mut ValidationResult,
    ) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }
    }
}
