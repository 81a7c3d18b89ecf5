//! Application configuration structures.
//!
//! Every section has defaults, and together the defaults describe the demo
//! stack: a producer, a consumer and a group default user, one role per
//! function plus an outsider role that is never granted anything.

use crate::{CacheEngine, CredentialProfile};
use rbac_core::telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Stack identity.
    #[serde(default)]
    pub stack: StackConfig,

    /// Credential generation and encryption settings.
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Cache users, one credential each.
    #[serde(default = "default_users")]
    pub users: Vec<UserConfig>,

    /// The user group every configured user joins.
    #[serde(default)]
    pub user_group: UserGroupConfig,

    /// Roles that act as principals for credential grants.
    #[serde(default = "default_roles")]
    pub roles: Vec<RoleConfig>,

    /// Read grants applied after the user group is declared.
    #[serde(default = "default_grants")]
    pub grants: Vec<GrantConfig>,

    /// Existing network identifiers the cluster is placed into.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Replication group settings.
    #[serde(default)]
    pub cache: CacheClusterConfig,

    /// External principals that read a credential and connect to the cluster.
    #[serde(default = "default_consumers")]
    pub consumers: Vec<ConsumerConfig>,

    /// Where the synthesized template goes.
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: TelemetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppMetadata::default(),
            stack: StackConfig::default(),
            secrets: SecretsConfig::default(),
            users: default_users(),
            user_group: UserGroupConfig::default(),
            roles: default_roles(),
            grants: default_grants(),
            network: NetworkConfig::default(),
            cache: CacheClusterConfig::default(),
            consumers: default_consumers(),
            output: OutputConfig::default(),
            observability: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Finds a user entry by cache user id.
    #[must_use]
    pub fn user(&self, user_id: &str) -> Option<&UserConfig> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    /// Finds a role entry by name.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&RoleConfig> {
        self.roles.iter().find(|r| r.name == name)
    }
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "redis-rbac".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Stack identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Stack name.
    pub name: String,
    /// Template description.
    pub description: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            name: "RedisRbacStack".to_string(),
            description: "ElastiCache Redis RBAC demo: cache users backed by Secrets Manager credentials".to_string(),
        }
    }
}

/// Construct id of the key shared by every user when a shared alias is configured.
pub const SHARED_KEY_ID: &str = "sharedRbacKey";

/// Credential generation and encryption settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Characters excluded from generated passwords.
    #[serde(default)]
    pub credential_profile: CredentialProfile,
    /// Alias of one key shared by every credential. When unset each user
    /// gets its own key.
    #[serde(default)]
    pub shared_key_alias: Option<String>,
    /// Enable automatic rotation on keys created by the stack.
    #[serde(default = "default_true")]
    pub key_rotation: bool,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            credential_profile: CredentialProfile::default(),
            shared_key_alias: None,
            key_rotation: true,
        }
    }
}

/// One cache user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserConfig {
    /// Construct id; the user's resources are named under it.
    #[validate(custom(function = "rbac_core::rules::not_blank"))]
    pub construct_id: String,
    /// Name presented during AUTH.
    #[validate(custom(function = "rbac_core::rules::valid_cache_user_name"))]
    pub user_name: String,
    /// Engine-wide user id.
    #[validate(custom(function = "rbac_core::rules::valid_cache_user_id"))]
    pub user_id: String,
    /// Access string; the restrictive default applies when unset.
    #[serde(default)]
    pub access_string: Option<String>,
    /// Roles granted read access to the credential at construction.
    #[serde(default)]
    pub readers: Vec<String>,
}

impl UserConfig {
    /// Creates a user entry with no explicit access string and no readers.
    #[must_use]
    pub fn new(construct_id: impl Into<String>, user_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            construct_id: construct_id.into(),
            user_name: user_name.into(),
            user_id: user_id.into(),
            access_string: None,
            readers: Vec::new(),
        }
    }

    /// Sets the access string.
    #[must_use]
    pub fn with_access_string(mut self, access_string: impl Into<String>) -> Self {
        self.access_string = Some(access_string.into());
        self
    }
}

/// The user group.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UserGroupConfig {
    /// Construct id.
    #[validate(custom(function = "rbac_core::rules::not_blank"))]
    pub construct_id: String,
    /// Engine-wide user group id.
    #[validate(custom(function = "rbac_core::rules::valid_cache_user_id"))]
    pub group_id: String,
}

impl Default for UserGroupConfig {
    fn default() -> Self {
        Self {
            construct_id: "mockAppUserGroup".to_string(),
            group_id: "mock-app-user-group".to_string(),
        }
    }
}

/// A role principal.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleConfig {
    /// Role name, also used as construct id.
    #[validate(custom(function = "rbac_core::rules::valid_role_name"))]
    pub name: String,
    /// Service principal allowed to assume the role.
    #[validate(custom(function = "rbac_core::rules::not_blank"))]
    pub assumed_by: String,
    /// Role description.
    #[serde(default)]
    pub description: String,
    /// AWS managed policies attached to the role (e.g. `service-role/AWSLambdaBasicExecutionRole`).
    #[serde(default)]
    pub managed_policies: Vec<String>,
}

impl RoleConfig {
    /// Creates a role assumed by the function service with the default
    /// execution policies.
    #[must_use]
    pub fn function_role(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assumed_by: "lambda.amazonaws.com".to_string(),
            description: description.into(),
            managed_policies: vec![
                "service-role/AWSLambdaBasicExecutionRole".to_string(),
                "service-role/AWSLambdaVPCAccessExecutionRole".to_string(),
            ],
        }
    }
}

/// A read grant applied after the user group exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantConfig {
    /// Cache user id whose credential is shared.
    pub user: String,
    /// Role receiving read access.
    pub role: String,
}

impl GrantConfig {
    /// Creates a grant entry.
    #[must_use]
    pub fn new(user: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            role: role.into(),
        }
    }
}

/// Existing network placement for the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Construct id of the subnet group.
    pub subnet_group_construct_id: String,
    /// Subnet group name.
    pub subnet_group_name: String,
    /// Subnet group description.
    pub subnet_group_description: String,
    /// Isolated subnet ids the cluster nodes are placed into.
    pub subnet_ids: Vec<String>,
    /// Security groups attached to the cluster.
    pub security_group_ids: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            subnet_group_construct_id: "ElastiCacheSubnetGroup".to_string(),
            subnet_group_name: "RedisSubnetGroup".to_string(),
            subnet_group_description: "Elasticache Subnet Group".to_string(),
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
        }
    }
}

/// Replication group settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheClusterConfig {
    /// Construct id.
    pub construct_id: String,
    /// Replication group id.
    pub replication_group_id: String,
    /// Replication group description.
    pub description: String,
    /// Cache engine.
    pub engine: CacheEngine,
    /// Engine version.
    pub engine_version: String,
    /// Node instance type.
    pub node_type: String,
    /// Number of shards.
    pub num_node_groups: u32,
    /// Replicas per shard.
    pub replicas_per_node_group: u32,
    /// Encrypt data at rest.
    pub at_rest_encryption: bool,
    /// Encrypt data in transit. Required for user group authentication.
    pub transit_encryption: bool,
    /// Spread replicas across availability zones.
    pub multi_az: bool,
    /// Listener port.
    pub port: u16,
}

impl Default for CacheClusterConfig {
    fn default() -> Self {
        Self {
            construct_id: "RedisReplicationGroup".to_string(),
            replication_group_id: "RedisReplicationGroup".to_string(),
            description: "RedisReplicationGroup-RBAC-Demo".to_string(),
            engine: CacheEngine::Redis,
            engine_version: "6.x".to_string(),
            node_type: "cache.m6g.large".to_string(),
            num_node_groups: 1,
            replicas_per_node_group: 1,
            at_rest_encryption: true,
            transit_encryption: true,
            multi_az: true,
            port: CacheEngine::Redis.default_port(),
        }
    }
}

/// An external consumer of one credential.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConsumerConfig {
    /// Consumer name, also used as construct id.
    #[validate(custom(function = "rbac_core::rules::not_blank"))]
    pub name: String,
    /// Role the consumer runs as.
    pub role: String,
    /// Cache user id whose credential the consumer reads.
    pub user: String,
}

impl ConsumerConfig {
    /// Creates a consumer entry.
    #[must_use]
    pub fn new(name: impl Into<String>, role: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            user: user.into(),
        }
    }
}

/// Template output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File the template is written to; stdout when unset.
    pub path: Option<String>,
    /// Pretty-print the template JSON.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            pretty: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_users() -> Vec<UserConfig> {
    vec![
        UserConfig::new("producerRBAC", "producer", "producer").with_access_string("on ~* -@all +SET"),
        UserConfig::new("groupDefaultUserRBAC", "default", "groupdefaultuser"),
        UserConfig::new("consumerRBAC", "consumer", "consumer").with_access_string("on ~* -@all +GET"),
    ]
}

fn default_roles() -> Vec<RoleConfig> {
    vec![
        RoleConfig::function_role("producerRole", "Role to be assumed by producer lambda"),
        RoleConfig::function_role("consumerRole", "Role to be assumed by mock application lambda"),
        RoleConfig::function_role("outsiderRole", "Role to be assumed by mock application lambda"),
    ]
}

fn default_grants() -> Vec<GrantConfig> {
    vec![
        GrantConfig::new("producer", "producerRole"),
        GrantConfig::new("consumer", "consumerRole"),
    ]
}

fn default_consumers() -> Vec<ConsumerConfig> {
    vec![
        ConsumerConfig::new("producerFn", "producerRole", "producer"),
        ConsumerConfig::new("consumerFn", "consumerRole", "consumer"),
        ConsumerConfig::new("outsiderFn", "outsiderRole", "producer"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_users_match_demo() {
        let config = AppConfig::default();
        let ids: Vec<&str> = config.users.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, ["producer", "groupdefaultuser", "consumer"]);

        let producer = config.user("producer").unwrap();
        assert_eq!(producer.access_string.as_deref(), Some("on ~* -@all +SET"));

        let default_user = config.user("groupdefaultuser").unwrap();
        assert_eq!(default_user.user_name, "default");
        assert!(default_user.access_string.is_none());
    }

    #[test]
    fn test_default_roles_and_grants() {
        let config = AppConfig::default();
        assert_eq!(config.roles.len(), 3);
        assert!(config.role("outsiderRole").is_some());
        assert!(config.grants.iter().all(|g| g.role != "outsiderRole"));
        assert_eq!(
            config.role("producerRole").unwrap().managed_policies.len(),
            2
        );
    }

    #[test]
    fn test_default_cluster_settings() {
        let cache = CacheClusterConfig::default();
        assert_eq!(cache.port, 6379);
        assert!(cache.transit_encryption);
        assert_eq!(cache.engine_version, "6.x");
    }

    #[test]
    fn test_user_entry_validation() {
        assert!(UserConfig::new("producerRBAC", "producer", "producer").validate().is_ok());
        assert!(UserConfig::new("producerRBAC", "producer", "Producer").validate().is_err());
        assert!(UserConfig::new(" ", "producer", "producer").validate().is_err());
        assert!(UserConfig::new("x", "two words", "producer").validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [stack]
            name = "Custom"
            description = "custom stack"

            [network]
            subnet_group_construct_id = "Subnets"
            subnet_group_name = "custom-subnets"
            subnet_group_description = "custom"
            subnet_ids = ["subnet-1"]
            security_group_ids = []
            "#,
        )
        .unwrap();

        assert_eq!(config.stack.name, "Custom");
        assert_eq!(config.network.subnet_ids, ["subnet-1"]);
        assert_eq!(config.users.len(), 3);
        assert_eq!(config.user_group.group_id, "mock-app-user-group");
    }
}
