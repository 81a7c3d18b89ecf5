//! Collaborator traits the constructs are written against.
//!
//! Every operation declares resources or edges; nothing here talks to a
//! cloud API. [`crate::Stack`] is the implementation that records the
//! declarations and renders them.

use rbac_config::CacheEngine;
use rbac_core::{ConstructPath, LogicalId, RbacResult};
use rbac_security::{AccessString, CredentialSpec, PolicyStatement, Principal, StatementIndex};

/// Handle to a declared encryption key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRef {
    /// The key resource.
    pub key: LogicalId,
    /// Alias resource, when the key was declared with one.
    pub alias: Option<LogicalId>,
}

/// Handle to a declared credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRef {
    /// The secret resource.
    pub secret: LogicalId,
    /// Key the secret is encrypted under.
    pub key: KeyRef,
}

/// Handle to a statement attached to a credential's resource policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementRef {
    pub(crate) document: usize,
    pub(crate) index: StatementIndex,
}

/// Handle to a declared cache user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheUserRef {
    pub id: LogicalId,
    pub user_id: String,
}

/// Handle to a declared cache user group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGroupRef {
    pub id: LogicalId,
    pub group_id: String,
    /// Member user ids in declaration order.
    pub members: Vec<String>,
}

/// Handle to a declared subnet group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetGroupRef {
    pub id: LogicalId,
    pub name: String,
}

/// Handle to a declared replication group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationGroupRef {
    pub id: LogicalId,
}

/// Handle to a declared role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub id: LogicalId,
    pub name: String,
}

impl RoleRef {
    /// The role as a grantee.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal::role(self.id.clone())
    }
}

/// Properties of a cache user.
#[derive(Debug, Clone)]
pub struct CacheUserProps {
    pub engine: CacheEngine,
    pub user_name: String,
    pub user_id: String,
    pub access_string: AccessString,
    /// Credential whose generated password authenticates the user.
    pub credential: CredentialRef,
}

/// Properties of a replication group.
#[derive(Debug, Clone)]
pub struct ReplicationGroupProps {
    pub replication_group_id: String,
    pub description: String,
    pub engine: CacheEngine,
    pub engine_version: String,
    pub node_type: String,
    pub num_node_groups: u32,
    pub replicas_per_node_group: u32,
    pub at_rest_encryption: bool,
    pub transit_encryption: bool,
    pub multi_az: bool,
    pub port: u16,
    pub security_group_ids: Vec<String>,
}

/// Declares encryption keys and their grants.
pub trait EncryptionKeyService {
    /// Declares a key with an optional alias.
    fn create_key(&mut self, path: &ConstructPath, alias: Option<&str>, rotation: bool) -> RbacResult<KeyRef>;

    /// Allows `principal` to decrypt with `key`. Repeated grants are no-ops.
    fn grant_decrypt(&mut self, principal: &Principal, key: &KeyRef) -> RbacResult<()>;
}

/// Declares generated credentials and who may read them.
pub trait CredentialStore {
    /// Declares a credential generated per `spec` and encrypted under `key`.
    fn create_credential(&mut self, path: &ConstructPath, spec: &CredentialSpec, key: &KeyRef) -> RbacResult<CredentialRef>;

    /// Allows `principal` to read the credential through its own identity policy.
    fn grant_read(&mut self, principal: &Principal, credential: &CredentialRef) -> RbacResult<()>;

    /// Adds `statement` to the credential's resource policy, creating the policy on first use.
    fn attach_statement(&mut self, credential: &CredentialRef, statement: PolicyStatement) -> RbacResult<StatementRef>;

    /// Returns an attached statement.
    fn statement(&self, statement: StatementRef) -> RbacResult<&PolicyStatement>;

    /// Returns an attached statement for in-place changes.
    fn statement_mut(&mut self, statement: StatementRef) -> RbacResult<&mut PolicyStatement>;

    /// Logical id of the credential's resource policy, if one was created.
    fn resource_policy_of(&self, credential: &CredentialRef) -> Option<LogicalId>;
}

/// Declares cache engine resources.
pub trait CacheEngineProvider {
    /// Declares a cache user.
    fn create_user(&mut self, path: &ConstructPath, props: &CacheUserProps) -> RbacResult<CacheUserRef>;

    /// Declares a user group with `members` in the given order.
    fn create_user_group(
        &mut self,
        path: &ConstructPath,
        engine: CacheEngine,
        group_id: &str,
        members: &[CacheUserRef],
    ) -> RbacResult<UserGroupRef>;

    /// Declares a replication group placed in `subnet_group` and authenticated by `user_group`.
    fn create_replication_group(
        &mut self,
        path: &ConstructPath,
        props: &ReplicationGroupProps,
        subnet_group: &SubnetGroupRef,
        user_group: &UserGroupRef,
    ) -> RbacResult<ReplicationGroupRef>;
}

/// Everything a construct needs, plus explicit ordering.
pub trait Provisioner: EncryptionKeyService + CredentialStore + CacheEngineProvider {
    /// Declares that `dependent` must be created after `dependency`.
    fn add_dependency(&mut self, dependent: &LogicalId, dependency: &LogicalId) -> RbacResult<()>;
}
