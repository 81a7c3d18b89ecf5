//! Composes a complete stack from configuration.
//!
//! Declaration order: roles, an optional shared key, every RBAC user, the
//! user group, read grants, the subnet group and replication group, then
//! consumers.

use crate::provider::{CacheEngineProvider, EncryptionKeyService, KeyRef, Provisioner, ReplicationGroupProps};
use crate::provider::{ReplicationGroupRef, RoleRef, SubnetGroupRef, UserGroupRef};
use crate::rbac_user::{RbacUser, RbacUserProps};
use crate::stack::{Consumer, Stack};
use crate::template::Template;
use rbac_config::{AppConfig, CacheClusterConfig, UserConfig, SHARED_KEY_ID};
use rbac_core::{intrinsic, RbacError, RbacResult};
use rbac_security::Principal;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// A fully declared stack plus handles to what it contains.
#[derive(Debug)]
pub struct AssembledStack {
    pub stack: Stack,
    pub roles: BTreeMap<String, RoleRef>,
    pub shared_key: Option<KeyRef>,
    /// Users in configuration order.
    pub users: Vec<RbacUser>,
    pub user_group: UserGroupRef,
    pub subnet_group: SubnetGroupRef,
    pub replication_group: ReplicationGroupRef,
    pub consumers: Vec<Consumer>,
}

impl AssembledStack {
    /// Finds a user by cache user id. The first match wins.
    #[must_use]
    pub fn user(&self, user_id: &str) -> Option<&RbacUser> {
        self.users.iter().find(|u| u.user_id() == user_id)
    }

    /// Finds a role by configured name.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&RoleRef> {
        self.roles.get(name)
    }

    /// Renders the template.
    pub fn synthesize(&self) -> RbacResult<Template> {
        self.stack.synthesize()
    }
}

/// Builds the stack described by `config`.
#[instrument(skip(config), fields(stack = %config.stack.name))]
pub fn assemble(config: &AppConfig) -> RbacResult<AssembledStack> {
    let mut stack = Stack::new(config.stack.name.clone(), config.stack.description.clone());
    let root = stack.root_path();

    let mut roles = BTreeMap::new();
    for role in &config.roles {
        let declared = stack.create_role(
            &root.child(role.name.clone()),
            Principal::service(role.assumed_by.clone()),
            &role.description,
            &role.managed_policies,
        )?;
        roles.insert(role.name.clone(), declared);
    }

    let shared_key = match &config.secrets.shared_key_alias {
        Some(alias) => Some(stack.create_key(&root.child(SHARED_KEY_ID), Some(alias.as_str()), config.secrets.key_rotation)?),
        None => None,
    };

    let mut users = Vec::with_capacity(config.users.len());
    for user in &config.users {
        let props = user_props(config, user, &roles, shared_key.as_ref())?;
        users.push(RbacUser::new(&mut stack, &root, &user.construct_id, props)?);
    }

    let members: Vec<_> = users.iter().map(|u| u.cache_user().clone()).collect();
    let user_group = stack.create_user_group(
        &root.child(config.user_group.construct_id.clone()),
        config.cache.engine,
        &config.user_group.group_id,
        &members,
    )?;
    for user in &users {
        for resource in user.resource_ids() {
            stack.add_dependency(&user_group.id, &resource)?;
        }
    }

    for grant in &config.grants {
        let role = lookup_role(&roles, &grant.role)?;
        let user = users
            .iter_mut()
            .find(|u| u.user_id() == grant.user)
            .ok_or_else(|| RbacError::not_found("cache user", &grant.user))?;
        user.grant_read_secret(&mut stack, &role.principal())?;
    }

    let network = &config.network;
    let subnet_group = stack.create_subnet_group(
        &root.child(network.subnet_group_construct_id.clone()),
        &network.subnet_group_name,
        &network.subnet_group_description,
        &network.subnet_ids,
    )?;

    let replication_group = stack.create_replication_group(
        &root.child(config.cache.construct_id.clone()),
        &replication_group_props(&config.cache, &network.security_group_ids),
        &subnet_group,
        &user_group,
    )?;
    stack.add_dependency(&replication_group.id, &subnet_group.id)?;
    stack.add_dependency(&replication_group.id, &user_group.id)?;

    stack.add_output(
        "RedisEndpoint",
        "Primary endpoint address of the replication group",
        intrinsic::get_att(&replication_group.id, "PrimaryEndPoint.Address"),
    );
    stack.add_output(
        "RedisPort",
        "Primary endpoint port of the replication group",
        intrinsic::get_att(&replication_group.id, "PrimaryEndPoint.Port"),
    );

    let mut consumers = Vec::with_capacity(config.consumers.len());
    for consumer in &config.consumers {
        let role = lookup_role(&roles, &consumer.role)?;
        let user = users
            .iter()
            .find(|u| u.user_id() == consumer.user)
            .ok_or_else(|| RbacError::not_found("cache user", &consumer.user))?;
        consumers.push(stack.create_consumer(&consumer.name, role, user.secret(), &replication_group)?);
    }

    info!(
        users = users.len(),
        roles = roles.len(),
        consumers = consumers.len(),
        resources = stack.resource_count(),
        "Stack assembled"
    );

    Ok(AssembledStack {
        stack,
        roles,
        shared_key,
        users,
        user_group,
        subnet_group,
        replication_group,
        consumers,
    })
}

fn lookup_role<'a>(roles: &'a BTreeMap<String, RoleRef>, name: &str) -> RbacResult<&'a RoleRef> {
    roles.get(name).ok_or_else(|| RbacError::not_found("role", name))
}

fn user_props(
    config: &AppConfig,
    user: &UserConfig,
    roles: &BTreeMap<String, RoleRef>,
    shared_key: Option<&KeyRef>,
) -> RbacResult<RbacUserProps> {
    let mut props = RbacUserProps::new(user.user_name.clone(), user.user_id.clone())
        .with_credential_profile(config.secrets.credential_profile);
    props.engine = config.cache.engine;
    props.key_rotation = config.secrets.key_rotation;
    props.access_string = user.access_string.clone();
    props.encryption_key = shared_key.cloned();
    for reader in &user.readers {
        props.principals.push(lookup_role(roles, reader)?.principal());
    }
    Ok(props)
}

fn replication_group_props(cache: &CacheClusterConfig, security_group_ids: &[String]) -> ReplicationGroupProps {
    ReplicationGroupProps {
        replication_group_id: cache.replication_group_id.clone(),
        description: cache.description.clone(),
        engine: cache.engine,
        engine_version: cache.engine_version.clone(),
        node_type: cache.node_type.clone(),
        num_node_groups: cache.num_node_groups,
        replicas_per_node_group: cache.replicas_per_node_group,
        at_rest_encryption: cache.at_rest_encryption,
        transit_encryption: cache.transit_encryption,
        multi_az: cache.multi_az,
        port: cache.port,
        security_group_ids: security_group_ids.to_vec(),
    }
}
