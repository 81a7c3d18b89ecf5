//! Recording implementation of the provider traits.
//!
//! A [`Stack`] keeps every declared resource, the dependency graph between
//! them, and the policy documents grants accumulate into. Nothing is
//! rendered until [`Stack::synthesize`].

use crate::graph::DependencyGraph;
use crate::provider::{
    CacheEngineProvider, CacheUserProps, CacheUserRef, CredentialRef, CredentialStore, EncryptionKeyService, KeyRef,
    Provisioner, ReplicationGroupProps, ReplicationGroupRef, RoleRef, StatementRef, SubnetGroupRef, UserGroupRef,
};
use crate::template::{ResourceType, Template, TemplateOutput, TemplateResource};
use rbac_config::CacheEngine;
use rbac_core::{intrinsic, ConstructPath, LogicalId, RbacError, RbacResult, SynthesisId};
use rbac_security::{actions, password_reference, CredentialSpec, PolicyDocument, PolicyStatement, Principal};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Metadata key the synthesizer writes its own information under.
pub const METADATA_KEY: &str = "RbacSynth";

#[derive(Debug, Clone, Copy)]
struct AttachedPolicy {
    property: &'static str,
    document: usize,
}

#[derive(Debug, Clone)]
struct Declared {
    path: ConstructPath,
    resource_type: ResourceType,
    properties: Map<String, Value>,
    policy: Option<AttachedPolicy>,
}

/// Compute bound to a role that reads a credential and connects to the cluster.
///
/// Consumers are ordered in the graph but not declared as resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    pub id: LogicalId,
    pub name: String,
    pub role: RoleRef,
    pub credential: CredentialRef,
    pub replication_group: ReplicationGroupRef,
    /// Whether the role can read the credential.
    pub granted: bool,
}

/// Declared resources of one stack.
#[derive(Debug)]
pub struct Stack {
    name: String,
    description: String,
    synthesis_id: SynthesisId,
    resources: BTreeMap<LogicalId, Declared>,
    graph: DependencyGraph,
    documents: Vec<PolicyDocument>,
    secret_policies: HashMap<LogicalId, LogicalId>,
    role_policies: HashMap<LogicalId, LogicalId>,
    consumers: Vec<Consumer>,
    outputs: BTreeMap<String, TemplateOutput>,
}

impl Stack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            synthesis_id: SynthesisId::new(),
            resources: BTreeMap::new(),
            graph: DependencyGraph::new(),
            documents: Vec::new(),
            secret_policies: HashMap::new(),
            role_policies: HashMap::new(),
            consumers: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Returns the stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the path every construct of this stack is declared under.
    #[must_use]
    pub fn root_path(&self) -> ConstructPath {
        ConstructPath::root(self.name.clone())
    }

    /// Returns the id stamped into this stack's template metadata.
    #[must_use]
    pub const fn synthesis_id(&self) -> SynthesisId {
        self.synthesis_id
    }

    /// Returns the graph of explicitly declared edges.
    ///
    /// Edges implied by references inside policy documents are only added
    /// by [`Stack::resolved_graph`], since grants keep changing those.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Returns true if `id` is a declared resource.
    #[must_use]
    pub fn contains(&self, id: &LogicalId) -> bool {
        self.resources.contains_key(id)
    }

    /// Returns the type of a declared resource.
    #[must_use]
    pub fn resource_type(&self, id: &LogicalId) -> Option<ResourceType> {
        self.resources.get(id).map(|d| d.resource_type)
    }

    /// Returns the static properties of a declared resource.
    #[must_use]
    pub fn properties(&self, id: &LogicalId) -> Option<&Map<String, Value>> {
        self.resources.get(id).map(|d| &d.properties)
    }

    /// Number of declared resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Returns the declared consumers.
    #[must_use]
    pub fn consumers(&self) -> &[Consumer] {
        &self.consumers
    }

    /// Returns the identity policy created for `role`, if any.
    #[must_use]
    pub fn identity_policy_of(&self, role: &LogicalId) -> Option<&LogicalId> {
        self.role_policies.get(role)
    }

    /// Returns the policy document attached to `id`.
    pub fn document(&self, id: &LogicalId) -> RbacResult<&PolicyDocument> {
        let index = self.document_index(id)?;
        self.documents
            .get(index)
            .ok_or_else(|| RbacError::internal(format!("policy document {} missing", index)))
    }

    /// Adds a template output.
    pub fn add_output(&mut self, name: impl Into<String>, description: impl Into<String>, value: Value) {
        self.outputs.insert(
            name.into(),
            TemplateOutput {
                description: Some(description.into()),
                value,
            },
        );
    }

    fn declare(&mut self, path: &ConstructPath, resource_type: ResourceType, properties: Map<String, Value>) -> RbacResult<LogicalId> {
        let id = path.logical_id();
        if self.graph.contains(&id) {
            return Err(RbacError::conflict(format!("{} is declared twice", path)));
        }

        let references: Vec<LogicalId> = intrinsic::referenced_ids(&Value::Object(properties.clone()))
            .into_iter()
            .filter(|r| *r != id)
            .collect();
        if let Some(missing) = references.iter().find(|r| !self.graph.contains(r)) {
            return Err(RbacError::UnknownResource(format!("{} referenced by {}", missing, path)));
        }

        self.graph.add_node(id.clone());
        for dependency in &references {
            self.graph.add_dependency(&id, dependency)?;
        }

        info!(logical_id = %id, resource_type = %resource_type, path = %path, "Declared resource");
        self.resources.insert(
            id.clone(),
            Declared {
                path: path.clone(),
                resource_type,
                properties,
                policy: None,
            },
        );
        Ok(id)
    }

    fn attach_document(&mut self, id: &LogicalId, property: &'static str, document: PolicyDocument) -> RbacResult<usize> {
        let declared = self
            .resources
            .get_mut(id)
            .ok_or_else(|| RbacError::not_found("resource", id))?;
        self.documents.push(document);
        let index = self.documents.len() - 1;
        declared.policy = Some(AttachedPolicy { property, document: index });
        Ok(index)
    }

    fn document_index(&self, id: &LogicalId) -> RbacResult<usize> {
        self.resources
            .get(id)
            .and_then(|d| d.policy)
            .map(|p| p.document)
            .ok_or_else(|| RbacError::not_found("policy document", id))
    }

    fn document_mut(&mut self, id: &LogicalId) -> RbacResult<&mut PolicyDocument> {
        let index = self.document_index(id)?;
        self.documents
            .get_mut(index)
            .ok_or_else(|| RbacError::internal(format!("policy document {} missing", index)))
    }

    fn path_of(&self, id: &LogicalId) -> RbacResult<ConstructPath> {
        self.resources
            .get(id)
            .map(|d| d.path.clone())
            .ok_or_else(|| RbacError::not_found("resource", id))
    }

    /// Declares a role assumable by `assumed_by`.
    pub fn create_role(
        &mut self,
        path: &ConstructPath,
        assumed_by: Principal,
        description: &str,
        managed_policies: &[String],
    ) -> RbacResult<RoleRef> {
        let mut trust = PolicyDocument::new();
        trust.add_statement(PolicyStatement::allow([actions::STS_ASSUME_ROLE], vec![]).with_principal(assumed_by));

        let mut properties = Map::new();
        properties.insert("AssumeRolePolicyDocument".to_string(), trust.to_json());
        properties.insert("Description".to_string(), Value::from(description));
        if !managed_policies.is_empty() {
            let arns = managed_policies.iter().map(|p| intrinsic::managed_policy_arn(p)).collect();
            properties.insert("ManagedPolicyArns".to_string(), Value::Array(arns));
        }

        let id = self.declare(path, ResourceType::Role, properties)?;
        Ok(RoleRef {
            id,
            name: path.leaf().to_string(),
        })
    }

    /// Declares a subnet group for the cache nodes.
    pub fn create_subnet_group(
        &mut self,
        path: &ConstructPath,
        name: &str,
        description: &str,
        subnet_ids: &[String],
    ) -> RbacResult<SubnetGroupRef> {
        let mut properties = Map::new();
        properties.insert("CacheSubnetGroupName".to_string(), Value::from(name));
        properties.insert("Description".to_string(), Value::from(description));
        properties.insert("SubnetIds".to_string(), json!(subnet_ids));

        let id = self.declare(path, ResourceType::CacheSubnetGroup, properties)?;
        Ok(SubnetGroupRef {
            id,
            name: name.to_string(),
        })
    }

    /// Declares a consumer that reads `credential` as `role` and connects to `replication_group`.
    ///
    /// The consumer is ordered after its role, the replication group and
    /// every grant resource that exists for the credential or the role. A
    /// role without a read grant is allowed; its reads fail at runtime.
    pub fn create_consumer(
        &mut self,
        name: &str,
        role: &RoleRef,
        credential: &CredentialRef,
        replication_group: &ReplicationGroupRef,
    ) -> RbacResult<Consumer> {
        let id = self.root_path().child(name).logical_id();
        if self.graph.contains(&id) {
            return Err(RbacError::conflict(format!("consumer {} is declared twice", name)));
        }

        let granted = self.can_read(&role.principal(), credential);
        if !granted {
            warn!(consumer = name, role = %role.name, secret = %credential.secret, "Consumer role has no read grant on its credential");
        }

        let mut dependencies = vec![role.id.clone(), replication_group.id.clone()];
        dependencies.extend(self.secret_policies.get(&credential.secret).cloned());
        dependencies.extend(self.role_policies.get(&role.id).cloned());

        self.graph.add_node(id.clone());
        for dependency in &dependencies {
            self.graph.add_dependency(&id, dependency)?;
        }

        let consumer = Consumer {
            id,
            name: name.to_string(),
            role: role.clone(),
            credential: credential.clone(),
            replication_group: replication_group.clone(),
            granted,
        };
        info!(consumer = name, logical_id = %consumer.id, granted, "Declared consumer");
        self.consumers.push(consumer.clone());
        Ok(consumer)
    }

    /// Returns true if `principal` holds a read grant on `credential` in either policy.
    #[must_use]
    pub fn can_read(&self, principal: &Principal, credential: &CredentialRef) -> bool {
        let via_resource_policy = self
            .secret_policies
            .get(&credential.secret)
            .and_then(|policy| self.document(policy).ok())
            .is_some_and(|doc| doc.statements().iter().any(|s| s.has_principal(principal)));

        let secret = intrinsic::reference(&credential.secret);
        let via_identity_policy = principal
            .role_id()
            .and_then(|role| self.role_policies.get(role))
            .and_then(|policy| self.document(policy).ok())
            .is_some_and(|doc| doc.statements().iter().any(|s| s.resources().contains(&secret)));

        via_resource_policy || via_identity_policy
    }

    fn identity_policy_for(&mut self, role: &LogicalId) -> RbacResult<LogicalId> {
        if let Some(policy) = self.role_policies.get(role) {
            return Ok(policy.clone());
        }
        if self.resource_type(role) != Some(ResourceType::Role) {
            return Err(RbacError::not_found("role", role));
        }

        let path = self.path_of(role)?.child("DefaultPolicy");
        let mut properties = Map::new();
        properties.insert("PolicyName".to_string(), Value::from(path.logical_id().as_str()));
        properties.insert("Roles".to_string(), json!([intrinsic::reference(role)]));

        let policy = self.declare(&path, ResourceType::Policy, properties)?;
        self.attach_document(&policy, "PolicyDocument", PolicyDocument::new())?;
        self.role_policies.insert(role.clone(), policy.clone());
        Ok(policy)
    }

    /// Returns the graph with edges implied by policy document references added.
    pub fn resolved_graph(&self) -> RbacResult<DependencyGraph> {
        let mut graph = self.graph.clone();
        for (id, declared) in &self.resources {
            let Some(policy) = declared.policy else {
                continue;
            };
            let document = self
                .documents
                .get(policy.document)
                .ok_or_else(|| RbacError::internal(format!("policy document {} missing", policy.document)))?;
            for dependency in intrinsic::referenced_ids(&document.to_json()) {
                if &dependency != id {
                    graph.add_dependency(id, &dependency)?;
                }
            }
        }
        Ok(graph)
    }

    fn render(&self, id: &LogicalId, declared: &Declared) -> RbacResult<Value> {
        let mut properties = declared.properties.clone();
        if let Some(policy) = declared.policy {
            let document = self.document(id)?;
            document
                .validate()
                .map_err(|e| RbacError::validation(format!("{} on {}: {}", policy.property, id, e)))?;
            properties.insert(policy.property.to_string(), document.to_json());
        }
        Ok(Value::Object(properties))
    }

    fn consumer_metadata(&self, consumer: &Consumer, graph: &DependencyGraph) -> Value {
        let endpoint = &consumer.replication_group.id;
        json!({
            "Name": consumer.name,
            "Role": intrinsic::get_att(&consumer.role.id, "Arn"),
            "SecretArn": intrinsic::reference(&consumer.credential.secret),
            "RedisEndpoint": intrinsic::get_att(endpoint, "PrimaryEndPoint.Address"),
            "RedisPort": intrinsic::get_att(endpoint, "PrimaryEndPoint.Port"),
            "Granted": consumer.granted,
            "DependsOn": graph.dependencies_of(&consumer.id),
        })
    }

    /// Resolves the graph, checks it is acyclic, and renders the template.
    pub fn synthesize(&self) -> RbacResult<Template> {
        let graph = self.resolved_graph()?;
        let order = graph.topological_order()?;

        let mut template = Template::new(self.description.clone());
        for id in &order {
            let Some(declared) = self.resources.get(id) else {
                continue;
            };
            template.resources.insert(
                id.clone(),
                TemplateResource {
                    resource_type: declared.resource_type.to_string(),
                    properties: self.render(id, declared)?,
                    depends_on: graph.dependencies_of(id),
                },
            );
        }

        let consumers: Map<String, Value> = self
            .consumers
            .iter()
            .map(|c| (c.id.to_string(), self.consumer_metadata(c, &graph)))
            .collect();

        template.metadata.insert(
            METADATA_KEY.to_string(),
            json!({
                "Stack": self.name,
                "SynthesisId": self.synthesis_id.to_string(),
                "CreationOrder": order,
                "Consumers": consumers,
            }),
        );

        template.outputs = self.outputs.clone();
        for consumer in &self.consumers {
            let key: String = consumer.name.chars().filter(char::is_ascii_alphanumeric).collect();
            template.outputs.insert(
                format!("{}SecretArn", key),
                TemplateOutput {
                    description: Some(format!("Credential read by {}", consumer.name)),
                    value: intrinsic::reference(&consumer.credential.secret),
                },
            );
            template.outputs.insert(
                format!("{}RoleArn", key),
                TemplateOutput {
                    description: Some(format!("Role assumed by {}", consumer.name)),
                    value: intrinsic::get_att(&consumer.role.id, "Arn"),
                },
            );
        }

        info!(
            stack = %self.name,
            resources = template.resources.len(),
            consumers = self.consumers.len(),
            synthesis_id = %self.synthesis_id,
            "Stack synthesized"
        );
        Ok(template)
    }
}

impl EncryptionKeyService for Stack {
    fn create_key(&mut self, path: &ConstructPath, alias: Option<&str>, rotation: bool) -> RbacResult<KeyRef> {
        let mut properties = Map::new();
        properties.insert("EnableKeyRotation".to_string(), Value::from(rotation));
        let key = self.declare(path, ResourceType::Key, properties)?;

        let mut policy = PolicyDocument::new();
        policy.grant_to_principal(&[actions::KMS_ALL], Value::from("*"), Principal::AccountRoot);
        self.attach_document(&key, "KeyPolicy", policy)?;

        let alias = match alias {
            Some(name) => {
                let mut properties = Map::new();
                properties.insert("AliasName".to_string(), Value::from(format!("alias/{}", name)));
                properties.insert("TargetKeyId".to_string(), intrinsic::get_att(&key, "Arn"));
                Some(self.declare(&path.child("Alias"), ResourceType::KeyAlias, properties)?)
            }
            None => None,
        };

        Ok(KeyRef { key, alias })
    }

    fn grant_decrypt(&mut self, principal: &Principal, key: &KeyRef) -> RbacResult<()> {
        let added = self
            .document_mut(&key.key)?
            .grant_to_principal(&[actions::KMS_DECRYPT], Value::from("*"), principal.clone());
        if added {
            debug!(principal = %principal, key = %key.key, "Granted decrypt");
        }
        Ok(())
    }
}

impl CredentialStore for Stack {
    fn create_credential(&mut self, path: &ConstructPath, spec: &CredentialSpec, key: &KeyRef) -> RbacResult<CredentialRef> {
        let mut properties = Map::new();
        properties.insert("GenerateSecretString".to_string(), spec.to_generate_json());
        properties.insert("KmsKeyId".to_string(), intrinsic::get_att(&key.key, "Arn"));

        let secret = self.declare(path, ResourceType::Secret, properties)?;
        Ok(CredentialRef {
            secret,
            key: key.clone(),
        })
    }

    fn grant_read(&mut self, principal: &Principal, credential: &CredentialRef) -> RbacResult<()> {
        let Some(role) = principal.role_id() else {
            debug!(principal = %principal, "No identity policy in this stack; resource policy grant only");
            return Ok(());
        };

        let policy = self.identity_policy_for(role)?;
        let document = self.document_mut(&policy)?;
        let read = document.grant_on_resource(&actions::SECRET_READ, intrinsic::reference(&credential.secret));
        let decrypt = document.grant_on_resource(&[actions::KMS_DECRYPT], intrinsic::get_att(&credential.key.key, "Arn"));
        if read || decrypt {
            debug!(principal = %principal, secret = %credential.secret, "Granted read through identity policy");
        }
        Ok(())
    }

    fn attach_statement(&mut self, credential: &CredentialRef, statement: PolicyStatement) -> RbacResult<StatementRef> {
        let policy = match self.secret_policies.get(&credential.secret) {
            Some(policy) => policy.clone(),
            None => {
                let path = self.path_of(&credential.secret)?.child("Policy");
                let mut properties = Map::new();
                properties.insert("SecretId".to_string(), intrinsic::reference(&credential.secret));
                properties.insert("BlockPublicPolicy".to_string(), Value::from(true));

                let policy = self.declare(&path, ResourceType::SecretResourcePolicy, properties)?;
                self.attach_document(&policy, "ResourcePolicy", PolicyDocument::new())?;
                self.secret_policies.insert(credential.secret.clone(), policy.clone());
                policy
            }
        };

        let document = self.document_index(&policy)?;
        let index = self.document_mut(&policy)?.add_statement(statement);
        debug!(secret = %credential.secret, policy = %policy, "Attached statement to resource policy");
        Ok(StatementRef { document, index })
    }

    fn statement(&self, statement: StatementRef) -> RbacResult<&PolicyStatement> {
        self.documents
            .get(statement.document)
            .and_then(|d| d.statement(statement.index))
            .ok_or_else(|| RbacError::not_found("policy statement", statement.index.0))
    }

    fn statement_mut(&mut self, statement: StatementRef) -> RbacResult<&mut PolicyStatement> {
        self.documents
            .get_mut(statement.document)
            .and_then(|d| d.statement_mut(statement.index))
            .ok_or_else(|| RbacError::not_found("policy statement", statement.index.0))
    }

    fn resource_policy_of(&self, credential: &CredentialRef) -> Option<LogicalId> {
        self.secret_policies.get(&credential.secret).cloned()
    }
}

impl CacheEngineProvider for Stack {
    fn create_user(&mut self, path: &ConstructPath, props: &CacheUserProps) -> RbacResult<CacheUserRef> {
        if props.access_string.is_unrestricted() {
            warn!(user_id = %props.user_id, access_string = %props.access_string, "Cache user can run every command on every key");
        }

        let mut properties = Map::new();
        properties.insert("Engine".to_string(), Value::from(props.engine.user_engine_name()));
        properties.insert("UserName".to_string(), Value::from(props.user_name.clone()));
        properties.insert("UserId".to_string(), Value::from(props.user_id.clone()));
        properties.insert("AccessString".to_string(), Value::from(props.access_string.as_str()));
        properties.insert(
            "Passwords".to_string(),
            json!([password_reference(&props.credential.secret)]),
        );

        let id = self.declare(path, ResourceType::CacheUser, properties)?;
        Ok(CacheUserRef {
            id,
            user_id: props.user_id.clone(),
        })
    }

    fn create_user_group(
        &mut self,
        path: &ConstructPath,
        engine: CacheEngine,
        group_id: &str,
        members: &[CacheUserRef],
    ) -> RbacResult<UserGroupRef> {
        let user_ids: Vec<String> = members.iter().map(|m| m.user_id.clone()).collect();

        let mut properties = Map::new();
        properties.insert("Engine".to_string(), Value::from(engine.user_engine_name()));
        properties.insert("UserGroupId".to_string(), Value::from(group_id));
        properties.insert("UserIds".to_string(), json!(user_ids));

        let id = self.declare(path, ResourceType::CacheUserGroup, properties)?;
        for member in members {
            self.graph.add_dependency(&id, &member.id)?;
        }

        Ok(UserGroupRef {
            id,
            group_id: group_id.to_string(),
            members: user_ids,
        })
    }

    fn create_replication_group(
        &mut self,
        path: &ConstructPath,
        props: &ReplicationGroupProps,
        subnet_group: &SubnetGroupRef,
        user_group: &UserGroupRef,
    ) -> RbacResult<ReplicationGroupRef> {
        let mut properties = Map::new();
        properties.insert("ReplicationGroupId".to_string(), Value::from(props.replication_group_id.clone()));
        properties.insert("ReplicationGroupDescription".to_string(), Value::from(props.description.clone()));
        properties.insert("Engine".to_string(), Value::from(props.engine.cluster_engine_name()));
        properties.insert("EngineVersion".to_string(), Value::from(props.engine_version.clone()));
        properties.insert("CacheNodeType".to_string(), Value::from(props.node_type.clone()));
        properties.insert("NumNodeGroups".to_string(), Value::from(props.num_node_groups));
        properties.insert("ReplicasPerNodeGroup".to_string(), Value::from(props.replicas_per_node_group));
        properties.insert("AtRestEncryptionEnabled".to_string(), Value::from(props.at_rest_encryption));
        properties.insert("TransitEncryptionEnabled".to_string(), Value::from(props.transit_encryption));
        properties.insert("MultiAZEnabled".to_string(), Value::from(props.multi_az));
        properties.insert("AutomaticFailoverEnabled".to_string(), Value::from(props.multi_az));
        properties.insert("Port".to_string(), Value::from(props.port));
        properties.insert("CacheSubnetGroupName".to_string(), intrinsic::reference(&subnet_group.id));
        properties.insert("UserGroupIds".to_string(), json!([intrinsic::reference(&user_group.id)]));
        if !props.security_group_ids.is_empty() {
            properties.insert("SecurityGroupIds".to_string(), json!(props.security_group_ids));
        }

        let id = self.declare(path, ResourceType::ReplicationGroup, properties)?;
        Ok(ReplicationGroupRef { id })
    }
}

impl Provisioner for Stack {
    fn add_dependency(&mut self, dependent: &LogicalId, dependency: &LogicalId) -> RbacResult<()> {
        self.graph.add_dependency(dependent, dependency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbac_config::CredentialProfile;
    use rbac_security::AccessString;

    fn lambda_role(stack: &mut Stack, name: &str) -> RoleRef {
        stack
            .create_role(
                &ConstructPath::root(name),
                Principal::service("lambda.amazonaws.com"),
                "test role",
                &["service-role/AWSLambdaBasicExecutionRole".to_string()],
            )
            .unwrap()
    }

    fn credential(stack: &mut Stack, name: &str) -> CredentialRef {
        let root = ConstructPath::root(name);
        let key = stack.create_key(&root.child("kmsForSecret"), Some("redisRbacUser/test"), true).unwrap();
        let spec = CredentialSpec::new(name, CredentialProfile::default());
        stack.create_credential(&root.child("secret"), &spec, &key).unwrap()
    }

    #[test]
    fn test_declare_twice_conflicts() {
        let mut stack = Stack::new("Test", "test");
        lambda_role(&mut stack, "roleA");
        let err = stack
            .create_role(&ConstructPath::root("roleA"), Principal::service("x"), "", &[])
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[test]
    fn test_key_alias_and_secret_edges() {
        let mut stack = Stack::new("Test", "test");
        let credential = credential(&mut stack, "producer");

        let alias = credential.key.alias.clone().unwrap();
        assert_eq!(stack.resource_type(&alias), Some(ResourceType::KeyAlias));
        assert!(stack.graph().depends_on(&alias, &credential.key.key));
        assert!(stack.graph().depends_on(&credential.secret, &credential.key.key));
        assert_eq!(
            stack.properties(&alias).unwrap()["AliasName"],
            "alias/redisRbacUser/test"
        );
    }

    #[test]
    fn test_attach_statement_creates_policy_once() {
        let mut stack = Stack::new("Test", "test");
        let credential = credential(&mut stack, "producer");
        let role = lambda_role(&mut stack, "roleA");
        assert!(stack.resource_policy_of(&credential).is_none());

        let statement = PolicyStatement::allow(actions::SECRET_READ, vec![intrinsic::reference(&credential.secret)])
            .with_principal(role.principal());
        let handle = stack.attach_statement(&credential, statement).unwrap();
        let policy = stack.resource_policy_of(&credential).unwrap();

        stack.statement_mut(handle).unwrap().add_principal(Principal::service("x"));
        assert_eq!(stack.statement(handle).unwrap().principals().len(), 2);
        assert_eq!(stack.document(&policy).unwrap().statements().len(), 1);
        assert!(stack.can_read(&role.principal(), &credential));
    }

    #[test]
    fn test_grant_read_builds_identity_policy() {
        let mut stack = Stack::new("Test", "test");
        let credential = credential(&mut stack, "producer");
        let role = lambda_role(&mut stack, "roleA");

        stack.grant_read(&role.principal(), &credential).unwrap();
        stack.grant_read(&role.principal(), &credential).unwrap();

        let policy = stack.identity_policy_of(&role.id).cloned().unwrap();
        assert_eq!(stack.document(&policy).unwrap().statements().len(), 2);
        assert!(stack.graph().depends_on(&policy, &role.id));
        assert!(stack.can_read(&role.principal(), &credential));

        // Non-role principals have no identity policy here.
        stack.grant_read(&Principal::service("x"), &credential).unwrap();
    }

    #[test]
    fn test_grant_decrypt_deduplicates() {
        let mut stack = Stack::new("Test", "test");
        let credential = credential(&mut stack, "producer");
        let role = lambda_role(&mut stack, "roleA");

        stack.grant_decrypt(&role.principal(), &credential.key).unwrap();
        stack.grant_decrypt(&role.principal(), &credential.key).unwrap();

        let doc = stack.document(&credential.key.key).unwrap();
        assert_eq!(doc.statements().len(), 2);
        assert_eq!(doc.statements()[1].principals(), &[role.principal()]);

        let resolved = stack.resolved_graph().unwrap();
        assert!(resolved.depends_on(&credential.key.key, &role.id));
        assert!(!stack.graph().depends_on(&credential.key.key, &role.id));
    }

    #[test]
    fn test_user_password_is_reference() {
        let mut stack = Stack::new("Test", "test");
        let credential = credential(&mut stack, "producer");
        let props = CacheUserProps {
            engine: CacheEngine::Redis,
            user_name: "producer".to_string(),
            user_id: "producer".to_string(),
            access_string: AccessString::default(),
            credential: credential.clone(),
        };
        let user = stack.create_user(&ConstructPath::root("producer").child("redisuser"), &props).unwrap();

        let properties = stack.properties(&user.id).unwrap();
        assert_eq!(properties["Passwords"][0], password_reference(&credential.secret));
        assert!(stack.graph().depends_on(&user.id, &credential.secret));
    }

    #[test]
    fn test_consumer_without_grant_is_allowed() {
        let mut stack = Stack::new("Test", "test");
        let credential = credential(&mut stack, "producer");
        let role = lambda_role(&mut stack, "outsiderRole");
        let subnets = stack
            .create_subnet_group(&ConstructPath::root("subnets"), "RedisSubnetGroup", "d", &["subnet-1".to_string()])
            .unwrap();
        let group = stack.create_user_group(&ConstructPath::root("group"), CacheEngine::Redis, "g", &[]).unwrap();
        let props = ReplicationGroupProps {
            replication_group_id: "rg".to_string(),
            description: "rg".to_string(),
            engine: CacheEngine::Redis,
            engine_version: "6.x".to_string(),
            node_type: "cache.m6g.large".to_string(),
            num_node_groups: 1,
            replicas_per_node_group: 1,
            at_rest_encryption: true,
            transit_encryption: true,
            multi_az: true,
            port: 6379,
            security_group_ids: vec![],
        };
        let rg = stack
            .create_replication_group(&ConstructPath::root("rg"), &props, &subnets, &group)
            .unwrap();

        let consumer = stack.create_consumer("outsiderFn", &role, &credential, &rg).unwrap();
        assert!(!consumer.granted);
        assert!(stack.graph().depends_on(&consumer.id, &role.id));
        assert!(stack.graph().depends_on(&consumer.id, &rg.id));
        assert!(stack.create_consumer("outsiderFn", &role, &credential, &rg).is_err());

        let template = stack.synthesize().unwrap();
        assert!(template.resource(&consumer.id).is_none());
        assert_eq!(
            template.metadata[METADATA_KEY]["Consumers"][consumer.id.as_str()]["Granted"],
            false
        );
        assert!(template.outputs.contains_key("outsiderFnSecretArn"));
    }

    #[test]
    fn test_synthesize_reports_cycles() {
        let mut stack = Stack::new("Test", "test");
        let a = lambda_role(&mut stack, "roleA");
        let b = lambda_role(&mut stack, "roleB");
        stack.add_dependency(&a.id, &b.id).unwrap();
        stack.add_dependency(&b.id, &a.id).unwrap();

        let err = stack.synthesize().unwrap_err();
        assert_eq!(err.error_code(), "DEPENDENCY_CYCLE");
    }

    #[test]
    fn test_role_rendering() {
        let mut stack = Stack::new("Test", "test");
        let role = lambda_role(&mut stack, "producerRole");
        let template = stack.synthesize().unwrap();
        let rendered = &template.resource(&role.id).unwrap().properties;

        assert_eq!(
            rendered["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            "lambda.amazonaws.com"
        );
        assert_eq!(rendered["ManagedPolicyArns"].as_array().map(Vec::len), Some(1));
        assert_eq!(role.name, "producerRole");
    }
}
