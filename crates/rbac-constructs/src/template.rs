//! Synthesized deployment template.

use rbac_core::{LogicalId, RbacResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Template format version understood by the orchestration engine.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Resource types the stack declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Customer managed encryption key.
    Key,
    /// Friendly name of a key.
    KeyAlias,
    /// Generated credential.
    Secret,
    /// Resource-based policy attached to a secret.
    SecretResourcePolicy,
    /// Cache engine user.
    CacheUser,
    /// Group of cache users attached to a replication group.
    CacheUserGroup,
    /// Subnets the cache nodes are placed in.
    CacheSubnetGroup,
    /// The cache cluster.
    ReplicationGroup,
    /// Assumable role.
    Role,
    /// Identity policy attached to roles.
    Policy,
}

impl ResourceType {
    /// Returns the template type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "AWS::KMS::Key",
            Self::KeyAlias => "AWS::KMS::Alias",
            Self::Secret => "AWS::SecretsManager::Secret",
            Self::SecretResourcePolicy => "AWS::SecretsManager::ResourcePolicy",
            Self::CacheUser => "AWS::ElastiCache::User",
            Self::CacheUserGroup => "AWS::ElastiCache::UserGroup",
            Self::CacheSubnetGroup => "AWS::ElastiCache::SubnetGroup",
            Self::ReplicationGroup => "AWS::ElastiCache::ReplicationGroup",
            Self::Role => "AWS::IAM::Role",
            Self::Policy => "AWS::IAM::Policy",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the `Resources` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
}

/// One entry of the `Outputs` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
}

/// A complete template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Metadata", skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<LogicalId, TemplateResource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: description.into(),
            metadata: Map::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Looks up a resource by logical id.
    #[must_use]
    pub fn resource(&self, id: &LogicalId) -> Option<&TemplateResource> {
        self.resources.get(id)
    }

    /// Iterates over resources of one type, in logical id order.
    pub fn resources_of_type(&self, resource_type: ResourceType) -> impl Iterator<Item = (&LogicalId, &TemplateResource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type.as_str())
    }

    /// Renders the template as JSON text.
    pub fn to_json_string(&self, pretty: bool) -> RbacResult<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    /// Writes the template to `path`.
    pub fn write_to(&self, path: &Path, pretty: bool) -> RbacResult<()> {
        let text = self.to_json_string(pretty)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), resources = self.resources.len(), "Template written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Template {
        let mut template = Template::new("demo");
        template.resources.insert(
            LogicalId::new("Secret1"),
            TemplateResource {
                resource_type: ResourceType::Secret.to_string(),
                properties: json!({"Name": "x"}),
                depends_on: vec![],
            },
        );
        template.resources.insert(
            LogicalId::new("User1"),
            TemplateResource {
                resource_type: ResourceType::CacheUser.to_string(),
                properties: json!({}),
                depends_on: vec![LogicalId::new("Secret1")],
            },
        );
        template
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["AWSTemplateFormatVersion"], TEMPLATE_FORMAT_VERSION);
        assert_eq!(value["Resources"]["User1"]["Type"], "AWS::ElastiCache::User");
        assert_eq!(value["Resources"]["User1"]["DependsOn"], json!(["Secret1"]));
        assert!(value["Resources"]["Secret1"].get("DependsOn").is_none());
        assert!(value.get("Outputs").is_none());
        assert!(value.get("Metadata").is_none());
    }

    #[test]
    fn test_resources_of_type() {
        let template = sample();
        let users: Vec<_> = template.resources_of_type(ResourceType::CacheUser).collect();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0.as_str(), "User1");
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        sample().write_to(&path, false).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["Description"], "demo");
    }
}
