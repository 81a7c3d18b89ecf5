//! IAM policy document structure.
//!
//! A document is an ordered list of statements. Grants are merged into
//! existing statements wherever the effect, actions and resources already
//! line up, so repeated grants never grow the statement count.

use super::{Principal, PrincipalKind};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Effect of a policy statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    /// Allow the action
    #[default]
    Allow,
    /// Deny the action (takes precedence over Allow)
    Deny,
}

impl Effect {
    /// Returns the policy JSON value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyStatement {
    sid: Option<String>,
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<Value>,
    principals: Vec<Principal>,
}

impl PolicyStatement {
    /// Creates an allow statement for `actions` on `resources`.
    #[must_use]
    pub fn allow<A, S>(actions: A, resources: Vec<Value>) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut statement = Self {
            effect: Effect::Allow,
            ..Self::default()
        };
        for action in actions {
            statement.add_action(action);
        }
        for resource in resources {
            statement.add_resource(resource);
        }
        statement
    }

    /// Sets the statement id.
    #[must_use]
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Sets the effect.
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Adds a principal, returning it for chaining.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.add_principal(principal);
        self
    }

    /// Adds an action. Returns false if it was already present.
    pub fn add_action(&mut self, action: impl Into<String>) -> bool {
        let action = action.into();
        if self.actions.contains(&action) {
            return false;
        }
        self.actions.push(action);
        true
    }

    /// Adds a resource. Returns false if it was already present.
    pub fn add_resource(&mut self, resource: Value) -> bool {
        if self.resources.contains(&resource) {
            return false;
        }
        self.resources.push(resource);
        true
    }

    /// Adds a principal. Returns false if it was already present.
    pub fn add_principal(&mut self, principal: Principal) -> bool {
        if self.principals.contains(&principal) {
            return false;
        }
        self.principals.push(principal);
        true
    }

    /// Returns the statement id.
    #[must_use]
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// Returns the effect.
    #[must_use]
    pub const fn effect(&self) -> Effect {
        self.effect
    }

    /// Returns the actions in insertion order.
    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Returns the resources in insertion order.
    #[must_use]
    pub fn resources(&self) -> &[Value] {
        &self.resources
    }

    /// Returns the principals in insertion order.
    #[must_use]
    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    /// Checks if the principal is listed.
    #[must_use]
    pub fn has_principal(&self, principal: &Principal) -> bool {
        self.principals.contains(principal)
    }

    /// Checks if this statement covers exactly the given effect and actions.
    fn matches_actions(&self, effect: Effect, actions: &[&str]) -> bool {
        self.effect == effect
            && self.actions.len() == actions.len()
            && actions.iter().all(|a| self.actions.iter().any(|s| s == a))
    }

    /// Validates statement structure.
    pub fn validate(&self) -> Result<(), String> {
        if self.actions.is_empty() {
            return Err("statement has no actions".to_string());
        }
        if self.resources.is_empty() {
            return Err("statement has no resources".to_string());
        }
        Ok(())
    }

    /// Renders the statement as policy JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        if let Some(sid) = &self.sid {
            out.insert("Sid".to_string(), Value::from(sid.clone()));
        }
        out.insert("Effect".to_string(), Value::from(self.effect.as_str()));
        out.insert("Action".to_string(), collapse(self.actions.iter().cloned().map(Value::from).collect()));

        if !self.principals.is_empty() {
            let mut grouped: BTreeMap<PrincipalKind, Vec<Value>> = BTreeMap::new();
            for principal in &self.principals {
                grouped
                    .entry(principal.kind())
                    .or_default()
                    .push(principal.to_policy_value());
            }
            let principal_block: Map<String, Value> = grouped
                .into_iter()
                .map(|(kind, values)| (kind.key().to_string(), collapse(values)))
                .collect();
            out.insert("Principal".to_string(), Value::Object(principal_block));
        }

        // Trust policies carry no resource.
        if !self.resources.is_empty() {
            out.insert("Resource".to_string(), collapse(self.resources.clone()));
        }
        Value::Object(out)
    }
}

/// A single element is written bare, several as a list.
fn collapse(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

/// Index of a statement inside a [`PolicyDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementIndex(pub usize);

/// Complete IAM policy document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Create a new empty policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement to this policy, returning its index.
    pub fn add_statement(&mut self, statement: PolicyStatement) -> StatementIndex {
        self.statements.push(statement);
        StatementIndex(self.statements.len() - 1)
    }

    /// Returns a statement by index.
    #[must_use]
    pub fn statement(&self, index: StatementIndex) -> Option<&PolicyStatement> {
        self.statements.get(index.0)
    }

    /// Returns a mutable statement by index.
    pub fn statement_mut(&mut self, index: StatementIndex) -> Option<&mut PolicyStatement> {
        self.statements.get_mut(index.0)
    }

    /// Returns all statements.
    #[must_use]
    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    /// Checks if the document has no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Allows `principal` to perform `actions` on `resource` (resource-based policy).
    ///
    /// An existing statement with the same actions and resource gains the
    /// principal; otherwise a new statement is added. Returns false when the
    /// principal was already granted.
    pub fn grant_to_principal(&mut self, actions: &[&str], resource: Value, principal: Principal) -> bool {
        let existing = self
            .statements
            .iter_mut()
            .find(|s| s.matches_actions(Effect::Allow, actions) && s.resources == [resource.clone()]);

        match existing {
            Some(statement) => statement.add_principal(principal),
            None => {
                self.add_statement(PolicyStatement::allow(actions.iter().copied(), vec![resource]).with_principal(principal));
                true
            }
        }
    }

    /// Allows the policy holder to perform `actions` on `resource` (identity-based policy).
    ///
    /// An existing principal-less statement with the same actions gains the
    /// resource. Returns false when the resource was already covered.
    pub fn grant_on_resource(&mut self, actions: &[&str], resource: Value) -> bool {
        let existing = self
            .statements
            .iter_mut()
            .find(|s| s.principals.is_empty() && s.matches_actions(Effect::Allow, actions));

        match existing {
            Some(statement) => statement.add_resource(resource),
            None => {
                self.add_statement(PolicyStatement::allow(actions.iter().copied(), vec![resource]));
                true
            }
        }
    }

    /// Validate policy structure
    pub fn validate(&self) -> Result<(), String> {
        if self.statements.is_empty() {
            return Err("Policy must have at least one statement".to_string());
        }

        for (i, stmt) in self.statements.iter().enumerate() {
            stmt.validate().map_err(|e| format!("Statement {}: {}", i, e))?;
        }

        Ok(())
    }

    /// Renders the document as policy JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": self.statements.iter().map(PolicyStatement::to_json).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions;
    use rbac_core::LogicalId;

    fn role(name: &str) -> Principal {
        Principal::role(LogicalId::new(name))
    }

    fn secret() -> Value {
        json!({"Ref": "Secret1"})
    }

    #[test]
    fn test_statement_deduplicates() {
        let mut stmt = PolicyStatement::allow(actions::SECRET_READ, vec![secret()]);
        assert!(!stmt.add_action(actions::SECRET_DESCRIBE));
        assert!(!stmt.add_resource(secret()));
        assert!(stmt.add_principal(role("A")));
        assert!(!stmt.add_principal(role("A")));
        assert_eq!(stmt.actions().len(), 2);
        assert_eq!(stmt.principals().len(), 1);
    }

    #[test]
    fn test_statement_json() {
        let stmt = PolicyStatement::allow(actions::SECRET_READ, vec![secret()])
            .with_principal(role("RoleA"))
            .with_principal(Principal::service("lambda.amazonaws.com"));

        assert_eq!(
            stmt.to_json(),
            json!({
                "Effect": "Allow",
                "Action": ["secretsmanager:DescribeSecret", "secretsmanager:GetSecretValue"],
                "Principal": {
                    "AWS": {"Fn::GetAtt": ["RoleA", "Arn"]},
                    "Service": "lambda.amazonaws.com"
                },
                "Resource": {"Ref": "Secret1"}
            })
        );
    }

    #[test]
    fn test_statement_json_lists_multiple_principals() {
        let stmt = PolicyStatement::allow([actions::KMS_DECRYPT], vec![json!("*")])
            .with_principal(role("A"))
            .with_principal(role("B"))
            .with_sid("Decrypt");
        let rendered = stmt.to_json();
        assert_eq!(rendered["Sid"], "Decrypt");
        assert_eq!(rendered["Action"], "kms:Decrypt");
        assert_eq!(rendered["Principal"]["AWS"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_trust_statement_has_no_resource() {
        let stmt = PolicyStatement::allow([actions::STS_ASSUME_ROLE], vec![])
            .with_principal(Principal::service("lambda.amazonaws.com"));
        let rendered = stmt.to_json();
        assert!(rendered.get("Resource").is_none());
        assert_eq!(rendered["Principal"]["Service"], "lambda.amazonaws.com");
    }

    #[test]
    fn test_grant_to_principal_merges() {
        let mut doc = PolicyDocument::new();
        assert!(doc.grant_to_principal(&actions::SECRET_READ, secret(), role("A")));
        assert!(doc.grant_to_principal(&actions::SECRET_READ, secret(), role("B")));
        assert!(!doc.grant_to_principal(&actions::SECRET_READ, secret(), role("A")));

        assert_eq!(doc.statements().len(), 1);
        assert_eq!(doc.statements()[0].principals(), &[role("A"), role("B")]);

        // Different resource gets its own statement.
        doc.grant_to_principal(&actions::SECRET_READ, json!({"Ref": "Secret2"}), role("A"));
        assert_eq!(doc.statements().len(), 2);
    }

    #[test]
    fn test_grant_on_resource_merges() {
        let mut doc = PolicyDocument::new();
        assert!(doc.grant_on_resource(&actions::SECRET_READ, secret()));
        assert!(doc.grant_on_resource(&actions::SECRET_READ, json!({"Ref": "Secret2"})));
        assert!(!doc.grant_on_resource(&actions::SECRET_READ, secret()));
        assert!(doc.grant_on_resource(&[actions::KMS_DECRYPT], json!("*")));

        assert_eq!(doc.statements().len(), 2);
        assert_eq!(doc.statements()[0].resources().len(), 2);
    }

    #[test]
    fn test_statement_index_access() {
        let mut doc = PolicyDocument::new();
        let index = doc.add_statement(PolicyStatement::allow(actions::SECRET_READ, vec![secret()]));
        doc.statement_mut(index).unwrap().add_principal(role("A"));
        assert!(doc.statement(index).unwrap().has_principal(&role("A")));
        assert!(doc.statement(StatementIndex(7)).is_none());
    }

    #[test]
    fn test_policy_validation() {
        assert!(PolicyDocument::new().validate().is_err());

        let mut doc = PolicyDocument::new();
        doc.add_statement(PolicyStatement::allow(Vec::<String>::new(), vec![secret()]));
        assert!(doc.validate().is_err());

        let mut doc = PolicyDocument::new();
        doc.grant_on_resource(&actions::SECRET_READ, secret());
        assert!(doc.validate().is_ok());
        assert_eq!(doc.to_json()["Version"], POLICY_VERSION);
    }
}
