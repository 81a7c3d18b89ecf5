//! Principals that policies grant access to.

use rbac_core::{intrinsic, LogicalId};
use serde_json::Value;
use std::fmt;

/// Key under which a principal is listed in a statement's `Principal` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrincipalKind {
    /// Account, role or user ARNs.
    Aws,
    /// Service principals such as `lambda.amazonaws.com`.
    Service,
}

impl PrincipalKind {
    /// Returns the JSON key for this kind.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::Service => "Service",
        }
    }
}

/// An identity that can be granted access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Principal {
    /// A role declared in the same stack.
    Role(LogicalId),
    /// A service principal.
    Service(String),
    /// An existing principal identified by ARN.
    Arn(String),
    /// The root of an account.
    Account(String),
    /// The root of the account the template is applied in.
    AccountRoot,
}

impl Principal {
    /// Creates a principal for a role declared in the same stack.
    #[must_use]
    pub fn role(id: LogicalId) -> Self {
        Self::Role(id)
    }

    /// Creates a service principal.
    #[must_use]
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service(name.into())
    }

    /// Returns the statement key this principal is listed under.
    #[must_use]
    pub const fn kind(&self) -> PrincipalKind {
        match self {
            Self::Service(_) => PrincipalKind::Service,
            Self::Role(_) | Self::Arn(_) | Self::Account(_) | Self::AccountRoot => PrincipalKind::Aws,
        }
    }

    /// Returns the declared role behind this principal, if any.
    #[must_use]
    pub fn role_id(&self) -> Option<&LogicalId> {
        match self {
            Self::Role(id) => Some(id),
            _ => None,
        }
    }

    /// Renders the principal as it appears in a policy.
    #[must_use]
    pub fn to_policy_value(&self) -> Value {
        match self {
            Self::Role(id) => intrinsic::get_att(id, "Arn"),
            Self::Service(name) => Value::from(name.clone()),
            Self::Arn(arn) => Value::from(arn.clone()),
            Self::Account(account) => intrinsic::join(vec![
                Value::from("arn:"),
                intrinsic::pseudo("Partition"),
                Value::from(format!(":iam::{}:root", account)),
            ]),
            Self::AccountRoot => intrinsic::account_root_arn(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(id) => write!(f, "role:{}", id),
            Self::Service(name) => write!(f, "service:{}", name),
            Self::Arn(arn) => write!(f, "arn:{}", arn.trim_start_matches("arn:")),
            Self::Account(account) => write!(f, "account:{}", account),
            Self::AccountRoot => write!(f, "account:current"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_principal_kinds() {
        assert_eq!(Principal::service("lambda.amazonaws.com").kind(), PrincipalKind::Service);
        assert_eq!(Principal::role(LogicalId::new("RoleA")).kind(), PrincipalKind::Aws);
        assert_eq!(Principal::Account("123456789012".to_string()).kind(), PrincipalKind::Aws);
        assert_eq!(Principal::AccountRoot.kind(), PrincipalKind::Aws);
        assert_eq!(PrincipalKind::Aws.key(), "AWS");
    }

    #[test]
    fn test_role_principal_renders_arn_attribute() {
        let principal = Principal::role(LogicalId::new("producerRoleABCD1234"));
        assert_eq!(
            principal.to_policy_value(),
            json!({"Fn::GetAtt": ["producerRoleABCD1234", "Arn"]})
        );
        assert_eq!(principal.role_id().map(LogicalId::as_str), Some("producerRoleABCD1234"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Principal::service("lambda.amazonaws.com").to_string(), "service:lambda.amazonaws.com");
        assert_eq!(
            Principal::Arn("arn:aws:iam::123456789012:role/x".to_string()).to_string(),
            "arn:aws:iam::123456789012:role/x"
        );
    }
}
