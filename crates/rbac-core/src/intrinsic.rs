//! Template intrinsic functions.
//!
//! Values that are only known once the template is applied are expressed
//! with these JSON shapes instead of literals.

use crate::LogicalId;
use serde_json::{json, Value};

/// `{"Ref": id}`
#[must_use]
pub fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

/// `{"Ref": "AWS::<name>"}` for pseudo parameters such as `Partition` or `AccountId`.
#[must_use]
pub fn pseudo(name: &str) -> Value {
    json!({ "Ref": format!("AWS::{}", name) })
}

/// `{"Fn::GetAtt": [id, attribute]}`
#[must_use]
pub fn get_att(id: &LogicalId, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id.as_str(), attribute] })
}

/// `{"Fn::Join": ["", parts]}`
#[must_use]
pub fn join(parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": ["", parts] })
}

/// ARN of an AWS managed policy in the current partition.
#[must_use]
pub fn managed_policy_arn(name: &str) -> Value {
    join(vec![
        Value::from("arn:"),
        pseudo("Partition"),
        Value::from(format!(":iam::aws:policy/{}", name)),
    ])
}

/// ARN of the root principal of the current account.
#[must_use]
pub fn account_root_arn() -> Value {
    join(vec![
        Value::from("arn:"),
        pseudo("Partition"),
        Value::from(":iam::"),
        pseudo("AccountId"),
        Value::from(":root"),
    ])
}

/// Returns every logical id referenced by `Ref` or `Fn::GetAtt` inside `value`.
///
/// Pseudo parameters (`AWS::...`) are skipped.
#[must_use]
pub fn referenced_ids(value: &Value) -> Vec<LogicalId> {
    let mut ids = Vec::new();
    collect_references(value, &mut ids);
    ids.sort();
    ids.dedup();
    ids
}

fn collect_references(value: &Value, ids: &mut Vec<LogicalId>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with("AWS::") {
                    ids.push(LogicalId::new(target.clone()));
                }
            }
            if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(target)) = args.first() {
                    ids.push(LogicalId::new(target.clone()));
                }
            }
            for nested in map.values() {
                collect_references(nested, ids);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, ids);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shapes() {
        let id = LogicalId::new("Secret1");
        assert_eq!(reference(&id), json!({"Ref": "Secret1"}));
        assert_eq!(get_att(&id, "Arn"), json!({"Fn::GetAtt": ["Secret1", "Arn"]}));
        assert_eq!(pseudo("Partition"), json!({"Ref": "AWS::Partition"}));
    }

    #[test]
    fn test_managed_policy_arn() {
        let arn = managed_policy_arn("service-role/AWSLambdaBasicExecutionRole");
        assert_eq!(
            arn,
            json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                ":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"
            ]]})
        );
    }

    #[test]
    fn test_referenced_ids() {
        let value = json!({
            "SecretId": {"Ref": "SecretB"},
            "Roles": [{"Ref": "RoleA"}, {"Fn::GetAtt": ["KeyC", "Arn"]}],
            "Arn": account_root_arn(),
            "Again": {"Ref": "RoleA"}
        });
        let ids = referenced_ids(&value);
        let names: Vec<&str> = ids.iter().map(LogicalId::as_str).collect();
        assert_eq!(names, ["KeyC", "RoleA", "SecretB"]);
    }
}
