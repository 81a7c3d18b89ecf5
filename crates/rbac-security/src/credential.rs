//! Credential generation settings.
//!
//! Cache passwords are generated by the credential store when the template
//! is applied. Locally we only describe how to generate them and how to
//! reference the result, so no password ever appears in a template.

use rbac_config::CredentialProfile;
use rbac_core::{intrinsic, LogicalId};
use serde_json::{json, Value};

/// Field of the secret string holding the cache user name.
pub const USERNAME_FIELD: &str = "username";

/// Field of the secret string the generated password is written to.
pub const PASSWORD_FIELD: &str = "password";

/// How a credential's secret string is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSpec {
    username: String,
    profile: CredentialProfile,
}

impl CredentialSpec {
    /// Creates the generation settings for `username` under `profile`.
    #[must_use]
    pub fn new(username: impl Into<String>, profile: CredentialProfile) -> Self {
        Self {
            username: username.into(),
            profile,
        }
    }

    /// Returns the user name stored alongside the password.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the credential profile.
    #[must_use]
    pub const fn profile(&self) -> CredentialProfile {
        self.profile
    }

    /// Characters the generated password must not contain.
    #[must_use]
    pub const fn excluded_characters(&self) -> &'static str {
        self.profile.excluded_characters()
    }

    /// Fixed part of the secret string, `{"username": <name>}`.
    #[must_use]
    pub fn secret_string_template(&self) -> String {
        json!({ USERNAME_FIELD: self.username }).to_string()
    }

    /// Renders the `GenerateSecretString` block.
    #[must_use]
    pub fn to_generate_json(&self) -> Value {
        json!({
            "SecretStringTemplate": self.secret_string_template(),
            "GenerateStringKey": PASSWORD_FIELD,
            "ExcludeCharacters": self.excluded_characters(),
        })
    }
}

/// Dynamic reference resolving to the generated password of `secret` at apply time.
#[must_use]
pub fn password_reference(secret: &LogicalId) -> Value {
    intrinsic::join(vec![
        Value::from("{{resolve:secretsmanager:"),
        intrinsic::reference(secret),
        Value::from(format!(":SecretString:{}::}}}}", PASSWORD_FIELD)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbac_config::{GENERALIZED_EXCLUDED_CHARACTERS, LEGACY_EXCLUDED_CHARACTERS};

    #[test]
    fn test_secret_string_template() {
        let spec = CredentialSpec::new("producer", CredentialProfile::default());
        assert_eq!(spec.secret_string_template(), r#"{"username":"producer"}"#);
        assert_eq!(spec.username(), "producer");
    }

    #[test]
    fn test_generate_block_uses_profile() {
        let generalized = CredentialSpec::new("producer", CredentialProfile::Generalized).to_generate_json();
        assert_eq!(generalized["GenerateStringKey"], "password");
        assert_eq!(generalized["ExcludeCharacters"], GENERALIZED_EXCLUDED_CHARACTERS);

        let legacy = CredentialSpec::new("producer", CredentialProfile::Legacy);
        assert_eq!(legacy.excluded_characters(), LEGACY_EXCLUDED_CHARACTERS);
        assert_eq!(legacy.profile(), CredentialProfile::Legacy);
    }

    #[test]
    fn test_password_reference() {
        let reference = password_reference(&LogicalId::new("producerRBACsecretABCD1234"));
        assert_eq!(
            reference,
            json!({"Fn::Join": ["", [
                "{{resolve:secretsmanager:",
                {"Ref": "producerRBACsecretABCD1234"},
                ":SecretString:password::}}"
            ]]})
        );
    }
}
