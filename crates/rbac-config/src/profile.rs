//! Credential and engine profiles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters excluded from generated passwords by the legacy profile.
pub const LEGACY_EXCLUDED_CHARACTERS: &str = ",\"/@";

/// Characters excluded from generated passwords by the generalized profile.
pub const GENERALIZED_EXCLUDED_CHARACTERS: &str = "@%*()_+=`~{}|[]\\:\";'?,./";

/// Character exclusion profile for generated cache passwords.
///
/// The cache protocol treats some characters as syntax during AUTH, so a
/// generated password must avoid them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialProfile {
    /// Comma, double quote, slash and at-sign only.
    Legacy,
    /// Superset of the legacy profile; also excludes brackets, quotes,
    /// colon, semicolon, backslash, question mark, period and friends.
    #[default]
    Generalized,
}

impl CredentialProfile {
    /// Returns the characters a generated password must not contain.
    #[must_use]
    pub const fn excluded_characters(&self) -> &'static str {
        match self {
            Self::Legacy => LEGACY_EXCLUDED_CHARACTERS,
            Self::Generalized => GENERALIZED_EXCLUDED_CHARACTERS,
        }
    }

    /// Returns true if `c` may appear in a generated password.
    #[must_use]
    pub fn allows(&self, c: char) -> bool {
        !self.excluded_characters().contains(c)
    }
}

impl fmt::Display for CredentialProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Generalized => write!(f, "generalized"),
        }
    }
}

/// Cache engine the users and replication group are declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheEngine {
    /// Redis OSS compatible engine.
    #[default]
    Redis,
}

impl CacheEngine {
    /// Engine name as the user and user group resources expect it.
    #[must_use]
    pub const fn user_engine_name(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
        }
    }

    /// Engine name as the replication group resource expects it.
    #[must_use]
    pub const fn cluster_engine_name(&self) -> &'static str {
        match self {
            Self::Redis => "Redis",
        }
    }

    /// Default listener port.
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Redis => 6379,
        }
    }
}

impl fmt::Display for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_engine_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generalized_profile_supersedes_legacy() {
        for c in LEGACY_EXCLUDED_CHARACTERS.chars() {
            assert!(
                GENERALIZED_EXCLUDED_CHARACTERS.contains(c),
                "generalized profile must also exclude {c:?}"
            );
        }
    }

    #[test]
    fn test_profile_allows() {
        let profile = CredentialProfile::Generalized;
        for c in ['%', '(', ')', '[', ']', ':', ';', '\\', '?', '.', ',', '"', '/', '@'] {
            assert!(!profile.allows(c), "{c:?} should be excluded");
        }
        assert!(profile.allows('a'));
        assert!(profile.allows('Z'));
        assert!(profile.allows('7'));

        assert!(CredentialProfile::Legacy.allows('%'));
        assert!(!CredentialProfile::Legacy.allows('@'));
    }

    #[test]
    fn test_default_profile() {
        assert_eq!(CredentialProfile::default(), CredentialProfile::Generalized);
        assert_eq!(CredentialProfile::default().to_string(), "generalized");
    }

    #[test]
    fn test_engine_names() {
        assert_eq!(CacheEngine::Redis.user_engine_name(), "redis");
        assert_eq!(CacheEngine::Redis.cluster_engine_name(), "Redis");
        assert_eq!(CacheEngine::Redis.default_port(), 6379);
    }
}
