//! Typed identifiers for declared resources.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};
use uuid::Uuid;

/// Number of hex characters of the path hash appended to a logical id.
const HASH_SUFFIX_LEN: usize = 8;

/// Hierarchical path of a construct inside a stack (`producerRBAC/secret`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstructPath(Vec<String>);

impl ConstructPath {
    /// Creates a top-level path.
    #[must_use]
    pub fn root(id: impl Into<String>) -> Self {
        Self(vec![id.into()])
    }

    /// Returns the path of a child construct.
    #[must_use]
    pub fn child(&self, id: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(id.into());
        Self(segments)
    }

    /// Returns the path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the last segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Derives the template logical id for this path.
    ///
    /// Segments are stripped to alphanumerics and concatenated, then an
    /// 8 character hash of the full path is appended so two paths that
    /// collapse to the same text still get distinct ids.
    #[must_use]
    pub fn logical_id(&self) -> LogicalId {
        let readable: String = self
            .0
            .iter()
            .flat_map(|segment| segment.chars())
            .filter(char::is_ascii_alphanumeric)
            .collect();

        let digest = Sha256::digest(self.to_string().as_bytes());
        let suffix = hex::encode_upper(digest);

        LogicalId(format!("{}{}", readable, &suffix[..HASH_SUFFIX_LEN]))
    }
}

impl Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Template-unique identifier of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Wraps an already-formed logical id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&ConstructPath> for LogicalId {
    fn from(path: &ConstructPath) -> Self {
        path.logical_id()
    }
}

/// Identifier of one synthesis run, stamped into template metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynthesisId(pub Uuid);

impl SynthesisId {
    /// Creates a new time-ordered synthesis id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for SynthesisId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SynthesisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
