//! IAM policy model.
//!
//! Statements and documents follow the cloud provider's policy JSON. Values
//! that are only known at apply time (resource ARNs, role ARNs) are carried
//! as intrinsic-function JSON.

mod policy;
mod principal;

pub use policy::*;
pub use principal::*;

/// Well-known action names.
pub mod actions {
    /// Read secret metadata.
    pub const SECRET_DESCRIBE: &str = "secretsmanager:DescribeSecret";
    /// Read the secret value.
    pub const SECRET_GET_VALUE: &str = "secretsmanager:GetSecretValue";
    /// Everything a reader of a credential needs.
    pub const SECRET_READ: [&str; 2] = [SECRET_DESCRIBE, SECRET_GET_VALUE];
    /// Decrypt with a key.
    pub const KMS_DECRYPT: &str = "kms:Decrypt";
    /// Full key administration, granted to the account root.
    pub const KMS_ALL: &str = "kms:*";
    /// Assume a role.
    pub const STS_ASSUME_ROLE: &str = "sts:AssumeRole";
}
