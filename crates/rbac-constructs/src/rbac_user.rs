//! The credentialed cache user construct.
//!
//! An [`RbacUser`] owns one generated credential and one cache user that
//! authenticates with it. The credential is encrypted under either a shared
//! key or a key created for this user, and can be made readable by any
//! number of principals.

use crate::provider::{CacheUserProps, CacheUserRef, CredentialRef, KeyRef, Provisioner, StatementRef};
use rbac_config::{CacheEngine, CredentialProfile};
use rbac_core::{intrinsic, ConstructPath, LogicalId, RbacResult};
use rbac_security::{actions, AccessString, CredentialSpec, PolicyStatement, Principal};
use tracing::{debug, info};

/// Prefix of the alias given to a per-user key.
pub const KEY_ALIAS_PREFIX: &str = "redisRbacUser/";

/// Construct properties.
#[derive(Debug, Clone)]
pub struct RbacUserProps {
    pub user_name: String,
    pub user_id: String,
    /// Rules for the cache user. Defaults to [`rbac_security::DEFAULT_ACCESS_STRING`].
    pub access_string: Option<String>,
    /// Shared key. A dedicated key is created when absent.
    pub encryption_key: Option<KeyRef>,
    /// Principals granted read on the credential at construction.
    pub principals: Vec<Principal>,
    pub credential_profile: CredentialProfile,
    pub engine: CacheEngine,
    /// Rotation setting for a dedicated key. On unless turned off.
    pub key_rotation: bool,
}

impl Default for RbacUserProps {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            user_id: String::new(),
            access_string: None,
            encryption_key: None,
            principals: Vec::new(),
            credential_profile: CredentialProfile::default(),
            engine: CacheEngine::default(),
            key_rotation: true,
        }
    }
}

impl RbacUserProps {
    /// Properties for `user_name` / `user_id` with every option at its default.
    #[must_use]
    pub fn new(user_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_access_string(mut self, access_string: impl Into<String>) -> Self {
        self.access_string = Some(access_string.into());
        self
    }

    #[must_use]
    pub fn with_encryption_key(mut self, key: KeyRef) -> Self {
        self.encryption_key = Some(key);
        self
    }

    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principals.push(principal);
        self
    }

    #[must_use]
    pub fn with_credential_profile(mut self, profile: CredentialProfile) -> Self {
        self.credential_profile = profile;
        self
    }
}

/// A cache user bound to a generated credential.
#[derive(Debug, Clone)]
pub struct RbacUser {
    path: ConstructPath,
    user_name: String,
    user_id: String,
    access_string: AccessString,
    encryption_key: KeyRef,
    owns_key: bool,
    secret: CredentialRef,
    cache_user: CacheUserRef,
    grant_statement: Option<StatementRef>,
}

impl RbacUser {
    /// Declares the key (unless shared), the credential and the cache user.
    ///
    /// The access string is validated before anything is declared, so a
    /// malformed string leaves the provider untouched.
    pub fn new<P>(provider: &mut P, scope: &ConstructPath, construct_id: &str, props: RbacUserProps) -> RbacResult<Self>
    where
        P: Provisioner + ?Sized,
    {
        let access_string = match &props.access_string {
            Some(raw) => AccessString::parse(raw.clone())?,
            None => AccessString::default(),
        };

        let path = scope.child(construct_id);

        let (encryption_key, owns_key) = match props.encryption_key {
            Some(key) => (key, false),
            None => {
                let alias = format!("{}{}", KEY_ALIAS_PREFIX, props.user_name);
                let key = provider.create_key(&path.child("kmsForSecret"), Some(alias.as_str()), props.key_rotation)?;
                (key, true)
            }
        };

        let spec = CredentialSpec::new(props.user_name.clone(), props.credential_profile);
        let secret = provider.create_credential(&path.child("secret"), &spec, &encryption_key)?;

        let cache_user = provider.create_user(
            &path.child("redisuser"),
            &CacheUserProps {
                engine: props.engine,
                user_name: props.user_name.clone(),
                user_id: props.user_id.clone(),
                access_string: access_string.clone(),
                credential: secret.clone(),
            },
        )?;
        provider.add_dependency(&cache_user.id, &secret.secret)?;

        info!(
            user_id = %props.user_id,
            user_name = %props.user_name,
            access_string = %access_string,
            shared_key = !owns_key,
            "Declared RBAC user"
        );

        let mut user = Self {
            path,
            user_name: props.user_name,
            user_id: props.user_id,
            access_string,
            encryption_key,
            owns_key,
            secret,
            cache_user,
            grant_statement: None,
        };

        for principal in &props.principals {
            user.grant_read_secret(provider, principal)?;
        }

        Ok(user)
    }

    /// Allows `principal` to read the credential and decrypt it.
    ///
    /// The first grant creates a statement on the credential's resource
    /// policy; later grants add principals to that same statement.
    ///
    /// An undeclared role is rejected before either policy changes.
    pub fn grant_read_secret<P>(&mut self, provider: &mut P, principal: &Principal) -> RbacResult<()>
    where
        P: Provisioner + ?Sized,
    {
        provider.grant_read(principal, &self.secret)?;

        match self.grant_statement {
            Some(handle) => {
                if provider.statement_mut(handle)?.add_principal(principal.clone()) {
                    debug!(user_id = %self.user_id, principal = %principal, "Added principal to grant statement");
                }
            }
            None => {
                let statement = PolicyStatement::allow(actions::SECRET_READ, vec![intrinsic::reference(&self.secret.secret)])
                    .with_principal(principal.clone());
                self.grant_statement = Some(provider.attach_statement(&self.secret, statement)?);
                debug!(user_id = %self.user_id, principal = %principal, "Created grant statement");
            }
        }

        provider.grant_decrypt(principal, &self.encryption_key)?;

        info!(user_id = %self.user_id, principal = %principal, "Granted read on credential");
        Ok(())
    }

    /// Construct path of this user.
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    #[must_use]
    pub fn secret(&self) -> &CredentialRef {
        &self.secret
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn encryption_key(&self) -> &KeyRef {
        &self.encryption_key
    }

    /// True if the key was created for this user rather than shared.
    #[must_use]
    pub const fn owns_key(&self) -> bool {
        self.owns_key
    }

    #[must_use]
    pub fn access_string(&self) -> &AccessString {
        &self.access_string
    }

    #[must_use]
    pub fn cache_user(&self) -> &CacheUserRef {
        &self.cache_user
    }

    /// The resource policy statement, once a grant has been made.
    #[must_use]
    pub const fn grant_statement(&self) -> Option<StatementRef> {
        self.grant_statement
    }

    /// Resources this construct declared: dedicated key and alias, secret, cache user.
    #[must_use]
    pub fn resource_ids(&self) -> Vec<LogicalId> {
        let mut ids = Vec::with_capacity(4);
        if self.owns_key {
            ids.push(self.encryption_key.key.clone());
            ids.extend(self.encryption_key.alias.clone());
        }
        ids.push(self.secret.secret.clone());
        ids.push(self.cache_user.id.clone());
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CredentialStore, EncryptionKeyService};
    use crate::stack::Stack;

    fn scope() -> ConstructPath {
        ConstructPath::root("RedisRbacStack")
    }

    fn role(stack: &mut Stack, name: &str) -> Principal {
        stack
            .create_role(&ConstructPath::root(name), Principal::service("lambda.amazonaws.com"), "", &[])
            .unwrap()
            .principal()
    }

    #[test]
    fn test_default_access_string() {
        let mut stack = Stack::new("Test", "test");
        let user = RbacUser::new(&mut stack, &scope(), "groupDefaultUserRBAC", RbacUserProps::new("default", "groupdefaultuser")).unwrap();

        assert_eq!(user.access_string().as_str(), "off +get ~keys*");
        assert_eq!(user.user_name(), "default");
        assert_eq!(user.user_id(), "groupdefaultuser");
        assert!(user.grant_statement().is_none());
        assert!(user.owns_key());
    }

    #[test]
    fn test_dedicated_key_alias() {
        let mut stack = Stack::new("Test", "test");
        let user = RbacUser::new(&mut stack, &scope(), "producerRBAC", RbacUserProps::new("producer", "producer")).unwrap();

        let alias = user.encryption_key().alias.clone().unwrap();
        assert_eq!(
            stack.properties(&alias).unwrap()["AliasName"],
            "alias/redisRbacUser/producer"
        );
        assert_eq!(
            stack.properties(&user.encryption_key().key).unwrap()["EnableKeyRotation"],
            true
        );
        assert_eq!(user.resource_ids().len(), 4);
    }

    #[test]
    fn test_shared_key_is_not_owned() {
        let mut stack = Stack::new("Test", "test");
        let shared = stack.create_key(&ConstructPath::root("sharedKey"), None, true).unwrap();
        let props = RbacUserProps::new("producer", "producer").with_encryption_key(shared.clone());
        let user = RbacUser::new(&mut stack, &scope(), "producerRBAC", props).unwrap();

        assert_eq!(user.encryption_key(), &shared);
        assert!(!user.owns_key());
        assert_eq!(user.resource_ids(), vec![user.secret().secret.clone(), user.cache_user().id.clone()]);
    }

    #[test]
    fn test_credential_precedes_cache_user() {
        let mut stack = Stack::new("Test", "test");
        let user = RbacUser::new(&mut stack, &scope(), "producerRBAC", RbacUserProps::new("producer", "producer")).unwrap();
        assert!(stack.graph().depends_on(&user.cache_user().id, &user.secret().secret));
        assert!(stack.graph().precedes(&user.encryption_key().key, &user.cache_user().id));
    }

    #[test]
    fn test_invalid_access_string_declares_nothing() {
        let mut stack = Stack::new("Test", "test");
        let props = RbacUserProps::new("producer", "producer").with_access_string("on ~* +SET $$");
        let err = RbacUser::new(&mut stack, &scope(), "producerRBAC", props).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ACCESS_STRING");
        assert_eq!(stack.resource_count(), 0);

        let props = RbacUserProps::new("producer", "producer").with_access_string("");
        assert!(RbacUser::new(&mut stack, &scope(), "producerRBAC", props).is_err());
    }

    #[test]
    fn test_repeated_grants_share_one_statement() {
        let mut stack = Stack::new("Test", "test");
        let a = role(&mut stack, "roleA");
        let b = role(&mut stack, "roleB");
        let mut user = RbacUser::new(&mut stack, &scope(), "producerRBAC", RbacUserProps::new("producer", "producer")).unwrap();

        user.grant_read_secret(&mut stack, &a).unwrap();
        let first = user.grant_statement().unwrap();
        user.grant_read_secret(&mut stack, &b).unwrap();
        user.grant_read_secret(&mut stack, &a).unwrap();

        assert_eq!(user.grant_statement(), Some(first));
        assert_eq!(stack.statement(first).unwrap().principals(), &[a.clone(), b.clone()]);

        let policy = stack.resource_policy_of(user.secret()).unwrap();
        assert_eq!(stack.document(&policy).unwrap().statements().len(), 1);

        let key_policy = stack.document(&user.encryption_key().key).unwrap();
        let decrypt = &key_policy.statements()[1];
        assert_eq!(decrypt.principals(), &[a, b]);
    }

    #[test]
    fn test_struct_update_keeps_rotation_on() {
        let mut stack = Stack::new("Test", "test");
        let props = RbacUserProps {
            user_name: "producer".into(),
            user_id: "producer".into(),
            ..RbacUserProps::default()
        };
        assert!(props.key_rotation);

        let user = RbacUser::new(&mut stack, &scope(), "producerRBAC", props).unwrap();
        assert_eq!(
            stack.properties(&user.encryption_key().key).unwrap()["EnableKeyRotation"],
            true
        );
    }

    #[test]
    fn test_grant_to_undeclared_role_changes_nothing() {
        let mut stack = Stack::new("Test", "test");
        let reader = role(&mut stack, "producerRole");
        let mut user = RbacUser::new(&mut stack, &scope(), "producerRBAC", RbacUserProps::new("producer", "producer")).unwrap();
        let ghost = Principal::role(LogicalId::new("ghostRole"));

        let err = user.grant_read_secret(&mut stack, &ghost).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(user.grant_statement().is_none());
        assert!(stack.resource_policy_of(user.secret()).is_none());
        assert_eq!(stack.document(&user.encryption_key().key).unwrap().statements().len(), 1);
        assert!(stack.synthesize().is_ok());

        user.grant_read_secret(&mut stack, &reader).unwrap();
        let count = stack.resource_count();
        assert!(user.grant_read_secret(&mut stack, &ghost).is_err());

        let handle = user.grant_statement().unwrap();
        assert_eq!(stack.statement(handle).unwrap().principals(), &[reader.clone()]);
        let decrypt = &stack.document(&user.encryption_key().key).unwrap().statements()[1];
        assert_eq!(decrypt.principals(), &[reader]);
        assert_eq!(stack.resource_count(), count);
        assert!(stack.synthesize().is_ok());
    }

    #[test]
    fn test_initial_principals_are_granted() {
        let mut stack = Stack::new("Test", "test");
        let reader = role(&mut stack, "producerRole");
        let props = RbacUserProps::new("producer", "producer")
            .with_access_string("on ~* -@all +SET")
            .with_principal(reader.clone());
        let user = RbacUser::new(&mut stack, &scope(), "producerRBAC", props).unwrap();

        let handle = user.grant_statement().unwrap();
        assert!(stack.statement(handle).unwrap().has_principal(&reader));
        assert!(stack.can_read(&reader, user.secret()));
        assert_eq!(user.access_string().as_str(), "on ~* -@all +SET");
        assert!(stack.identity_policy_of(reader.role_id().unwrap()).is_some());
        assert!(!stack.contains(&LogicalId::new("nope")));
    }
}
