//! Credential providers and secret stores
//!
//! Two collaborator seams feed secrets into the connection layer:
//! - [`CredentialProvider`]: on-demand credential map merged into driver properties
//! - [`SecretStore`]: resolves a named secret to a JSON-encoded key/value object
//!
//! In-memory implementations are provided for local use and tests; the
//! `aws` feature adds an AWS Secrets Manager backed store.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::SensitiveString;

/// Credential key/value pairs, sorted by key
pub type CredentialMap = BTreeMap<String, SensitiveString>;

/// Connection-property name drivers expect for the login name
pub const USER_PROPERTY: &str = "user";
/// Connection-property name drivers expect for the password
pub const PASSWORD_PROPERTY: &str = "password";

/// Secret JSON field holding the login name
pub const SECRET_USERNAME_FIELD: &str = "username";
/// Secret JSON field holding the password
pub const SECRET_PASSWORD_FIELD: &str = "password";

/// Supplies credentials on demand
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Credential key/value pairs to merge into connection properties
    async fn credential_map(&self) -> Result<CredentialMap>;
}

/// Resolves named secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Raw secret string (a JSON object for every secret used here)
    async fn get_secret(&self, name: &str) -> Result<SensitiveString>;
}

/// Fixed credentials
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: CredentialMap,
}

impl StaticCredentialProvider {
    /// Create a provider holding `user` and `password`
    pub fn new(user: impl Into<String>, password: impl Into<SensitiveString>) -> Self {
        Self::default()
            .with(USER_PROPERTY, SensitiveString::new(user))
            .with(PASSWORD_PROPERTY, password)
    }

    /// Add an arbitrary credential pair
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SensitiveString>) -> Self {
        self.credentials.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credential_map(&self) -> Result<CredentialMap> {
        Ok(self.credentials.clone())
    }
}

/// Secret store backed by a map, for local runs and tests
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    secrets: HashMap<String, SensitiveString>,
}

impl InMemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret holding a raw string
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<SensitiveString>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    /// Add a secret holding a JSON object built from `fields`
    pub fn with_json_secret<'a>(
        self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let object: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        self.with_secret(name, serde_json::Value::Object(object).to_string())
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret(&self, name: &str) -> Result<SensitiveString> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| Error::external("secret store", format!("secret '{}' not found", name)))
    }
}

/// Fetch a named secret and decode its JSON object into a credential map.
///
/// String members are kept verbatim; numbers and booleans are rendered as
/// text. Nested values and non-object payloads are rejected.
pub async fn fetch_secret_map(store: &dyn SecretStore, name: &str) -> Result<CredentialMap> {
    let raw = store.get_secret(name).await?;
    let parsed: serde_json::Value = serde_json::from_str(raw.expose_secret()).map_err(|e| {
        // serde_json errors never echo the input, only position information
        Error::external_with_source("secret store", format!("secret '{}' is not valid JSON", name), e)
    })?;

    let object = match parsed {
        serde_json::Value::Object(object) => object,
        _ => {
            return Err(Error::external(
                "secret store",
                format!("secret '{}' is not a JSON object", name),
            ))
        }
    };

    let mut map = CredentialMap::new();
    for (key, value) in object {
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => continue,
            _ => {
                return Err(Error::external(
                    "secret store",
                    format!("secret '{}' field '{}' is not a scalar", name, key),
                ))
            }
        };
        map.insert(key, SensitiveString::new(text));
    }

    debug!(secret = name, fields = map.len(), "Fetched secret");
    Ok(map)
}

/// Look up a required field of a fetched secret
pub fn secret_field<'a>(
    map: &'a CredentialMap,
    secret: &str,
    field: &str,
) -> Result<&'a SensitiveString> {
    map.get(field)
        .ok_or_else(|| Error::missing_secret_field(secret, field))
}

/// Credentials read from a secret holding `username` and `password`
#[derive(Clone)]
pub struct SecretCredentialProvider {
    store: Arc<dyn SecretStore>,
    secret_name: String,
}

impl SecretCredentialProvider {
    /// Create a provider reading `secret_name` from `store`
    pub fn new(store: Arc<dyn SecretStore>, secret_name: impl Into<String>) -> Self {
        Self {
            store,
            secret_name: secret_name.into(),
        }
    }

    /// Name of the backing secret
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }
}

impl std::fmt::Debug for SecretCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCredentialProvider")
            .field("secret_name", &self.secret_name)
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for SecretCredentialProvider {
    async fn credential_map(&self) -> Result<CredentialMap> {
        let secret = fetch_secret_map(self.store.as_ref(), &self.secret_name).await?;
        let user = secret_field(&secret, &self.secret_name, SECRET_USERNAME_FIELD)?;
        let password = secret_field(&secret, &self.secret_name, SECRET_PASSWORD_FIELD)?;

        let mut map = CredentialMap::new();
        map.insert(USER_PROPERTY.to_string(), user.clone());
        map.insert(PASSWORD_PROPERTY.to_string(), password.clone());
        Ok(map)
    }
}

#[cfg(feature = "aws")]
pub use self::aws::AwsSecretsManagerStore;

#[cfg(feature = "aws")]
mod aws {
    use super::*;
    use aws_sdk_secretsmanager::error::DisplayErrorContext;
    use aws_sdk_secretsmanager::Client;

    /// Secret store backed by AWS Secrets Manager
    #[derive(Debug, Clone)]
    pub struct AwsSecretsManagerStore {
        client: Client,
    }

    impl AwsSecretsManagerStore {
        /// Wrap an existing client
        pub fn new(client: Client) -> Self {
            Self { client }
        }

        /// Build a client from the default credential chain
        pub async fn from_env() -> Self {
            let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            Self::new(Client::new(&config))
        }
    }

    #[async_trait]
    impl SecretStore for AwsSecretsManagerStore {
        async fn get_secret(&self, name: &str) -> Result<SensitiveString> {
            let output = self
                .client
                .get_secret_value()
                .secret_id(name)
                .send()
                .await
                .map_err(|e| {
                    Error::external(
                        "secrets manager",
                        format!("failed to read secret '{}': {}", name, DisplayErrorContext(&e)),
                    )
                })?;

            output
                .secret_string()
                .map(SensitiveString::from)
                .ok_or_else(|| {
                    Error::external(
                        "secrets manager",
                        format!("secret '{}' has no string value", name),
                    )
                })
        }
    }
}
