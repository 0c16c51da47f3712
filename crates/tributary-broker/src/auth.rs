//! Broker authentication
//!
//! An [`AuthMode`] names one of six mutually exclusive authentication
//! protocols. [`AuthSettings::resolve`] gathers everything that mode needs
//! (secret fields, staged certificates) into one value, and
//! [`AuthSettings::apply`] writes exactly that mode's keys into a
//! [`PropertyBag`]. Resolution finishes before anything is applied, so a
//! failing mode never leaves a half-configured bag behind.
//!
//! | Mode | Protocol | Mechanism | Extra keys |
//! |------|----------|-----------|------------|
//! | `NO_AUTH` | - | - | - |
//! | `TLS_ONLY` | `SSL` | - | client auth, key/keystore/truststore |
//! | `SASL_SSL_IAM` | `SASL_SSL` | `AWS_MSK_IAM` | login module, callback handler |
//! | `SASL_SSL_SCRAM` | `SASL_SSL` | `SCRAM-SHA-512` | login module |
//! | `SASL_SSL_PLAIN` | `SASL_SSL` | `PLAIN` | login module, optional truststore |
//! | `SASL_PLAINTEXT_PLAIN` | `SASL_PLAINTEXT` | `PLAIN` | login module |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{
    certificates_base_dir, props, AUTH_TYPE, CERTIFICATES_S3_REFERENCE, SECRETS_MANAGER_SECRET,
    SECRET_KEYSTORE_PASSWORD, SECRET_PASSWORD, SECRET_SSL_KEY_PASSWORD,
    SECRET_TRUSTSTORE_PASSWORD, SECRET_USERNAME,
};
use crate::staging::{
    CertificateStager, ObjectStoreProvider, ObjectStoreReference, StagedCertificates,
};
use tributary_core::credentials::{fetch_secret_map, secret_field};
use tributary_core::{
    ConfigOptions, CredentialMap, Error, PropertyBag, Result, SecretStore, SensitiveString,
};

/// Login module for IAM authentication
pub const IAM_JAAS_CONFIG: &str = "software.amazon.msk.auth.iam.IAMLoginModule required;";
/// Callback handler for IAM authentication
pub const IAM_CALLBACK_HANDLER: &str = "software.amazon.msk.auth.iam.IAMClientCallbackHandler";
/// Login module for SCRAM authentication
pub const SCRAM_LOGIN_MODULE: &str = "org.apache.kafka.common.security.scram.ScramLoginModule";
/// Login module for PLAIN authentication
pub const PLAIN_LOGIN_MODULE: &str = "org.apache.kafka.common.security.plain.PlainLoginModule";

// ============================================================================
// Protocol and mechanism
// ============================================================================

/// Transport security protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityProtocol {
    /// No encryption, no authentication
    Plaintext,
    /// TLS encryption
    Ssl,
    /// No encryption, SASL authentication
    SaslPlaintext,
    /// TLS encryption, SASL authentication
    SaslSsl,
}

impl SecurityProtocol {
    /// Client property value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
            Self::SaslPlaintext => "SASL_PLAINTEXT",
            Self::SaslSsl => "SASL_SSL",
        }
    }
}

/// SASL mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaslMechanism {
    /// IAM token signing
    #[serde(rename = "AWS_MSK_IAM")]
    AwsMskIam,
    /// SCRAM-SHA-512
    #[serde(rename = "SCRAM-SHA-512")]
    ScramSha512,
    /// Plain username/password
    #[serde(rename = "PLAIN")]
    Plain,
}

impl SaslMechanism {
    /// Client property value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwsMskIam => "AWS_MSK_IAM",
            Self::ScramSha512 => "SCRAM-SHA-512",
            Self::Plain => "PLAIN",
        }
    }
}

// ============================================================================
// Auth mode
// ============================================================================

/// Declared authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// Plaintext, unauthenticated
    NoAuth,
    /// Mutual TLS with staged keystore and truststore
    TlsOnly,
    /// SASL over TLS with IAM tokens
    SaslSslIam,
    /// SASL over TLS with SCRAM-SHA-512
    SaslSslScram,
    /// SASL over TLS with PLAIN, optional custom truststore
    SaslSslPlain,
    /// SASL over plaintext with PLAIN
    SaslPlaintextPlain,
}

impl AuthMode {
    /// All modes
    pub const ALL: [AuthMode; 6] = [
        Self::NoAuth,
        Self::TlsOnly,
        Self::SaslSslIam,
        Self::SaslSslScram,
        Self::SaslSslPlain,
        Self::SaslPlaintextPlain,
    ];

    /// Canonical literal
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoAuth => "NO_AUTH",
            Self::TlsOnly => "TLS_ONLY",
            Self::SaslSslIam => "SASL_SSL_IAM",
            Self::SaslSslScram => "SASL_SSL_SCRAM",
            Self::SaslSslPlain => "SASL_SSL_PLAIN",
            Self::SaslPlaintextPlain => "SASL_PLAINTEXT_PLAIN",
        }
    }

    /// Mode declared under `auth_type`
    pub fn from_options(options: &ConfigOptions) -> Result<Self> {
        options.required(AUTH_TYPE)?.parse()
    }

    /// Security protocol set by the mode, `None` for plaintext
    pub const fn security_protocol(self) -> Option<SecurityProtocol> {
        match self {
            Self::NoAuth => None,
            Self::TlsOnly => Some(SecurityProtocol::Ssl),
            Self::SaslSslIam | Self::SaslSslScram | Self::SaslSslPlain => {
                Some(SecurityProtocol::SaslSsl)
            }
            Self::SaslPlaintextPlain => Some(SecurityProtocol::SaslPlaintext),
        }
    }

    /// SASL mechanism, when the mode uses SASL
    pub const fn sasl_mechanism(self) -> Option<SaslMechanism> {
        match self {
            Self::NoAuth | Self::TlsOnly => None,
            Self::SaslSslIam => Some(SaslMechanism::AwsMskIam),
            Self::SaslSslScram => Some(SaslMechanism::ScramSha512),
            Self::SaslSslPlain | Self::SaslPlaintextPlain => Some(SaslMechanism::Plain),
        }
    }

    /// Whether the mode reads the broker secret
    pub const fn requires_secret(self) -> bool {
        !matches!(self, Self::NoAuth | Self::SaslSslIam)
    }
}

impl FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NO_AUTH" => Ok(Self::NoAuth),
            "TLS_ONLY" | "SSL" => Ok(Self::TlsOnly),
            "SASL_SSL_IAM" | "SASL_SSL_AWS_MSK_IAM" => Ok(Self::SaslSslIam),
            "SASL_SSL_SCRAM" | "SASL_SSL_SCRAM_SHA512" => Ok(Self::SaslSslScram),
            "SASL_SSL_PLAIN" => Ok(Self::SaslSslPlain),
            "SASL_PLAINTEXT_PLAIN" => Ok(Self::SaslPlaintextPlain),
            _ => Err(Error::UnsupportedAuthMode {
                mode: s.trim().to_string(),
            }),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

/// SASL login name and password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslCredentials {
    username: SensitiveString,
    password: SensitiveString,
}

impl SaslCredentials {
    /// Create credentials
    pub fn new(username: impl Into<SensitiveString>, password: impl Into<SensitiveString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Login-module configuration string for `module`
    pub fn jaas_config(&self, module: &str) -> SensitiveString {
        SensitiveString::new(format!(
            "{} required username=\"{}\" password=\"{}\";",
            module,
            jaas_escape(self.username.expose_secret()),
            jaas_escape(self.password.expose_secret())
        ))
    }
}

fn jaas_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A trust store file and its password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustStore {
    /// Location of the truststore file
    pub path: PathBuf,
    /// Truststore password
    pub password: SensitiveString,
}

/// A client key store file and its passwords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStore {
    /// Location of the keystore file
    pub path: PathBuf,
    /// Keystore password
    pub password: SensitiveString,
    /// Private key password
    pub key_password: SensitiveString,
}

/// Everything one auth mode contributes to the client properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSettings {
    /// Plaintext, unauthenticated
    NoAuth,
    /// Mutual TLS
    Tls {
        /// Client identity
        keystore: KeyStore,
        /// Trusted brokers
        truststore: TrustStore,
    },
    /// SASL over TLS with IAM tokens
    Iam,
    /// SASL over TLS with SCRAM-SHA-512
    Scram(SaslCredentials),
    /// SASL over TLS with PLAIN
    SaslSslPlain {
        /// Login credentials
        credentials: SaslCredentials,
        /// Custom truststore, when certificates were configured
        truststore: Option<TrustStore>,
    },
    /// SASL over plaintext with PLAIN
    SaslPlaintextPlain(SaslCredentials),
}

impl AuthSettings {
    /// Mode these settings were resolved for
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::NoAuth => AuthMode::NoAuth,
            Self::Tls { .. } => AuthMode::TlsOnly,
            Self::Iam => AuthMode::SaslSslIam,
            Self::Scram(_) => AuthMode::SaslSslScram,
            Self::SaslSslPlain { .. } => AuthMode::SaslSslPlain,
            Self::SaslPlaintextPlain(_) => AuthMode::SaslPlaintextPlain,
        }
    }

    /// Gather secrets and staged certificates required by `mode`
    pub async fn resolve(
        mode: AuthMode,
        options: &ConfigOptions,
        context: &AuthContext,
    ) -> Result<Self> {
        let settings = match mode {
            AuthMode::NoAuth => Self::NoAuth,
            AuthMode::SaslSslIam => Self::Iam,
            AuthMode::TlsOnly => {
                let staged = context.stage_certificates(options).await?;
                let (name, secret) = context.fetch_secret(options).await?;
                Self::Tls {
                    keystore: KeyStore {
                        path: staged.keystore_path(),
                        password: secret_field(&secret, &name, SECRET_KEYSTORE_PASSWORD)?.clone(),
                        key_password: secret_field(&secret, &name, SECRET_SSL_KEY_PASSWORD)?
                            .clone(),
                    },
                    truststore: TrustStore {
                        path: staged.truststore_path(),
                        password: secret_field(&secret, &name, SECRET_TRUSTSTORE_PASSWORD)?
                            .clone(),
                    },
                }
            }
            AuthMode::SaslSslScram => {
                let (name, secret) = context.fetch_secret(options).await?;
                Self::Scram(sasl_credentials(&secret, &name)?)
            }
            AuthMode::SaslSslPlain => {
                let (name, secret) = context.fetch_secret(options).await?;
                let credentials = sasl_credentials(&secret, &name)?;
                let truststore = match options.optional(CERTIFICATES_S3_REFERENCE) {
                    Some(_) => {
                        let staged = context.stage_certificates(options).await?;
                        Some(TrustStore {
                            path: staged.truststore_path(),
                            password: secret_field(&secret, &name, SECRET_TRUSTSTORE_PASSWORD)?
                                .clone(),
                        })
                    }
                    None => None,
                };
                Self::SaslSslPlain {
                    credentials,
                    truststore,
                }
            }
            AuthMode::SaslPlaintextPlain => {
                let (name, secret) = context.fetch_secret(options).await?;
                Self::SaslPlaintextPlain(sasl_credentials(&secret, &name)?)
            }
        };

        info!(mode = %mode, "Resolved broker authentication");
        Ok(settings)
    }

    /// Write this mode's keys into `properties`
    pub fn apply(&self, properties: &mut PropertyBag) {
        let mode = self.mode();
        if let Some(protocol) = mode.security_protocol() {
            properties.set(props::SECURITY_PROTOCOL, protocol.as_str());
        }
        if let Some(mechanism) = mode.sasl_mechanism() {
            properties.set(props::SASL_MECHANISM, mechanism.as_str());
        }

        match self {
            Self::NoAuth => {}
            Self::Tls {
                keystore,
                truststore,
            } => {
                properties
                    .set(props::SSL_CLIENT_AUTH, "required")
                    .set_sensitive(props::SSL_KEY_PASSWORD, &keystore.key_password)
                    .set(props::SSL_KEYSTORE_LOCATION, keystore.path.display().to_string())
                    .set_sensitive(props::SSL_KEYSTORE_PASSWORD, &keystore.password);
                apply_truststore(properties, truststore);
            }
            Self::Iam => {
                properties
                    .set(props::SASL_JAAS_CONFIG, IAM_JAAS_CONFIG)
                    .set(props::SASL_CLIENT_CALLBACK_HANDLER_CLASS, IAM_CALLBACK_HANDLER);
            }
            Self::Scram(credentials) => {
                properties.set_sensitive(
                    props::SASL_JAAS_CONFIG,
                    &credentials.jaas_config(SCRAM_LOGIN_MODULE),
                );
            }
            Self::SaslSslPlain {
                credentials,
                truststore,
            } => {
                if let Some(truststore) = truststore {
                    apply_truststore(properties, truststore);
                }
                properties.set_sensitive(
                    props::SASL_JAAS_CONFIG,
                    &credentials.jaas_config(PLAIN_LOGIN_MODULE),
                );
            }
            Self::SaslPlaintextPlain(credentials) => {
                properties.set_sensitive(
                    props::SASL_JAAS_CONFIG,
                    &credentials.jaas_config(PLAIN_LOGIN_MODULE),
                );
            }
        }
    }
}

fn apply_truststore(properties: &mut PropertyBag, truststore: &TrustStore) {
    properties
        .set(props::SSL_TRUSTSTORE_LOCATION, truststore.path.display().to_string())
        .set_sensitive(props::SSL_TRUSTSTORE_PASSWORD, &truststore.password);
}

fn sasl_credentials(secret: &CredentialMap, name: &str) -> Result<SaslCredentials> {
    Ok(SaslCredentials::new(
        secret_field(secret, name, SECRET_USERNAME)?.clone(),
        secret_field(secret, name, SECRET_PASSWORD)?.clone(),
    ))
}

// ============================================================================
// Collaborators
// ============================================================================

/// Secret store and certificate stager used while resolving a mode
#[derive(Clone)]
pub struct AuthContext {
    secrets: Arc<dyn SecretStore>,
    stager: CertificateStager,
}

impl AuthContext {
    /// Create a context over the given collaborators
    pub fn new(secrets: Arc<dyn SecretStore>, objects: Arc<dyn ObjectStoreProvider>) -> Self {
        Self {
            secrets,
            stager: CertificateStager::new(objects),
        }
    }

    async fn fetch_secret(&self, options: &ConfigOptions) -> Result<(String, CredentialMap)> {
        let name = options.required(SECRETS_MANAGER_SECRET)?;
        let secret = fetch_secret_map(self.secrets.as_ref(), name).await?;
        Ok((name.to_string(), secret))
    }

    async fn stage_certificates(&self, options: &ConfigOptions) -> Result<StagedCertificates> {
        let reference = ObjectStoreReference::parse(options.required(CERTIFICATES_S3_REFERENCE)?)?;
        let base_dir = certificates_base_dir(options);
        debug!(reference = %reference, base_dir = %base_dir.display(), "Staging certificates");
        self.stager.stage(&reference, &base_dir).await
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::ErrorCode;

    #[test]
    fn test_parse_modes() {
        for mode in AuthMode::ALL {
            assert_eq!(mode.as_str().parse::<AuthMode>().unwrap(), mode);
        }
        assert_eq!(" sasl_ssl_scram ".parse::<AuthMode>().unwrap(), AuthMode::SaslSslScram);
    }

    #[test]
    fn test_parse_legacy_aliases() {
        assert_eq!(
            "SASL_SSL_AWS_MSK_IAM".parse::<AuthMode>().unwrap(),
            AuthMode::SaslSslIam
        );
        assert_eq!(
            "sasl_ssl_scram_sha512".parse::<AuthMode>().unwrap(),
            AuthMode::SaslSslScram
        );
        assert_eq!("ssl".parse::<AuthMode>().unwrap(), AuthMode::TlsOnly);
    }

    #[test]
    fn test_parse_unknown_mode_is_fatal() {
        let err = "KERBEROS".parse::<AuthMode>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedAuthMode);
        assert!(err.to_string().contains("KERBEROS"));

        let err = "".parse::<AuthMode>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedAuthMode);
    }

    #[test]
    fn test_jaas_config_embeds_credentials() {
        let credentials = SaslCredentials::new("alice", "s3cr3t");
        assert_eq!(
            credentials.jaas_config(SCRAM_LOGIN_MODULE).expose_secret(),
            "org.apache.kafka.common.security.scram.ScramLoginModule required \
             username=\"alice\" password=\"s3cr3t\";"
        );
    }

    #[test]
    fn test_jaas_config_escapes_quotes() {
        let credentials = SaslCredentials::new("al\"ice", "back\\slash");
        assert_eq!(
            credentials.jaas_config(PLAIN_LOGIN_MODULE).expose_secret(),
            "org.apache.kafka.common.security.plain.PlainLoginModule required \
             username=\"al\\\"ice\" password=\"back\\\\slash\";"
        );
    }

    #[test]
    fn test_apply_iam() {
        let mut properties = PropertyBag::new();
        AuthSettings::Iam.apply(&mut properties);

        assert_eq!(properties.get(props::SECURITY_PROTOCOL), Some("SASL_SSL"));
        assert_eq!(properties.get(props::SASL_MECHANISM), Some("AWS_MSK_IAM"));
        assert_eq!(properties.get(props::SASL_JAAS_CONFIG), Some(IAM_JAAS_CONFIG));
        assert_eq!(
            properties.get(props::SASL_CLIENT_CALLBACK_HANDLER_CLASS),
            Some(IAM_CALLBACK_HANDLER)
        );
        assert_eq!(properties.len(), 4);
    }

    #[test]
    fn test_apply_no_auth_sets_nothing() {
        let mut properties = PropertyBag::new();
        AuthSettings::NoAuth.apply(&mut properties);
        assert!(properties.is_empty());
    }

    #[test]
    fn test_settings_debug_redacts() {
        let settings = AuthSettings::Scram(SaslCredentials::new("alice", "s3cr3t"));
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("alice"));
    }
}
