//! Error types for tributary
//!
//! Every failure surfaced by the connection layer carries a stable,
//! machine-readable [`ErrorCode`] plus a human-readable message:
//! - Caller input errors (unresolvable host, bad credentials, bad configuration)
//! - Collaborator failures (secret store, object store, driver)
//! - Certificate staging failures

use std::fmt;
use thiserror::Error;

/// Result type for tributary operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes reported to the federation caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Input could not be resolved (e.g. unknown host)
    InvalidInput,
    /// The data source rejected the supplied credentials
    InvalidCredentials,
    /// Operation cannot be performed (encoding failure)
    OperationNotSupported,
    /// A required configuration key is absent or blank
    MissingConfiguration,
    /// Authentication mode literal is not recognized
    UnsupportedAuthMode,
    /// Payload encoding has no deserializer
    UnsupportedPayloadFormat,
    /// Certificate material could not be staged locally
    StagingFailure,
    /// Connection could not be acquired for another reason
    Connection,
    /// An external collaborator failed
    InternalService,
}

impl ErrorCode {
    /// Machine-readable representation of the code
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT_EXCEPTION",
            Self::InvalidCredentials => "INVALID_CREDENTIALS_EXCEPTION",
            Self::OperationNotSupported => "OPERATION_NOT_SUPPORTED_EXCEPTION",
            Self::MissingConfiguration => "MISSING_CONFIGURATION_EXCEPTION",
            Self::UnsupportedAuthMode => "UNSUPPORTED_AUTH_MODE_EXCEPTION",
            Self::UnsupportedPayloadFormat => "UNSUPPORTED_PAYLOAD_FORMAT_EXCEPTION",
            Self::StagingFailure => "STAGING_FAILURE_EXCEPTION",
            Self::Connection => "CONNECTION_EXCEPTION",
            Self::InternalService => "INTERNAL_SERVICE_EXCEPTION",
        }
    }

    /// Whether a caller may reasonably retry after this error.
    ///
    /// Advisory only: nothing in this workspace retries on its own.
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection | Self::InternalService)
    }

    /// Whether the error stems from configuration shape and is always fatal
    #[inline]
    pub const fn is_configuration(self) -> bool {
        matches!(
            self,
            Self::MissingConfiguration | Self::UnsupportedAuthMode | Self::UnsupportedPayloadFormat
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for tributary
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Network address could not be resolved
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Authentication was rejected by the data source
    #[error("invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// Operation is not supported
    #[error("unsupported operation: {message}")]
    UnsupportedOperation { message: String },

    /// Required configuration key absent or empty
    #[error("missing required configuration '{key}' in {location}")]
    MissingConfiguration { key: String, location: String },

    /// Authentication mode literal not recognized
    #[error("unsupported authentication mode '{mode}'")]
    UnsupportedAuthMode { mode: String },

    /// Payload format literal not recognized
    #[error("unsupported payload format '{format}'")]
    UnsupportedPayloadFormat { format: String },

    /// Malformed object-store reference or I/O failure while copying certificates
    #[error("certificate staging failed: {message}")]
    Staging {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection acquisition failed
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Secret store, object store or another collaborator failed
    #[error("{service} error: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Get the stable error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput { .. } => ErrorCode::InvalidInput,
            Self::InvalidCredentials { .. } => ErrorCode::InvalidCredentials,
            Self::UnsupportedOperation { .. } => ErrorCode::OperationNotSupported,
            Self::MissingConfiguration { .. } => ErrorCode::MissingConfiguration,
            Self::UnsupportedAuthMode { .. } => ErrorCode::UnsupportedAuthMode,
            Self::UnsupportedPayloadFormat { .. } => ErrorCode::UnsupportedPayloadFormat,
            Self::Staging { .. } => ErrorCode::StagingFailure,
            Self::Connection { .. } => ErrorCode::Connection,
            Self::ExternalService { .. } => ErrorCode::InternalService,
        }
    }

    /// Whether this error is retriable
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.code().is_retriable()
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid credentials error
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// Create a missing configuration error for a connector config key
    pub fn missing_config(key: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            key: key.into(),
            location: "connector configuration".to_string(),
        }
    }

    /// Create a missing configuration error for a field of a named secret
    pub fn missing_secret_field(secret: &str, field: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            key: field.into(),
            location: format!("secret '{}'", secret),
        }
    }

    /// Create a staging error
    pub fn staging(message: impl Into<String>) -> Self {
        Self::Staging {
            message: message.into(),
            source: None,
        }
    }

    /// Create a staging error with source
    pub fn staging_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Staging {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an external service error
    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
            source: None,
        }
    }

    /// Create an external service error with source
    pub fn external_with_source(
        service: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The innermost human-readable message, without the variant prefix
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput { message }
            | Self::InvalidCredentials { message }
            | Self::UnsupportedOperation { message }
            | Self::Staging { message, .. }
            | Self::Connection { message, .. }
            | Self::ExternalService { message, .. } => message.clone(),
            Self::MissingConfiguration { .. }
            | Self::UnsupportedAuthMode { .. }
            | Self::UnsupportedPayloadFormat { .. } => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            Error::invalid_input("x").code().as_str(),
            "INVALID_INPUT_EXCEPTION"
        );
        assert_eq!(
            Error::invalid_credentials("x").code().as_str(),
            "INVALID_CREDENTIALS_EXCEPTION"
        );
        assert_eq!(
            Error::unsupported("x").code().as_str(),
            "OPERATION_NOT_SUPPORTED_EXCEPTION"
        );
        assert_eq!(
            Error::staging("x").code().as_str(),
            "STAGING_FAILURE_EXCEPTION"
        );
    }

    #[test]
    fn test_retriable() {
        assert!(Error::connection("refused").is_retriable());
        assert!(Error::external("secrets manager", "throttled").is_retriable());

        assert!(!Error::invalid_credentials("nope").is_retriable());
        assert!(!Error::missing_config("kafka_endpoint").is_retriable());
    }

    #[test]
    fn test_missing_config_names_key() {
        let err = Error::missing_config("kafka_endpoint");
        assert!(err.to_string().contains("kafka_endpoint"));
        assert!(err.code().is_configuration());

        let err = Error::missing_secret_field("msk-creds", "username");
        assert!(err.to_string().contains("username"));
        assert!(err.to_string().contains("msk-creds"));
    }

    #[test]
    fn test_message_strips_prefix() {
        let err = Error::connection("Connection refused");
        assert_eq!(err.message(), "Connection refused");
        assert_eq!(err.to_string(), "connection error: Connection refused");
    }
}
