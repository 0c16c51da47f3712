//! Connector configuration keys and broker client property names

use std::path::PathBuf;
use tributary_core::ConfigOptions;

// ============================================================================
// Connector configuration keys
// ============================================================================

/// Comma-separated broker bootstrap addresses
pub const KAFKA_ENDPOINT: &str = "kafka_endpoint";
/// Authentication mode literal
pub const AUTH_TYPE: &str = "auth_type";
/// Object-store reference (`s3://bucket/prefix`) holding keystore/truststore files
pub const CERTIFICATES_S3_REFERENCE: &str = "certificates_s3_reference";
/// Name of the secret holding broker credentials
pub const SECRETS_MANAGER_SECRET: &str = "secrets_manager_secret";
/// Base directory for staged certificates (defaults to the OS temp dir)
pub const CERTIFICATES_TEMP_DIR: &str = "certificates_temp_dir";

// ============================================================================
// Secret fields
// ============================================================================

/// SASL login name
pub const SECRET_USERNAME: &str = "username";
/// SASL password
pub const SECRET_PASSWORD: &str = "password";
/// Private key password
pub const SECRET_SSL_KEY_PASSWORD: &str = "ssl_key_password";
/// Keystore password
pub const SECRET_KEYSTORE_PASSWORD: &str = "keystore_password";
/// Truststore password
pub const SECRET_TRUSTSTORE_PASSWORD: &str = "truststore_password";

// ============================================================================
// Staged file names
// ============================================================================

/// Client keystore file expected under the certificate prefix
pub const KEYSTORE_FILE: &str = "kafka.client.keystore.jks";
/// Client truststore file expected under the certificate prefix
pub const TRUSTSTORE_FILE: &str = "kafka.client.truststore.jks";

// ============================================================================
// Broker client property names
// ============================================================================

/// Client property names understood by the broker consumer
#[allow(missing_docs)]
pub mod props {
    pub const BOOTSTRAP_SERVERS: &str = "bootstrap.servers";
    pub const GROUP_ID: &str = "group.id";
    pub const EXCLUDE_INTERNAL_TOPICS: &str = "exclude.internal.topics";
    pub const ENABLE_AUTO_COMMIT: &str = "enable.auto.commit";
    pub const AUTO_OFFSET_RESET: &str = "auto.offset.reset";
    pub const MAX_POLL_RECORDS: &str = "max.poll.records";
    pub const MAX_PARTITION_FETCH_BYTES: &str = "max.partition.fetch.bytes";
    pub const KEY_DESERIALIZER: &str = "key.deserializer";
    pub const VALUE_DESERIALIZER: &str = "value.deserializer";

    pub const SECURITY_PROTOCOL: &str = "security.protocol";
    pub const SSL_CLIENT_AUTH: &str = "ssl.client.auth";
    pub const SSL_KEY_PASSWORD: &str = "ssl.key.password";
    pub const SSL_KEYSTORE_LOCATION: &str = "ssl.keystore.location";
    pub const SSL_KEYSTORE_PASSWORD: &str = "ssl.keystore.password";
    pub const SSL_TRUSTSTORE_LOCATION: &str = "ssl.truststore.location";
    pub const SSL_TRUSTSTORE_PASSWORD: &str = "ssl.truststore.password";

    pub const SASL_MECHANISM: &str = "sasl.mechanism";
    pub const SASL_JAAS_CONFIG: &str = "sasl.jaas.config";
    pub const SASL_CLIENT_CALLBACK_HANDLER_CLASS: &str = "sasl.client.callback.handler.class";

    pub const AVRO_RECORD_TYPE: &str = "avroRecordType";
    pub const PROTOBUF_MESSAGE_TYPE: &str = "protobufMessageType";
}

/// Keys whose presence marks a property bag as carrying security settings
pub const SECURITY_PROPERTY_KEYS: &[&str] = &[
    props::SECURITY_PROTOCOL,
    props::SSL_CLIENT_AUTH,
    props::SSL_KEY_PASSWORD,
    props::SSL_KEYSTORE_LOCATION,
    props::SSL_KEYSTORE_PASSWORD,
    props::SSL_TRUSTSTORE_LOCATION,
    props::SSL_TRUSTSTORE_PASSWORD,
    props::SASL_MECHANISM,
    props::SASL_JAAS_CONFIG,
    props::SASL_CLIENT_CALLBACK_HANDLER_CLASS,
];

/// Base directory for staged certificates
pub fn certificates_base_dir(options: &ConfigOptions) -> PathBuf {
    options
        .optional(CERTIFICATES_TEMP_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certificates_base_dir_default() {
        assert_eq!(certificates_base_dir(&ConfigOptions::new()), std::env::temp_dir());
        assert_eq!(
            certificates_base_dir(&ConfigOptions::new().with(CERTIFICATES_TEMP_DIR, "  ")),
            std::env::temp_dir()
        );
    }

    #[test]
    fn test_certificates_base_dir_override() {
        let options = ConfigOptions::new().with(CERTIFICATES_TEMP_DIR, "/var/run/certs");
        assert_eq!(certificates_base_dir(&options), PathBuf::from("/var/run/certs"));
    }
}
