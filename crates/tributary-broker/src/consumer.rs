//! Consumer property assembly
//!
//! [`ConsumerConfigBuilder`] turns connector options into the complete
//! property set handed to the broker consumer:
//!
//! 1. base properties (bootstrap servers, a fresh group id, offset policy,
//!    fetch ceilings, string key deserializer)
//! 2. the declared auth mode's keys
//! 3. the value deserializer for the payload format
//!
//! Nothing is returned unless every step succeeds.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{AuthContext, AuthMode, AuthSettings};
use crate::config::{props, KAFKA_ENDPOINT};
use crate::format::{PayloadFormat, STRING_DESERIALIZER};
use crate::staging::ObjectStoreProvider;
use tributary_core::{ConfigOptions, PropertyBag, Result, SecretStore};

/// Records returned by a single poll
pub const MAX_POLL_RECORDS: u32 = 10_000;
/// Per-partition fetch ceiling in bytes
pub const MAX_PARTITION_FETCH_BYTES: u32 = 1_048_576;

/// Mode-independent consumer properties.
///
/// Fails with `MissingConfiguration` when `kafka_endpoint` is absent or
/// blank. Every call generates a new consumer group id.
pub fn base_properties(options: &ConfigOptions) -> Result<PropertyBag> {
    let bootstrap = options.required(KAFKA_ENDPOINT)?;
    let group_id = Uuid::new_v4().to_string();
    debug!(group_id = %group_id, "Generated consumer group id");

    let mut properties = PropertyBag::new();
    properties
        .set(props::BOOTSTRAP_SERVERS, bootstrap)
        .set(props::GROUP_ID, group_id)
        .set(props::EXCLUDE_INTERNAL_TOPICS, "true")
        .set(props::ENABLE_AUTO_COMMIT, "false")
        .set(props::AUTO_OFFSET_RESET, "earliest")
        .set(props::MAX_POLL_RECORDS, MAX_POLL_RECORDS.to_string())
        .set(
            props::MAX_PARTITION_FETCH_BYTES,
            MAX_PARTITION_FETCH_BYTES.to_string(),
        )
        .set(props::KEY_DESERIALIZER, STRING_DESERIALIZER);
    Ok(properties)
}

/// Builds complete consumer property sets
#[derive(Debug, Clone)]
pub struct ConsumerConfigBuilder {
    context: AuthContext,
}

impl ConsumerConfigBuilder {
    /// Create a builder over the secret store and certificate object stores
    pub fn new(secrets: Arc<dyn SecretStore>, objects: Arc<dyn ObjectStoreProvider>) -> Self {
        Self {
            context: AuthContext::new(secrets, objects),
        }
    }

    /// Base and authentication properties, without a value deserializer
    pub async fn properties(&self, options: &ConfigOptions) -> Result<PropertyBag> {
        let mut properties = base_properties(options)?;
        let mode = AuthMode::from_options(options)?;
        let settings = AuthSettings::resolve(mode, options, &self.context).await?;
        settings.apply(&mut properties);
        Ok(properties)
    }

    /// Complete properties for consuming `format` payloads
    pub async fn build(&self, options: &ConfigOptions, format: PayloadFormat) -> Result<PropertyBag> {
        let mut properties = self.properties(options).await?;
        format.apply_value_deserializer(&mut properties);
        debug!(
            format = %format,
            properties = properties.len(),
            "Built consumer configuration"
        );
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::ErrorCode;

    #[test]
    fn test_base_properties() {
        let options = ConfigOptions::new().with(KAFKA_ENDPOINT, "b-1:9098,b-2:9098");
        let properties = base_properties(&options).unwrap();

        assert_eq!(properties.get(props::BOOTSTRAP_SERVERS), Some("b-1:9098,b-2:9098"));
        assert_eq!(properties.get(props::EXCLUDE_INTERNAL_TOPICS), Some("true"));
        assert_eq!(properties.get(props::ENABLE_AUTO_COMMIT), Some("false"));
        assert_eq!(properties.get(props::AUTO_OFFSET_RESET), Some("earliest"));
        assert_eq!(properties.get(props::MAX_POLL_RECORDS), Some("10000"));
        assert_eq!(properties.get(props::MAX_PARTITION_FETCH_BYTES), Some("1048576"));
        assert_eq!(properties.get(props::KEY_DESERIALIZER), Some(STRING_DESERIALIZER));
        assert_eq!(properties.len(), 8);
    }

    #[test]
    fn test_group_id_is_fresh() {
        let options = ConfigOptions::new().with(KAFKA_ENDPOINT, "b-1:9092");
        let first = base_properties(&options).unwrap();
        let second = base_properties(&options).unwrap();

        let first_id = first.get(props::GROUP_ID).unwrap();
        assert!(Uuid::parse_str(first_id).is_ok());
        assert_ne!(Some(first_id), second.get(props::GROUP_ID));
    }

    #[test]
    fn test_missing_bootstrap() {
        let err = base_properties(&ConfigOptions::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingConfiguration);
        assert!(err.to_string().contains(KAFKA_ENDPOINT));
    }
}
