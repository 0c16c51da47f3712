//! Untyped connector configuration
//!
//! Connectors are configured through an environment-variable-like
//! string-to-string map. Accessors distinguish required keys (absent or
//! blank is a fatal [`Error::MissingConfiguration`]) from optional ones.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// String-to-string connector configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigOptions {
    values: HashMap<String, String>,
}

impl ConfigOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the process environment
    pub fn from_env() -> Self {
        std::env::vars().collect()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw lookup, blank values included
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of a required key.
    ///
    /// Fails with [`Error::MissingConfiguration`] naming `key` when the key is
    /// absent or its value is blank.
    pub fn required(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value.as_str()),
            _ => Err(Error::missing_config(key)),
        }
    }

    /// Value of an optional key; blank values count as absent
    pub fn optional(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, String>> for ConfigOptions {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigOptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_required_present() {
        let options = ConfigOptions::new().with("kafka_endpoint", "b-1:9092");
        assert_eq!(options.required("kafka_endpoint").unwrap(), "b-1:9092");
    }

    #[test]
    fn test_required_missing_or_blank() {
        let options = ConfigOptions::new().with("auth_type", "  ");

        for key in ["auth_type", "kafka_endpoint"] {
            let err = options.required(key).unwrap_err();
            assert_eq!(err.code(), ErrorCode::MissingConfiguration);
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn test_optional_filters_blank() {
        let options = ConfigOptions::new()
            .with("certificates_s3_reference", "")
            .with("other", "value");

        assert_eq!(options.optional("certificates_s3_reference"), None);
        assert_eq!(options.optional("missing"), None);
        assert_eq!(options.optional("other"), Some("value"));
        assert_eq!(options.get("certificates_s3_reference"), Some(""));
    }

    #[test]
    fn test_deserialize_transparent() {
        let options: ConfigOptions =
            serde_json::from_str(r#"{"auth_type": "NO_AUTH"}"#).unwrap();
        assert_eq!(options.required("auth_type").unwrap(), "NO_AUTH");
    }
}
