//! Common types for tributary
//!
//! - [`SensitiveString`]: a secret value that never prints itself
//! - [`PropertyBag`]: ordered string properties handed to drivers and broker clients

use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A wrapper around `SecretString` for passwords, tokens and secret payloads.
///
/// `Debug`, `Display` and `Serialize` all render a redaction marker; the value
/// is only reachable through [`SensitiveString::expose_secret`].
///
/// ```rust
/// use tributary_core::SensitiveString;
///
/// let secret = SensitiveString::new("hunter2");
/// assert_eq!(format!("{:?}", secret), "[REDACTED]");
/// assert_eq!(secret.expose_secret(), "hunter2");
/// ```
#[derive(Clone)]
pub struct SensitiveString(SecretString);

impl SensitiveString {
    /// Create a new sensitive string from any string-like value
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Expose the secret value.
    ///
    /// Use only where the raw value must be handed to a client library.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SensitiveString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SensitiveString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq for SensitiveString {
    fn eq(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl Eq for SensitiveString {}

impl Serialize for SensitiveString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***REDACTED***")
    }
}

impl<'de> Deserialize<'de> for SensitiveString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

/// Key fragments whose values are masked when a [`PropertyBag`] is printed
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &["password", "secret", "jaas", "token", "credential"];

/// Whether a property key holds secret material
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| key.contains(fragment))
}

/// Ordered mapping of string properties.
///
/// Insertion order is kept; writing an existing key replaces its value in
/// place (last write wins). `Debug` masks values of sensitive keys.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    entries: IndexMap<String, String>,
}

impl PropertyBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Builder-style [`PropertyBag::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property from a secret, exposing it into the bag
    pub fn set_sensitive(&mut self, key: impl Into<String>, value: &SensitiveString) -> &mut Self {
        self.set(key, value.expose_secret())
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a property, returning its value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Key/value pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge secret pairs into the bag (last write wins)
    pub fn merge_sensitive<'a, I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (&'a String, &'a SensitiveString)>,
    {
        for (key, value) in pairs {
            self.set_sensitive(key.clone(), value);
        }
    }

    /// Consume the bag into a plain map for a client library
    pub fn into_map(self) -> IndexMap<String, String> {
        self.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bag = Self::new();
        bag.extend(iter);
        bag
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for PropertyBag {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| {
                let shown = if is_sensitive_key(k) { "[REDACTED]" } else { v.as_str() };
                (k, shown)
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_string_redacted() {
        let secret = SensitiveString::new("my-secret-password");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose_secret(), "my-secret-password");
    }

    #[test]
    fn test_sensitive_string_serde() {
        let secret = SensitiveString::new("my-secret-password");
        let serialized = serde_json::to_string(&secret).unwrap();
        assert_eq!(serialized, "\"***REDACTED***\"");

        let secret: SensitiveString = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(secret.expose_secret(), "abc");
    }

    #[test]
    fn test_property_bag_last_write_wins() {
        let mut bag = PropertyBag::new();
        bag.set("a", "1").set("b", "2").set("a", "3");

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("a"), Some("3"));
        assert_eq!(bag.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_property_bag_debug_masks_secrets() {
        let bag = PropertyBag::new()
            .with("bootstrap.servers", "b-1:9092")
            .with("ssl.keystore.password", "changeit")
            .with("sasl.jaas.config", "x required password=\"p\";");

        let debug = format!("{:?}", bag);
        assert!(debug.contains("b-1:9092"));
        assert!(!debug.contains("changeit"));
        assert!(!debug.contains("password=\\\"p\\\""));
    }

    #[test]
    fn test_merge_sensitive() {
        let mut creds = std::collections::BTreeMap::new();
        creds.insert("user".to_string(), SensitiveString::new("admin"));
        creds.insert("password".to_string(), SensitiveString::new("pw"));

        let mut bag = PropertyBag::new().with("user", "someone-else");
        bag.merge_sensitive(&creds);

        assert_eq!(bag.get("user"), Some("admin"));
        assert_eq!(bag.get("password"), Some("pw"));
    }
}
