//! Tests for tributary-core configuration and credential handling

use std::collections::HashMap;
use std::sync::Arc;
use tributary_core::prelude::*;

// ==================== ConfigOptions Tests ====================

#[test]
fn test_required_names_missing_key() {
    let options = ConfigOptions::new().with("kafka_endpoint", "");

    let err = options.required("kafka_endpoint").unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingConfiguration);
    assert_eq!(err.code().as_str(), "MISSING_CONFIGURATION_EXCEPTION");
    assert!(err.to_string().contains("kafka_endpoint"));

    let err = options.required("auth_type").unwrap_err();
    assert!(err.to_string().contains("auth_type"));
}

#[test]
fn test_options_from_map_and_json() {
    let map = HashMap::from([("auth_type".to_string(), "NO_AUTH".to_string())]);
    let options = ConfigOptions::from(map);
    assert_eq!(options.required("auth_type").unwrap(), "NO_AUTH");

    let options: ConfigOptions =
        serde_json::from_str(r#"{"kafka_endpoint": "b-1:9092", "certificates_temp_dir": " "}"#)
            .unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options.optional("kafka_endpoint"), Some("b-1:9092"));
    assert_eq!(options.optional("certificates_temp_dir"), None);
    assert_eq!(options.get("certificates_temp_dir"), Some(" "));
}

// ==================== Secret Store Tests ====================

#[tokio::test]
async fn test_fetch_secret_map_renders_scalars() {
    let store = InMemorySecretStore::new().with_secret(
        "db",
        r#"{"username": "svc", "password": "pw", "port": 5432, "ssl": true, "unused": null}"#,
    );

    let map = fetch_secret_map(&store, "db").await.unwrap();
    assert_eq!(map.len(), 4);
    assert_eq!(map["port"].expose_secret(), "5432");
    assert_eq!(map["ssl"].expose_secret(), "true");
    assert!(!map.contains_key("unused"));
}

#[tokio::test]
async fn test_fetch_secret_map_rejects_non_object() {
    let store = InMemorySecretStore::new()
        .with_secret("list", "[1, 2]")
        .with_secret("garbage", "not json")
        .with_secret("nested", r#"{"a": {"b": 1}}"#);

    for name in ["list", "garbage", "nested", "missing"] {
        let err = fetch_secret_map(&store, name).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalService, "{name}");
    }
}

#[tokio::test]
async fn test_secret_errors_do_not_echo_payload() {
    let store = InMemorySecretStore::new().with_secret("garbage", "hunter2 is not json");
    let err = fetch_secret_map(&store, "garbage").await.unwrap_err();
    assert!(!err.to_string().contains("hunter2"));
}

// ==================== Credential Provider Tests ====================

#[tokio::test]
async fn test_secret_provider_maps_username_to_user() {
    let store = Arc::new(
        InMemorySecretStore::new()
            .with_json_secret("prod/db", [("username", "svc"), ("password", "pw")]),
    );
    let provider = SecretCredentialProvider::new(store, "prod/db");

    let map = provider.credential_map().await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["user"].expose_secret(), "svc");
    assert_eq!(map["password"].expose_secret(), "pw");
}

#[tokio::test]
async fn test_secret_provider_missing_field() {
    let store = Arc::new(InMemorySecretStore::new().with_json_secret("prod/db", [("username", "svc")]));
    let provider = SecretCredentialProvider::new(store, "prod/db");

    let err = provider.credential_map().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingConfiguration);
    assert!(err.to_string().contains("password"));
}

#[tokio::test]
async fn test_static_provider_extra_pairs() {
    let provider = StaticCredentialProvider::new("admin", "pw").with("role", "reader");
    let map = provider.credential_map().await.unwrap();

    let mut bag = PropertyBag::new().with("user", "placeholder");
    bag.merge_sensitive(&map);
    assert_eq!(bag.get("user"), Some("admin"));
    assert_eq!(bag.get("role"), Some("reader"));
    assert!(!format!("{:?}", bag).contains("\"pw\""));
}
