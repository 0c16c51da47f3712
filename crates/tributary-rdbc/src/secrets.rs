//! Secret placeholder resolution for connection strings.
//!
//! Connection-string templates name their secret with a `${...}` token, e.g.
//! `mysql://host:3306/db?${prod/mysql-creds}`. Before a pool is built the
//! token is stripped and the credential provider's key/value pairs are merged
//! into the connection properties instead, so the secret never travels
//! inside the URL.
//!
//! Only `${` + one or more of `[A-Za-z0-9:/_+=.@-]` + `}` is a placeholder.
//! Anything else that merely looks similar is left untouched.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use tributary_core::{CredentialProvider, PropertyBag, Result};

static SECRET_PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{[A-Za-z0-9:/_+=.@-]+\}")
        .expect("secret placeholder regex pattern is invalid - this is a bug")
});

/// Whether the string still contains a well-formed placeholder
pub fn contains_placeholder(value: &str) -> bool {
    SECRET_PLACEHOLDER_REGEX.is_match(value)
}

/// Remove every well-formed placeholder.
///
/// Removal repeats until no placeholder remains, so a nested form such as
/// `${a${b}}` cannot reassemble into a token after one pass.
pub fn strip_placeholders(template: &str) -> Cow<'_, str> {
    let mut current = SECRET_PLACEHOLDER_REGEX.replace_all(template, "");
    while SECRET_PLACEHOLDER_REGEX.is_match(&current) {
        current = Cow::Owned(
            SECRET_PLACEHOLDER_REGEX
                .replace_all(&current, "")
                .into_owned(),
        );
    }
    current
}

/// Resolve a connection-string template.
///
/// With a credential provider: every placeholder is stripped from the
/// returned string and the provider's credentials are merged into
/// `properties` in place (last write wins). Without one, the template is
/// returned unmodified and `properties` is left alone. Zero placeholders is a
/// valid input.
pub async fn resolve_connection_string(
    template: &str,
    credentials: Option<&dyn CredentialProvider>,
    properties: &mut PropertyBag,
) -> Result<String> {
    let Some(provider) = credentials else {
        return Ok(template.to_string());
    };

    let derived = strip_placeholders(template).into_owned();
    let credential_map = provider.credential_map().await?;
    properties.merge_sensitive(&credential_map);

    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::credentials::StaticCredentialProvider;

    #[test]
    fn test_strip_single_placeholder() {
        assert_eq!(
            strip_placeholders("mysql://host:3306/db?${prod/mysql}"),
            "mysql://host:3306/db?"
        );
    }

    #[test]
    fn test_strip_all_occurrences() {
        let stripped = strip_placeholders("a${x}b${y:z}c${arn:aws:secret/p+q=r.s@t-u_v}d");
        assert_eq!(stripped, "abcd");
        assert!(!contains_placeholder(&stripped));
    }

    #[test]
    fn test_strip_leaves_malformed_tokens() {
        for malformed in ["${}", "${bad token}", "${semi;colon}", "$ {x}", "{x}", "${x"] {
            assert_eq!(strip_placeholders(malformed), malformed);
        }
    }

    #[test]
    fn test_strip_nested_reaches_fixpoint() {
        let stripped = strip_placeholders("host/${a${b}}/db");
        assert!(!contains_placeholder(&stripped));
        assert_eq!(stripped, "host//db");
    }

    #[test]
    fn test_strip_without_placeholders_borrows() {
        assert!(matches!(
            strip_placeholders("postgres://localhost/db"),
            Cow::Borrowed(_)
        ));
    }

    #[tokio::test]
    async fn test_resolve_with_provider() {
        let provider = StaticCredentialProvider::new("admin", "hunter2");
        let mut properties = PropertyBag::new().with("sslmode", "require");

        let resolved = resolve_connection_string(
            "postgres://host/db?${prod-db}",
            Some(&provider),
            &mut properties,
        )
        .await
        .unwrap();

        assert_eq!(resolved, "postgres://host/db?");
        assert_eq!(properties.get("user"), Some("admin"));
        assert_eq!(properties.get("password"), Some("hunter2"));
        assert_eq!(properties.get("sslmode"), Some("require"));
    }

    #[tokio::test]
    async fn test_resolve_without_provider() {
        let mut properties = PropertyBag::new();
        let resolved =
            resolve_connection_string("postgres://host/db?${prod-db}", None, &mut properties)
                .await
                .unwrap();

        assert_eq!(resolved, "postgres://host/db?${prod-db}");
        assert!(properties.is_empty());
    }
}
