//! # tributary-core
//!
//! Shared building blocks for the tributary connection-establishment layer.
//!
//! ## Contents
//!
//! - **Errors**: one taxonomy with stable machine-readable codes
//! - **Configuration**: string-to-string connector options with required/optional accessors
//! - **Secrets**: redacting [`SensitiveString`], credential providers and secret stores
//! - **Properties**: ordered, redacting [`PropertyBag`] handed to drivers and broker clients
//!
//! ## Feature Flags
//!
//! - `aws` - AWS Secrets Manager backed [`SecretStore`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::ConfigOptions;
    pub use crate::credentials::{
        fetch_secret_map, secret_field, CredentialMap, CredentialProvider, InMemorySecretStore,
        SecretCredentialProvider, SecretStore, StaticCredentialProvider,
    };
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::types::{PropertyBag, SensitiveString};
}

pub use config::ConfigOptions;
pub use credentials::{CredentialMap, CredentialProvider, SecretStore};
pub use error::{Error, ErrorCode, Result};
pub use types::{PropertyBag, SensitiveString};
