//! # tributary-broker
//!
//! Authenticated consumer configuration for streaming broker clusters.
//!
//! Given untyped connector options, this crate produces the property set a
//! broker consumer needs: bootstrap and offset settings, one of six
//! authentication modes (with TLS material staged from object storage), and
//! the value deserializer for the topic's payload format.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tributary_broker::prelude::*;
//!
//! let options = ConfigOptions::from_env();
//! let builder = ConsumerConfigBuilder::new(
//!     Arc::new(AwsSecretsManagerStore::from_env().await),
//!     Arc::new(S3ObjectStoreProvider::new()),
//! );
//! let properties = builder.build(&options, PayloadFormat::Json).await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `s3` - S3-backed certificate staging via `object_store`
//! - `aws` - AWS Secrets Manager secret store

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod consumer;
pub mod format;
pub mod split;
pub mod staging;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{
        AuthContext, AuthMode, AuthSettings, KeyStore, SaslCredentials, SaslMechanism,
        SecurityProtocol, TrustStore,
    };
    pub use crate::consumer::{base_properties, ConsumerConfigBuilder};
    pub use crate::format::PayloadFormat;
    pub use crate::split::SplitDescriptor;
    pub use crate::staging::{
        CertificateStager, ObjectStoreProvider, ObjectStoreReference, S3ObjectStoreProvider,
        StagedCertificates, StaticObjectStoreProvider,
    };
    pub use crate::types::to_arrow_type;

    pub use tributary_core::prelude::*;
}

pub use auth::{AuthMode, AuthSettings};
pub use consumer::ConsumerConfigBuilder;
pub use tributary_core::{Error, ErrorCode, Result};
