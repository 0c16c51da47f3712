//! # tributary-rdbc
//!
//! Relational connection establishment for federated query connectors.
//!
//! A connector hands this crate a catalog's connection string and driver
//! properties; the crate resolves secret placeholders, builds one connection
//! pool per factory, and returns live connections with driver failures
//! classified into stable error codes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tributary_rdbc::prelude::*;
//!
//! let config = ConnectionConfig::new(
//!     "lakehouse",
//!     "postgres",
//!     "postgres://db.internal:5432/sales?${prod/sales-db}",
//! );
//! let factory = PooledConnectionFactory::new(
//!     config,
//!     PropertyBag::new().with("sslmode", "require"),
//!     DatabaseEngine::PostgreSql.connection_info(),
//!     driver,
//! );
//!
//! let provider = SecretCredentialProvider::new(secret_store, "prod/sales-db");
//! let conn = factory.get_connection(Some(&provider)).await?;
//! assert!(conn.is_valid().await);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod connection;
pub mod factory;
pub mod pool;
pub mod secrets;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::connection::{
        redact_url, Connection, ConnectionConfig, ConnectionInfo, DatabaseEngine, Driver,
    };
    pub use crate::factory::{
        classify_acquisition_error, encode_value, ConnectionFactory, PooledConnectionFactory,
    };
    pub use crate::pool::{
        ConnectionPool, DriverPoolProvider, PoolConfig, PoolProvider, PoolStats, PooledConnection,
        SimpleConnectionPool,
    };
    pub use crate::secrets::{contains_placeholder, resolve_connection_string, strip_placeholders};

    pub use tributary_core::prelude::*;
}

pub use factory::{ConnectionFactory, PooledConnectionFactory};
pub use tributary_core::{Error, ErrorCode, Result};
