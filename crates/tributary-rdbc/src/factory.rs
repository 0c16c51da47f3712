//! Pooled connection factory
//!
//! A [`PooledConnectionFactory`] owns at most one pool for its whole
//! lifetime. The pool is built lazily by the first caller of
//! [`ConnectionFactory::get_connection`]; concurrent first callers wait for
//! that single construction and then all borrow from the same pool.
//! Independent factories never contend with each other.
//!
//! Failures while borrowing are classified into the stable error taxonomy:
//!
//! | Driver message contains | Error |
//! |-------------------------|-------|
//! | `Name or service not known` | [`Error::InvalidInput`] |
//! | `Incorrect username or password was specified.` | [`Error::InvalidCredentials`] |
//! | anything else | [`Error::Connection`] |

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::connection::{redact_url, ConnectionConfig, ConnectionInfo, Driver};
use crate::pool::{ConnectionPool, DriverPoolProvider, PoolConfig, PoolProvider, PooledConnection};
use crate::secrets::resolve_connection_string;
use tributary_core::{CredentialProvider, Error, PropertyBag, Result};

/// Driver message fragment for an unresolvable host
pub const UNKNOWN_HOST_MARKER: &str = "Name or service not known";
/// Driver message fragment for rejected credentials
pub const BAD_CREDENTIALS_MARKER: &str = "Incorrect username or password was specified.";

/// Idle-connection floor of every factory-built pool
pub const MIN_IDLE_CONNECTIONS: usize = 1;

/// Hands out live connections
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Borrow a connection, resolving secrets with `credentials` when present
    async fn get_connection(
        &self,
        credentials: Option<&dyn CredentialProvider>,
    ) -> Result<PooledConnection>;
}

/// Factory that lazily builds and then reuses exactly one pool
pub struct PooledConnectionFactory {
    config: ConnectionConfig,
    info: ConnectionInfo,
    properties: PropertyBag,
    provider: Arc<dyn PoolProvider>,
    max_pool_size: usize,
    acquire_timeout: Duration,
    pool: OnceCell<Arc<dyn ConnectionPool>>,
}

impl PooledConnectionFactory {
    /// Create a factory whose pool opens connections through `driver`
    pub fn new(
        config: ConnectionConfig,
        properties: PropertyBag,
        info: ConnectionInfo,
        driver: Arc<dyn Driver>,
    ) -> Self {
        Self::with_pool_provider(config, properties, info, Arc::new(DriverPoolProvider::new(driver)))
    }

    /// Create a factory that delegates pool construction to `provider`
    pub fn with_pool_provider(
        config: ConnectionConfig,
        properties: PropertyBag,
        info: ConnectionInfo,
        provider: Arc<dyn PoolProvider>,
    ) -> Self {
        let defaults = PoolConfig::default();
        Self {
            config,
            info,
            properties,
            provider,
            max_pool_size: defaults.max_size,
            acquire_timeout: defaults.acquire_timeout,
            pool: OnceCell::new(),
        }
    }

    /// Set maximum pool size
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set how long a borrow waits on an exhausted pool
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Connection configuration
    pub fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Driver identifier and default port
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// Whether the pool has been built
    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    async fn pool(
        &self,
        credentials: Option<&dyn CredentialProvider>,
    ) -> Result<&Arc<dyn ConnectionPool>> {
        self.pool
            .get_or_try_init(|| async {
                let mut properties = self.properties.clone();
                let url = resolve_connection_string(
                    self.config.connection_string(),
                    credentials,
                    &mut properties,
                )
                .await?;

                let pool_config = PoolConfig::new(self.info.driver_name(), url)
                    .with_properties(properties)
                    .with_min_idle(MIN_IDLE_CONNECTIONS)
                    .with_max_size(self.max_pool_size)
                    .with_acquire_timeout(self.acquire_timeout);

                info!(
                    catalog = %self.config.catalog(),
                    driver = %self.info.driver_name(),
                    url = %redact_url(&pool_config.url),
                    "Creating connection pool"
                );
                self.provider.create_pool(pool_config).await
            })
            .await
    }
}

impl std::fmt::Debug for PooledConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnectionFactory")
            .field("config", &self.config)
            .field("info", &self.info)
            .field("properties", &self.properties)
            .field("initialized", &self.pool.initialized())
            .finish()
    }
}

#[async_trait]
impl ConnectionFactory for PooledConnectionFactory {
    async fn get_connection(
        &self,
        credentials: Option<&dyn CredentialProvider>,
    ) -> Result<PooledConnection> {
        let pool = self.pool(credentials).await?;
        pool.get().await.map_err(|e| {
            let classified = classify_acquisition_error(e);
            debug!(
                catalog = %self.config.catalog(),
                code = %classified.code(),
                "Connection acquisition failed"
            );
            classified
        })
    }
}

/// Translate a low-level acquisition failure into the stable taxonomy.
///
/// Total over all inputs: an unrecognized failure still yields
/// [`Error::Connection`] with the original message.
pub fn classify_acquisition_error(err: Error) -> Error {
    let message = err.message();
    if message.contains(UNKNOWN_HOST_MARKER) {
        Error::invalid_input(message)
    } else if message.contains(BAD_CREDENTIALS_MARKER) {
        Error::invalid_credentials(message)
    } else {
        match err {
            Error::Connection { .. } => err,
            other => Error::connection_with_source(message, other),
        }
    }
}

/// Percent-encode a value as UTF-8 `application/x-www-form-urlencoded`.
///
/// Input that is not valid UTF-8 cannot be encoded and is reported as
/// [`Error::UnsupportedOperation`].
pub fn encode_value(value: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(value)
        .map_err(|e| Error::unsupported(format!("unsupported encoding: {}", e)))?;
    Ok(url::form_urlencoded::byte_serialize(text.as_bytes()).collect())
}
