//! Connection pool for tributary-rdbc
//!
//! - [`ConnectionPool`]: the pool abstraction handed to connection factories
//! - [`SimpleConnectionPool`]: semaphore-bounded pool over a [`Driver`]
//! - [`PoolProvider`]: the seam that constructs pools, one call per factory lifetime
//!
//! Acquisition blocks (asynchronously) while the pool is exhausted, up to
//! the configured acquire timeout.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::connection::{redact_url, Connection, Driver};
use tributary_core::{Error, PropertyBag, Result};

/// Connection pool trait
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Get a connection from the pool
    async fn get(&self) -> Result<PooledConnection>;

    /// Return a connection to the pool, keeping the time it was opened
    async fn return_connection(&self, conn: Box<dyn Connection>, created_at: Instant);

    /// Forget a borrowed connection without returning it
    fn discard_connection(&self);

    /// Get current pool size
    fn size(&self) -> usize;

    /// Get number of idle connections
    fn idle(&self) -> usize;

    /// Get pool statistics
    fn stats(&self) -> PoolStats;

    /// Close all idle connections and refuse further borrows
    async fn close(&self) -> Result<()>;
}

/// A connection borrowed from the pool, returned on drop
pub struct PooledConnection {
    conn: Option<Box<dyn Connection>>,
    pool: Arc<dyn ConnectionPool>,
    created_at: Instant,
}

impl PooledConnection {
    /// Wrap a connection borrowed from `pool`, opened at `created_at`
    pub fn new(
        conn: Box<dyn Connection>,
        pool: Arc<dyn ConnectionPool>,
        created_at: Instant,
    ) -> Self {
        Self {
            conn: Some(conn),
            pool,
            created_at,
        }
    }

    /// When the underlying connection was opened
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get the underlying connection
    pub fn connection(&self) -> &(dyn Connection + 'static) {
        self.conn
            .as_ref()
            .expect("connection already returned")
            .as_ref()
    }
}

impl std::ops::Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection()
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = self.pool.clone();
                let created_at = self.created_at;
                handle.spawn(async move {
                    pool.return_connection(conn, created_at).await;
                });
            }
            // No runtime left to hand the connection back on
            Err(_) => self.pool.discard_connection(),
        }
    }
}

/// Pool configuration
#[derive(Clone)]
pub struct PoolConfig {
    /// Driver identifier
    pub driver_name: String,
    /// Resolved connection URL (no secret placeholders)
    pub url: String,
    /// Driver properties, credentials included
    pub properties: PropertyBag,
    /// Connections opened eagerly and kept as the idle floor
    pub min_idle: usize,
    /// Maximum pool size
    pub max_size: usize,
    /// Maximum time to wait for a connection
    pub acquire_timeout: Duration,
    /// Maximum connection lifetime (for recycling)
    pub max_lifetime: Duration,
    /// Idle timeout (connections idle longer are closed)
    pub idle_timeout: Duration,
    /// Whether to test connections on borrow
    pub test_on_borrow: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            driver_name: String::new(),
            url: String::new(),
            properties: PropertyBag::new(),
            min_idle: 1,
            max_size: 10,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(1800), // 30 minutes
            idle_timeout: Duration::from_secs(600),  // 10 minutes
            test_on_borrow: true,
        }
    }
}

impl PoolConfig {
    /// Create pool config for a driver and resolved URL
    pub fn new(driver_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            driver_name: driver_name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set driver properties
    pub fn with_properties(mut self, properties: PropertyBag) -> Self {
        self.properties = properties;
        self
    }

    /// Set the idle floor
    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// Set maximum pool size
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Set acquire timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set maximum connection lifetime
    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Enable/disable test on borrow
    pub fn with_test_on_borrow(mut self, test: bool) -> Self {
        self.test_on_borrow = test;
        self
    }
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("driver_name", &self.driver_name)
            .field("url", &redact_url(&self.url))
            .field("properties", &self.properties)
            .field("min_idle", &self.min_idle)
            .field("max_size", &self.max_size)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("max_lifetime", &self.max_lifetime)
            .field("idle_timeout", &self.idle_timeout)
            .field("test_on_borrow", &self.test_on_borrow)
            .finish()
    }
}

/// Pool statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of connections created
    pub connections_created: u64,
    /// Total number of connections closed
    pub connections_closed: u64,
    /// Total number of connection acquisitions
    pub acquisitions: u64,
    /// Number of times the acquire timeout elapsed
    pub exhausted_count: u64,
    /// Number of failed attempts to open a connection
    pub connect_failures: u64,
}

#[derive(Debug, Default)]
struct AtomicPoolStats {
    connections_created: AtomicU64,
    connections_closed: AtomicU64,
    acquisitions: AtomicU64,
    exhausted_count: AtomicU64,
    connect_failures: AtomicU64,
}

impl AtomicPoolStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            exhausted_count: self.exhausted_count.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
        }
    }
}

struct PoolEntry {
    conn: Box<dyn Connection>,
    created_at: Instant,
    last_used: Instant,
}

/// Semaphore-bounded connection pool over a [`Driver`].
///
/// Idle connections are kept LIFO. `min_idle` connections are opened when the
/// pool is built; failures there are logged and left to surface on the first
/// borrow, where the factory classifies them.
pub struct SimpleConnectionPool {
    config: PoolConfig,
    driver: Arc<dyn Driver>,
    idle: Mutex<Vec<PoolEntry>>,
    semaphore: Semaphore,
    total_connections: AtomicUsize,
    idle_connections: AtomicUsize,
    stats: AtomicPoolStats,
    shutdown: AtomicBool,
    self_ref: Weak<Self>,
}

impl SimpleConnectionPool {
    /// Build the pool and open the `min_idle` floor
    pub async fn new(config: PoolConfig, driver: Arc<dyn Driver>) -> Result<Arc<Self>> {
        if config.max_size == 0 {
            return Err(Error::connection("pool max_size must be at least 1"));
        }

        let pool = Arc::new_cyclic(|self_ref| Self {
            semaphore: Semaphore::new(config.max_size),
            idle: Mutex::new(Vec::with_capacity(config.max_size)),
            config,
            driver,
            total_connections: AtomicUsize::new(0),
            idle_connections: AtomicUsize::new(0),
            stats: AtomicPoolStats::default(),
            shutdown: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        });

        let floor = pool.config.min_idle.min(pool.config.max_size);
        for _ in 0..floor {
            match pool.open_connection().await {
                Ok(conn) => {
                    let now = Instant::now();
                    pool.push_idle(PoolEntry {
                        conn,
                        created_at: now,
                        last_used: now,
                    })
                    .await;
                }
                Err(e) => {
                    warn!(driver = %pool.config.driver_name, error = %e, "Failed to open idle connection");
                    break;
                }
            }
        }

        debug!(
            driver = %pool.config.driver_name,
            url = %redact_url(&pool.config.url),
            min_idle = pool.config.min_idle,
            max_size = pool.config.max_size,
            "Created connection pool"
        );
        Ok(pool)
    }

    async fn open_connection(&self) -> Result<Box<dyn Connection>> {
        match self
            .driver
            .connect(&self.config.url, &self.config.properties)
            .await
        {
            Ok(conn) => {
                self.total_connections.fetch_add(1, Ordering::AcqRel);
                AtomicPoolStats::bump(&self.stats.connections_created);
                Ok(conn)
            }
            Err(e) => {
                AtomicPoolStats::bump(&self.stats.connect_failures);
                Err(e)
            }
        }
    }

    async fn push_idle(&self, entry: PoolEntry) {
        let mut idle = self.idle.lock().await;
        idle.push(entry);
        self.idle_connections.store(idle.len(), Ordering::Release);
    }

    async fn pop_idle(&self) -> Option<PoolEntry> {
        let mut idle = self.idle.lock().await;
        let entry = idle.pop();
        self.idle_connections.store(idle.len(), Ordering::Release);
        entry
    }

    fn retire(&self) {
        self.total_connections.fetch_sub(1, Ordering::AcqRel);
        AtomicPoolStats::bump(&self.stats.connections_closed);
    }

    fn should_recycle(&self, entry: &PoolEntry) -> bool {
        entry.created_at.elapsed() > self.config.max_lifetime
            || entry.last_used.elapsed() > self.config.idle_timeout
    }

    async fn take_idle(&self) -> Option<PoolEntry> {
        loop {
            let entry = self.pop_idle().await?;
            if self.should_recycle(&entry) {
                let _ = entry.conn.close().await;
                self.retire();
                continue;
            }
            if self.config.test_on_borrow && !entry.conn.is_valid().await {
                self.retire();
                continue;
            }
            return Some(entry);
        }
    }

    /// Get pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

#[async_trait]
impl ConnectionPool for SimpleConnectionPool {
    async fn get(&self) -> Result<PooledConnection> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Error::connection("connection pool is shut down"));
        }

        let permit = tokio::time::timeout(self.config.acquire_timeout, self.semaphore.acquire())
            .await
            .map_err(|_| {
                AtomicPoolStats::bump(&self.stats.exhausted_count);
                Error::connection(format!(
                    "timed out after {}ms waiting for a pooled connection",
                    self.config.acquire_timeout.as_millis()
                ))
            })?
            .map_err(|_| Error::connection("connection pool semaphore closed"))?;

        let (conn, created_at) = match self.take_idle().await {
            Some(entry) => (entry.conn, entry.created_at),
            None => (self.open_connection().await?, Instant::now()),
        };

        AtomicPoolStats::bump(&self.stats.acquisitions);

        let pool: Arc<dyn ConnectionPool> = self
            .self_ref
            .upgrade()
            .ok_or_else(|| Error::connection("connection pool has been dropped"))?;

        // Released again in return_connection/discard_connection
        permit.forget();
        Ok(PooledConnection::new(conn, pool, created_at))
    }

    async fn return_connection(&self, conn: Box<dyn Connection>, created_at: Instant) {
        if self.shutdown.load(Ordering::Acquire) {
            let _ = conn.close().await;
            self.retire();
        } else {
            self.push_idle(PoolEntry {
                conn,
                created_at,
                last_used: Instant::now(),
            })
            .await;
        }

        // The permit goes back only once the connection is idle or gone
        self.semaphore.add_permits(1);
    }

    fn discard_connection(&self) {
        self.retire();
        self.semaphore.add_permits(1);
    }

    fn size(&self) -> usize {
        self.total_connections.load(Ordering::Acquire)
    }

    fn idle(&self) -> usize {
        self.idle_connections.load(Ordering::Acquire)
    }

    fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    async fn close(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);

        let mut idle = self.idle.lock().await;
        for entry in idle.drain(..) {
            let _ = entry.conn.close().await;
            self.retire();
        }
        self.idle_connections.store(0, Ordering::Release);

        Ok(())
    }
}

/// Constructs pools for connection factories
#[async_trait]
pub trait PoolProvider: Send + Sync {
    /// Build a pool for the given configuration
    async fn create_pool(&self, config: PoolConfig) -> Result<Arc<dyn ConnectionPool>>;
}

/// Builds [`SimpleConnectionPool`]s over a driver
#[derive(Clone)]
pub struct DriverPoolProvider {
    driver: Arc<dyn Driver>,
}

impl DriverPoolProvider {
    /// Create a provider for `driver`
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl PoolProvider for DriverPoolProvider {
    async fn create_pool(&self, config: PoolConfig) -> Result<Arc<dyn ConnectionPool>> {
        if config.driver_name != self.driver.name() {
            warn!(
                configured = %config.driver_name,
                driver = %self.driver.name(),
                "Driver identifier does not match the registered driver"
            );
        }
        let pool: Arc<dyn ConnectionPool> =
            SimpleConnectionPool::new(config, self.driver.clone()).await?;
        Ok(pool)
    }
}
