//! Connection discovery and pooling

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use deadpool::Runtime;
use deadpool::managed::{self, Metrics, PoolError, RecycleError, RecycleResult, TimeoutType};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::backend::{Connector, DbConnection};
use super::config::{Backend, ConnectionConfig, ConnectionVariant, PoolConfig};
use super::error::{ConnectionError, ConnectionResult};
use crate::export::Dialect;

/// Outcome of one connection variant during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAttempt {
    pub label: String,
    /// `None` when the variant succeeded
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Point-in-time view of the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    /// Configured steady-state size
    pub size: usize,
    pub checked_in: usize,
    pub checked_out: usize,
    /// Open connections beyond `size`
    pub overflow: usize,
    pub total_connections: usize,
}

/// deadpool manager creating connections for the winning variant
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    variant: ConnectionVariant,
    max_lifetime: Duration,
}

impl managed::Manager for ConnectionManager {
    type Type = Box<dyn DbConnection>;
    type Error = ConnectionError;

    async fn create(&self) -> Result<Box<dyn DbConnection>, ConnectionError> {
        self.connector.connect(&self.variant).await
    }

    async fn recycle(
        &self,
        conn: &mut Box<dyn DbConnection>,
        metrics: &Metrics,
    ) -> RecycleResult<ConnectionError> {
        if metrics.age() > self.max_lifetime {
            return Err(RecycleError::Message("connection exceeded its max lifetime".into()));
        }
        conn.ping().await.map_err(RecycleError::Backend)
    }
}

pub type Pool = managed::Pool<ConnectionManager>;

/// A connection checked out of the pool, returned on drop
pub type PooledConnection = managed::Object<ConnectionManager>;

struct ActivePool {
    variant: ConnectionVariant,
    pool: Pool,
}

/// Owns connection discovery and the bounded pool
///
/// The first variant that passes both a raw probe and a pooled probe is kept for
/// the lifetime of the manager.
pub struct PoolManager {
    config: ConnectionConfig,
    pool_config: PoolConfig,
    connector: Arc<dyn Connector>,
    active: OnceCell<ActivePool>,
    attempts: Mutex<Vec<ConnectionAttempt>>,
}

impl fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("config", &self.config)
            .field("pool_config", &self.pool_config)
            .field("active_variant", &self.active_variant())
            .finish_non_exhaustive()
    }
}

impl PoolManager {
    /// Manager using the connector compiled in for the configured backend
    pub fn new(config: ConnectionConfig, pool_config: PoolConfig) -> ConnectionResult<Self> {
        let connector: Arc<dyn Connector> = match config.backend {
            #[cfg(feature = "duckdb-backend")]
            Backend::DuckDb => Arc::new(super::duckdb_backend::DuckDbConnector::new()),
            #[cfg(feature = "postgres-backend")]
            Backend::Postgres => Arc::new(super::postgres_backend::PostgresConnector::new(
                config.connect_timeout(),
            )),
            #[allow(unreachable_patterns)]
            other => {
                return Err(ConnectionError::Unsupported(format!(
                    "no SQL driver found for backend '{other}'"
                )));
            }
        };
        Ok(Self::with_connector(config, pool_config, connector))
    }

    pub fn with_connector(
        config: ConnectionConfig,
        pool_config: PoolConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            pool_config,
            connector,
            active: OnceCell::new(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.connector.dialect()
    }

    pub fn pool_config(&self) -> &PoolConfig {
        &self.pool_config
    }

    /// Hard cap on concurrently open connections
    pub fn capacity(&self) -> usize {
        self.pool_config.capacity()
    }

    /// Discover a working variant, once
    pub async fn connect(&self) -> ConnectionResult<&ConnectionVariant> {
        let active = self.active.get_or_try_init(|| self.discover()).await?;
        Ok(&active.variant)
    }

    /// Variant cached by a successful [`connect`](Self::connect)
    pub fn active_variant(&self) -> Option<&ConnectionVariant> {
        self.active.get().map(|a| &a.variant)
    }

    /// Attempts made by the most recent discovery
    pub fn last_attempts(&self) -> Vec<ConnectionAttempt> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Check out a connection, connecting first if needed
    pub async fn get_connection(&self) -> ConnectionResult<PooledConnection> {
        self.connect().await?;
        let active = self.active.get().ok_or(ConnectionError::PoolClosed)?;
        active
            .pool
            .get()
            .await
            .map_err(|e| pool_error(e, self.pool_config.timeout()))
    }

    pub fn pool_status(&self) -> PoolStatus {
        let size = self.pool_config.pool_size;
        match self.active.get() {
            Some(active) => {
                let status = active.pool.status();
                PoolStatus {
                    size,
                    checked_in: status.available,
                    checked_out: status.size.saturating_sub(status.available),
                    overflow: status.size.saturating_sub(size),
                    total_connections: status.size,
                }
            }
            None => PoolStatus {
                size,
                ..PoolStatus::default()
            },
        }
    }

    /// Close the pool; later checkouts fail with `PoolClosed`
    pub fn dispose(&self) {
        if let Some(active) = self.active.get() {
            active.pool.close();
            info!(variant = %active.variant.label, "Connection pool disposed");
        }
    }

    async fn discover(&self) -> ConnectionResult<ActivePool> {
        let mut attempts = Vec::new();
        for variant in self.config.variants() {
            let started = Instant::now();
            let outcome = self.probe(&variant).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match outcome {
                Ok(pool) => {
                    info!(
                        variant = %variant.label,
                        address = %variant.address,
                        elapsed_ms,
                        "Connected"
                    );
                    attempts.push(ConnectionAttempt {
                        label: variant.label.clone(),
                        error: None,
                        elapsed_ms,
                    });
                    self.record(attempts);
                    return Ok(ActivePool { variant, pool });
                }
                Err(e) => {
                    warn!(variant = %variant.label, error = %e, elapsed_ms, "Connection attempt failed");
                    attempts.push(ConnectionAttempt {
                        label: variant.label.clone(),
                        error: Some(e.to_string()),
                        elapsed_ms,
                    });
                }
            }
        }
        self.record(attempts.clone());
        Err(ConnectionError::Unavailable { attempts })
    }

    /// Raw connectivity probe followed by a pooled `SELECT 1`
    async fn probe(&self, variant: &ConnectionVariant) -> ConnectionResult<Pool> {
        let timeout = self.config.connect_timeout();
        let mut raw = tokio::time::timeout(timeout, self.connector.connect(variant))
            .await
            .map_err(|_| ConnectionError::Timeout(timeout))??;
        raw.ping().await?;
        drop(raw);
        debug!(variant = %variant.label, "Raw probe succeeded");

        let pool = self.build_pool(variant)?;
        let pooled = async {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| pool_error(e, self.pool_config.timeout()))?;
            conn.ping().await
        };
        match tokio::time::timeout(timeout, pooled).await {
            Ok(Ok(())) => Ok(pool),
            Ok(Err(e)) => {
                pool.close();
                Err(e)
            }
            Err(_) => {
                pool.close();
                Err(ConnectionError::Timeout(timeout))
            }
        }
    }

    fn build_pool(&self, variant: &ConnectionVariant) -> ConnectionResult<Pool> {
        let manager = ConnectionManager {
            connector: Arc::clone(&self.connector),
            variant: variant.clone(),
            max_lifetime: self.pool_config.max_lifetime(),
        };
        Pool::builder(manager)
            .max_size(self.pool_config.capacity())
            .wait_timeout(Some(self.pool_config.timeout()))
            .create_timeout(Some(self.config.connect_timeout()))
            .recycle_timeout(Some(self.config.connect_timeout()))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| ConnectionError::Pool(e.to_string()))
    }

    fn record(&self, attempts: Vec<ConnectionAttempt>) {
        if let Ok(mut slot) = self.attempts.lock() {
            *slot = attempts;
        }
    }
}

fn pool_error(err: PoolError<ConnectionError>, wait: Duration) -> ConnectionError {
    match err {
        PoolError::Timeout(TimeoutType::Wait) => ConnectionError::PoolExhausted(wait),
        PoolError::Timeout(_) => ConnectionError::Timeout(wait),
        PoolError::Backend(e) => e,
        PoolError::Closed => ConnectionError::PoolClosed,
        other => ConnectionError::Pool(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::connection::ColumnBinding;
    use crate::models::CellValue;

    struct NullConnection;

    #[async_trait]
    impl DbConnection for NullConnection {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }
        async fn execute(&mut self, _sql: &str) -> ConnectionResult<()> {
            Ok(())
        }
        async fn query_i64(&mut self, _sql: &str) -> ConnectionResult<i64> {
            Ok(0)
        }
        async fn table_exists(&mut self, _table: &str) -> ConnectionResult<bool> {
            Ok(false)
        }
        async fn column_names(&mut self, _table: &str) -> ConnectionResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn insert_rows(
            &mut self,
            _table: &str,
            _columns: &[ColumnBinding],
            rows: &[Vec<CellValue>],
        ) -> ConnectionResult<u64> {
            Ok(rows.len() as u64)
        }
        async fn ping(&mut self) -> ConnectionResult<()> {
            Ok(())
        }
    }

    /// Fails every variant whose label is listed
    struct ScriptedConnector {
        failing: Vec<&'static str>,
        opened: AtomicUsize,
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }
        async fn connect(&self, variant: &ConnectionVariant) -> ConnectionResult<Box<dyn DbConnection>> {
            if self.failing.iter().any(|label| *label == variant.label) {
                return Err(ConnectionError::Database("connection refused".to_string()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullConnection))
        }
    }

    fn manager(failing: Vec<&'static str>, pool: PoolConfig) -> PoolManager {
        let config = ConnectionConfig::postgres("localhost", "app").with_fallback_database("postgres");
        PoolManager::with_connector(
            config,
            pool,
            Arc::new(ScriptedConnector {
                failing,
                opened: AtomicUsize::new(0),
            }),
        )
    }

    #[tokio::test]
    async fn test_falls_through_to_working_variant() {
        let manager = manager(vec!["default instance"], PoolConfig::default());
        let variant = manager.connect().await.unwrap();
        assert_eq!(variant.label, "standard port");

        let attempts = manager.last_attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].error.is_some());
        assert!(attempts[1].error.is_none());
    }

    #[tokio::test]
    async fn test_all_variants_fail() {
        let manager = manager(
            vec!["default instance", "standard port", "fallback database"],
            PoolConfig::default(),
        );
        let err = manager.connect().await.err().unwrap();
        match err {
            ConnectionError::Unavailable { attempts } => assert_eq!(attempts.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(manager.pool_status().total_connections, 0);
    }

    #[tokio::test]
    async fn test_pool_status_and_exhaustion() {
        let pool = PoolConfig::builder()
            .pool_size(1)
            .max_overflow(1)
            .timeout_secs(1)
            .build();
        let manager = manager(Vec::new(), pool);

        let first = manager.get_connection().await.unwrap();
        let second = manager.get_connection().await.unwrap();
        let status = manager.pool_status();
        assert_eq!(status.checked_out, 2);
        assert_eq!(status.overflow, 1);

        let err = manager.get_connection().await.err().unwrap();
        assert!(matches!(err, ConnectionError::PoolExhausted(_)));

        drop(first);
        drop(second);
        let status = manager.pool_status();
        assert_eq!(status.checked_in, 2);
        assert_eq!(status.checked_out, 0);
    }

    #[tokio::test]
    async fn test_dispose_closes_pool() {
        let manager = manager(Vec::new(), PoolConfig::default());
        manager.connect().await.unwrap();
        manager.dispose();
        let err = manager.get_connection().await.err().unwrap();
        assert!(matches!(err, ConnectionError::PoolClosed));
    }
}
