//! Connection and pool configuration

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Database backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded DuckDB, file-backed or in-memory
    #[default]
    DuckDb,
    Postgres,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::DuckDb => f.write_str("duckdb"),
            Backend::Postgres => f.write_str("postgres"),
        }
    }
}

/// Login for a connection variant
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// How one variant addresses the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Address {
    /// Embedded database file, `None` for in-memory
    Embedded { path: Option<String> },
    /// Host with an optional explicit port
    Tcp { host: String, port: Option<u16> },
    /// Host with a named server instance
    Instance { host: String, instance: String },
    /// Local socket directory
    Socket { dir: String },
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Embedded { path: Some(path) } => write!(f, "{path}"),
            Address::Embedded { path: None } => f.write_str(":memory:"),
            Address::Tcp { host, port: Some(port) } => write!(f, "{host}:{port}"),
            Address::Tcp { host, port: None } => f.write_str(host),
            Address::Instance { host, instance } => write!(f, "{host}\\{instance}"),
            Address::Socket { dir } => write!(f, "unix:{dir}"),
        }
    }
}

/// One way of reaching the target database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionVariant {
    pub label: String,
    pub address: Address,
    pub database: String,
    pub credentials: Credentials,
}

/// Target database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    pub backend: Backend,
    pub host: String,
    pub port: Option<u16>,
    /// Named server instance
    pub instance: Option<String>,
    /// Directory holding the server's local socket
    pub socket_dir: Option<String>,
    pub database: String,
    /// Database tried last when the primary one is unreachable
    pub fallback_database: Option<String>,
    /// DuckDB database file; in-memory when unset
    pub path: Option<String>,
    pub credentials: Credentials,
    /// Per-attempt timeout during discovery
    pub connect_timeout_secs: u64,
}

pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            backend: Backend::DuckDb,
            host: "localhost".to_string(),
            port: None,
            instance: None,
            socket_dir: None,
            database: "postgres".to_string(),
            fallback_database: None,
            path: None,
            credentials: Credentials::default(),
            connect_timeout_secs: 10,
        }
    }
}

impl ConnectionConfig {
    /// In-memory DuckDB
    pub fn duckdb_memory() -> Self {
        Self::default()
    }

    /// File-backed DuckDB
    pub fn duckdb_file(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn postgres(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            backend: Backend::Postgres,
            host: host.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_socket_dir(mut self, dir: impl Into<String>) -> Self {
        self.socket_dir = Some(dir.into());
        self
    }

    pub fn with_fallback_database(mut self, database: impl Into<String>) -> Self {
        self.fallback_database = Some(database.into());
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials {
            user: Some(user.into()),
            password: Some(password.into()),
        };
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    /// Variants in the order discovery tries them
    ///
    /// Server backends try the default instance, the explicit standard port, a named
    /// instance, the local socket and finally the fallback database. Optional variants
    /// appear only when configured.
    pub fn variants(&self) -> Vec<ConnectionVariant> {
        let variant = |label: &str, address: Address, database: &str| ConnectionVariant {
            label: label.to_string(),
            address,
            database: database.to_string(),
            credentials: self.credentials.clone(),
        };

        match self.backend {
            Backend::DuckDb => {
                let label = if self.path.is_some() { "embedded file" } else { "in-memory" };
                vec![variant(
                    label,
                    Address::Embedded {
                        path: self.path.clone(),
                    },
                    &self.database,
                )]
            }
            Backend::Postgres => {
                let port = self.port.unwrap_or(DEFAULT_POSTGRES_PORT);
                let mut variants = vec![
                    variant(
                        "default instance",
                        Address::Tcp {
                            host: self.host.clone(),
                            port: None,
                        },
                        &self.database,
                    ),
                    variant(
                        "standard port",
                        Address::Tcp {
                            host: self.host.clone(),
                            port: Some(port),
                        },
                        &self.database,
                    ),
                ];
                if let Some(instance) = &self.instance {
                    variants.push(variant(
                        "named instance",
                        Address::Instance {
                            host: self.host.clone(),
                            instance: instance.clone(),
                        },
                        &self.database,
                    ));
                }
                if let Some(dir) = &self.socket_dir {
                    variants.push(variant(
                        "alternate protocol",
                        Address::Socket { dir: dir.clone() },
                        &self.database,
                    ));
                }
                if let Some(fallback) = &self.fallback_database {
                    variants.push(variant(
                        "fallback database",
                        Address::Tcp {
                            host: self.host.clone(),
                            port: Some(port),
                        },
                        fallback,
                    ));
                }
                variants
            }
        }
    }
}

/// Bounded pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolConfig {
    /// Connections kept for reuse
    pub pool_size: usize,
    /// Extra connections allowed under load
    pub max_overflow: usize,
    /// Wait for a free connection before giving up
    pub timeout_secs: u64,
    /// Connections older than this are replaced instead of reused
    pub recycle_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 3,
            max_overflow: 5,
            timeout_secs: 30,
            recycle_secs: 3600,
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Hard cap on open connections
    pub fn capacity(&self) -> usize {
        self.pool_size + self.max_overflow
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.recycle_secs)
    }
}

/// Builder for [`PoolConfig`]
#[derive(Debug, Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size.max(1);
        self
    }

    pub fn max_overflow(mut self, overflow: usize) -> Self {
        self.config.max_overflow = overflow;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn recycle_secs(mut self, secs: u64) -> Self {
        self.config.recycle_secs = secs;
        self
    }

    pub fn build(self) -> PoolConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duckdb_has_single_variant() {
        let variants = ConnectionConfig::duckdb_memory().variants();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].label, "in-memory");
        assert_eq!(variants[0].address, Address::Embedded { path: None });
    }

    #[test]
    fn test_postgres_variant_order() {
        let config = ConnectionConfig::postgres("db.local", "sales")
            .with_port(6543)
            .with_instance("SQLEXPRESS")
            .with_socket_dir("/var/run/postgresql")
            .with_fallback_database("postgres");
        let labels: Vec<String> = config.variants().into_iter().map(|v| v.label).collect();
        assert_eq!(
            labels,
            vec![
                "default instance",
                "standard port",
                "named instance",
                "alternate protocol",
                "fallback database"
            ]
        );

        let variants = config.variants();
        assert_eq!(variants[1].address.to_string(), "db.local:6543");
        assert_eq!(variants[4].database, "postgres");
    }

    #[test]
    fn test_minimal_postgres_variants() {
        let variants = ConnectionConfig::postgres("localhost", "app").variants();
        assert_eq!(variants.len(), 2);
        assert_eq!(
            variants[1].address,
            Address::Tcp {
                host: "localhost".to_string(),
                port: Some(DEFAULT_POSTGRES_PORT)
            }
        );
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let config = ConnectionConfig::postgres("h", "d").with_credentials("me", "secret");
        assert!(!format!("{:?}", config.credentials).contains("secret"));
    }

    #[test]
    fn test_pool_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.capacity(), 8);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_lifetime(), Duration::from_secs(3600));

        let built = PoolConfig::builder().pool_size(0).max_overflow(1).build();
        assert_eq!(built.pool_size, 1);
        assert_eq!(built.capacity(), 2);
    }
}
