//! Database connections
//!
//! Connection-variant discovery, a bounded deadpool-backed pool and the backend
//! seams ([`Connector`], [`DbConnection`]) implemented for DuckDB and PostgreSQL.

mod backend;
mod config;
#[cfg(feature = "duckdb-backend")]
mod duckdb_backend;
mod error;
mod pool;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;

pub use backend::{ColumnBinding, Connector, DbConnection};
pub use config::{
    Address, Backend, ConnectionConfig, ConnectionVariant, Credentials, DEFAULT_POSTGRES_PORT,
    PoolConfig, PoolConfigBuilder,
};
#[cfg(feature = "duckdb-backend")]
pub use duckdb_backend::{DuckDbConnection, DuckDbConnector};
pub use error::{ConnectionError, ConnectionResult};
pub use pool::{ConnectionAttempt, ConnectionManager, Pool, PoolManager, PoolStatus, PooledConnection};
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::{PostgresConnection, PostgresConnector};
