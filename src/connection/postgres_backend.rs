//! PostgreSQL backend

use std::time::Duration;

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::warn;

use super::backend::{ColumnBinding, Connector, DbConnection};
use super::config::{Address, ConnectionVariant};
use super::error::{ConnectionError, ConnectionResult};
use crate::export::{Dialect, SQLExporter};
use crate::models::CellValue;

/// Bind parameters allowed in one statement
const MAX_PARAMETERS: usize = 65_535;

/// Opens PostgreSQL connections
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    connect_timeout: Duration,
}

impl PostgresConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn config(&self, variant: &ConnectionVariant) -> ConnectionResult<tokio_postgres::Config> {
        let mut config = tokio_postgres::Config::new();
        config
            .dbname(&variant.database)
            .connect_timeout(self.connect_timeout);
        if let Some(user) = &variant.credentials.user {
            config.user(user);
        }
        if let Some(password) = &variant.credentials.password {
            config.password(password);
        }

        match &variant.address {
            Address::Tcp { host, port } => {
                config.host(host);
                if let Some(port) = port {
                    config.port(*port);
                }
            }
            #[cfg(unix)]
            Address::Socket { dir } => {
                config.host_path(dir);
            }
            other => {
                return Err(ConnectionError::Unsupported(format!(
                    "{} ({other}) for postgres",
                    variant.label
                )));
            }
        }
        Ok(config)
    }
}

impl Default for PostgresConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn connect(&self, variant: &ConnectionVariant) -> ConnectionResult<Box<dyn DbConnection>> {
        let (client, connection) = self.config(variant)?.connect(NoTls).await?;

        // Spawn connection handler
        let label = variant.label.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(variant = %label, error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Box::new(PostgresConnection { client }))
    }
}

/// One PostgreSQL connection
pub struct PostgresConnection {
    client: Client,
}

#[async_trait]
impl DbConnection for PostgresConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&mut self, sql: &str) -> ConnectionResult<()> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn query_i64(&mut self, sql: &str) -> ConnectionResult<i64> {
        let row = self.client.query_one(sql, &[]).await?;
        Ok(row.try_get(0)?)
    }

    async fn table_exists(&mut self, table: &str) -> ConnectionResult<bool> {
        let row = self
            .client
            .query_opt(
                "SELECT 1 FROM information_schema.tables WHERE table_name = $1",
                &[&table],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn column_names(&mut self, table: &str) -> ConnectionResult<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_name = $1 ORDER BY ordinal_position",
                &[&table],
            )
            .await?;
        Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
    }

    async fn insert_rows(
        &mut self,
        table: &str,
        columns: &[ColumnBinding],
        rows: &[Vec<CellValue>],
    ) -> ConnectionResult<u64> {
        if rows.is_empty() || columns.is_empty() {
            return Ok(0);
        }
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let prefix = SQLExporter::insert_prefix(table, &names, Dialect::Postgres);
        let types: Vec<String> = columns.iter().map(|c| c.sql_type(Dialect::Postgres)).collect();
        let rows_per_statement = (MAX_PARAMETERS / columns.len()).max(1);

        let tx = self.client.transaction().await?;
        let mut inserted = 0;
        for batch in rows.chunks(rows_per_statement) {
            let mut tuples = Vec::with_capacity(batch.len());
            let mut values: Vec<Option<String>> = Vec::with_capacity(batch.len() * columns.len());
            for row in batch {
                let placeholders: Vec<String> = types
                    .iter()
                    .enumerate()
                    .map(|(j, sql_type)| {
                        values.push(row.get(j).and_then(CellValue::as_text));
                        format!("${}::text::{sql_type}", values.len())
                    })
                    .collect();
                tuples.push(format!("({})", placeholders.join(", ")));
            }
            let params: Vec<&(dyn ToSql + Sync)> =
                values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
            let sql = format!("{prefix}{}", tuples.join(", "));
            inserted += tx.execute(&sql, &params).await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn ping(&mut self) -> ConnectionResult<()> {
        self.client.simple_query("SELECT 1").await?;
        Ok(())
    }
}
