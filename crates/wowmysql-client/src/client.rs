//! Data API client

use crate::{
    table::Table,
    transport::{ApiSurface, Credential, Transport},
    types::{Row, TableSchema},
    Config, Result,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

#[derive(Deserialize)]
struct TablesResponse {
    #[serde(default, deserialize_with = "crate::types::null_as_default")]
    tables: Vec<String>,
}

#[derive(Serialize)]
struct SqlRequest<'a> {
    sql: &'a str,
}

#[derive(Deserialize)]
struct SqlResponse {
    #[serde(default, deserialize_with = "crate::types::null_as_default")]
    data: Vec<Row>,
}

/// WowMySQL data API client
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct WowMySqlClient {
    config: Config,
    transport: Arc<Transport>,
}

impl WowMySqlClient {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let transport = Transport::new(
            &config.project_url,
            Credential::Bearer(&config.api_key),
            &config.user_agent,
            config.timeout,
            ApiSurface::Data,
        )?;

        Ok(Self {
            config,
            transport: Arc::new(transport),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to a table
    pub fn table(&self, name: impl Into<String>) -> Table {
        Table::new(Arc::clone(&self.transport), name)
    }

    /// Names of all tables in the project
    #[instrument(skip(self))]
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let response: TablesResponse = self.transport.get_json("/api/v1/tables", &[]).await?;
        Ok(response.tables)
    }

    /// Column layout of a table
    #[instrument(skip(self))]
    pub async fn get_table_schema(&self, table: &str) -> Result<TableSchema> {
        let path = self.transport.path(&["api", "v1", "tables", table, "schema"])?;
        self.transport.get_json(&path, &[]).await
    }

    /// Run raw SQL and return the rows
    #[instrument(skip(self, sql))]
    pub async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let response: SqlResponse = self
            .transport
            .send_json(Method::POST, "/api/v1/query", &SqlRequest { sql })
            .await?;
        Ok(response.data)
    }

    /// Backend health report
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        self.transport.get_json("/api/v1/health", &[]).await
    }
}
