//! Table handle with shortcuts for common access patterns

use crate::{
    query::QueryBuilder,
    transport::Transport,
    types::{CreateResponse, DeleteResponse, UpdateResponse},
    Result,
};
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// A table in the project database
///
/// Every method starts a fresh [`QueryBuilder`]; a `Table` itself holds
/// no query state and can be reused freely.
#[derive(Clone, Debug)]
pub struct Table {
    transport: Arc<Transport>,
    name: String,
}

impl Table {
    pub(crate) fn new(transport: Arc<Transport>, name: impl Into<String>) -> Self {
        Self {
            transport,
            name: name.into(),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a query projecting `columns`
    pub fn select<I, S>(&self, columns: I) -> QueryBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query().select(columns)
    }

    /// All columns of all rows, i.e. `select(["*"])`
    pub fn get(&self) -> QueryBuilder {
        self.select(["*"])
    }

    /// The row whose `id` equals `id`
    pub fn get_by_id(&self, id: impl Serialize) -> QueryBuilder {
        self.get().eq("id", id).limit(1)
    }

    /// An empty builder with no default projection
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(&self.transport), self.name.as_str())
    }

    /// Alias for [`query`](Self::query)
    pub fn r#where(&self) -> QueryBuilder {
        self.query()
    }

    /// Insert one record
    #[instrument(skip(self, data), fields(table = %self.name))]
    pub async fn insert(&self, data: impl Serialize) -> Result<CreateResponse> {
        let path = self.transport.path(&["api", "v1", "tables", &self.name])?;
        self.transport.send_json(Method::POST, &path, &data).await
    }

    /// Update the row whose `id` equals `id`
    pub async fn update_by_id(
        &self,
        id: impl Serialize,
        data: impl Serialize,
    ) -> Result<UpdateResponse> {
        self.query().eq("id", id).update(data).await
    }

    /// Delete the row whose `id` equals `id`
    pub async fn delete_by_id(&self, id: impl Serialize) -> Result<DeleteResponse> {
        self.query().eq("id", id).delete().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ApiSurface, Credential};
    use serde_json::json;
    use std::time::Duration;

    fn table() -> Table {
        let transport = Transport::new(
            "http://localhost:8080",
            Credential::Bearer("key"),
            "test",
            Duration::from_secs(1),
            ApiSurface::Data,
        )
        .unwrap();
        Table::new(Arc::new(transport), "posts")
    }

    #[test]
    fn test_get_selects_star() {
        let body = table().get().query_body().unwrap();
        assert_eq!(serde_json::to_value(body).unwrap(), json!({"columns": ["*"]}));
    }

    #[test]
    fn test_get_by_id_shape() {
        let qb = table().get_by_id(42);
        assert_eq!(qb.table_name(), "posts");
        assert_eq!(
            serde_json::to_value(qb.query_body().unwrap()).unwrap(),
            json!({
                "columns": ["*"],
                "filters": [{"column": "id", "operator": "eq", "value": 42}],
                "limit": 1
            })
        );
    }

    #[test]
    fn test_where_has_no_projection() {
        let body = table().r#where().eq("published", true).query_body().unwrap();
        assert!(body.columns.is_empty());
        assert_eq!(body.filters.len(), 1);
    }

    #[test]
    fn test_builders_are_independent() {
        let t = table();
        let first = t.query().eq("a", 1);
        let second = t.query();
        assert_eq!(first.filters().len(), 1);
        assert!(second.filters().is_empty());
    }
}
