//! Fluent query builder
//!
//! A [`QueryBuilder`] collects projection, filters, ordering and paging
//! for one table and turns them into a single request when a terminal
//! method (`execute`, `get`, `first`, `update`, `delete`) is awaited.
//!
//! Builders are moved through the chain (`self -> Self`), so each
//! logical query owns its own state and nothing is shared between
//! concurrent queries. The backend validates semantics: negative
//! limits/offsets, unknown columns and mismatched value types are sent
//! as-is and rejected (or not) by the server.

use crate::{
    transport::Transport,
    types::{DeleteResponse, QueryResponse, Row, UpdateResponse},
    ClientError, Result,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Comparison applied by a filter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "neq")]
    Neq,
    #[serde(rename = "gt")]
    Gt,
    #[serde(rename = "gte")]
    Gte,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "lte")]
    Lte,
    #[serde(rename = "like")]
    Like,
    /// `IS NULL`, sent as `"is"` and never carries a value
    #[serde(rename = "is")]
    IsNull,
}

/// Sort direction for `order_by`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One `column operator value` predicate; all filters of a query are ANDed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterExpression {
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FilterExpression {
    /// Filter comparing `column` against `value`
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value: Some(value),
        }
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::IsNull,
            value: None,
        }
    }
}

/// Body of `POST /api/v1/tables/{table}/query`
///
/// Keys whose state is still the default are left out entirely rather
/// than sent as `null` or `[]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_direction: Option<SortDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    data: Value,
    #[serde(skip_serializing_if = "no_filters")]
    filters: &'a [FilterExpression],
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    #[serde(skip_serializing_if = "no_filters")]
    filters: &'a [FilterExpression],
}

fn no_filters(filters: &&[FilterExpression]) -> bool {
    filters.is_empty()
}

/// Chainable query against one table
///
/// A builder is not meant to be shared: build it, await one terminal
/// call, drop it.
#[derive(Debug)]
pub struct QueryBuilder {
    transport: Arc<Transport>,
    table: String,
    columns: Vec<String>,
    filters: Vec<FilterExpression>,
    order: Option<(String, SortDirection)>,
    limit: Option<i64>,
    offset: Option<i64>,
    // first value that failed to serialize, reported by the terminal call
    encode_error: Option<serde_json::Error>,
}

impl QueryBuilder {
    pub(crate) fn new(transport: Arc<Transport>, table: impl Into<String>) -> Self {
        Self {
            transport,
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: None,
            encode_error: None,
        }
    }

    /// Table this builder targets
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Replace the projection; an empty list selects all columns
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// `column = value`
    pub fn eq(self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.filter(column, FilterOperator::Eq, value)
    }

    /// `column != value`
    pub fn neq(self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.filter(column, FilterOperator::Neq, value)
    }

    /// `column > value`
    pub fn gt(self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.filter(column, FilterOperator::Gt, value)
    }

    /// `column >= value`
    pub fn gte(self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.filter(column, FilterOperator::Gte, value)
    }

    /// `column < value`
    pub fn lt(self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.filter(column, FilterOperator::Lt, value)
    }

    /// `column <= value`
    pub fn lte(self, column: impl Into<String>, value: impl Serialize) -> Self {
        self.filter(column, FilterOperator::Lte, value)
    }

    /// `column LIKE pattern`
    pub fn like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.push(FilterExpression::new(
            column,
            FilterOperator::Like,
            Value::String(pattern.into()),
        ))
    }

    /// `column IS NULL`
    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.push(FilterExpression::is_null(column))
    }

    /// Append an arbitrary filter
    pub fn filter(
        mut self,
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Serialize,
    ) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.push(FilterExpression::new(column, operator, value)),
            Err(e) => {
                self.encode_error.get_or_insert(e);
                self
            }
        }
    }

    fn push(mut self, filter: FilterExpression) -> Self {
        self.filters.push(filter);
        self
    }

    /// Order by a single column, replacing any previous ordering
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    /// Maximum number of rows; negative values are passed through
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of rows to skip; negative values are passed through
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Filters accumulated so far, in call order
    pub fn filters(&self) -> &[FilterExpression] {
        &self.filters
    }

    /// The request body `execute` would send
    pub fn query_body(&self) -> Result<QueryBody> {
        self.check_encoded()?;
        let (order_by, order_direction) = match &self.order {
            Some((column, direction)) => (Some(column.clone()), Some(*direction)),
            None => (None, None),
        };
        Ok(QueryBody {
            columns: self.columns.clone(),
            filters: self.filters.clone(),
            order_by,
            order_direction,
            limit: self.limit,
            offset: self.offset,
        })
    }

    fn check_encoded(&self) -> Result<()> {
        match &self.encode_error {
            Some(e) => Err(ClientError::Encoding(<serde_json::Error as serde::ser::Error>::custom(e))),
            None => Ok(()),
        }
    }

    // ==================== Terminal Operations ====================

    /// Run the query
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn execute(self) -> Result<QueryResponse> {
        let body = self.query_body()?;
        let path = self.transport.path(&["api", "v1", "tables", &self.table, "query"])?;
        self.transport.send_json(Method::POST, &path, &body).await
    }

    /// Alias for [`execute`](Self::execute)
    pub async fn get(self) -> Result<QueryResponse> {
        self.execute().await
    }

    /// Run the query with `limit = 1`; `Ok(None)` when nothing matched
    pub async fn first(self) -> Result<Option<Row>> {
        let response = self.limit(1).execute().await?;
        Ok(response.data.into_iter().next())
    }

    /// Update every row matching the filters
    ///
    /// Without filters the backend decides what is updated, which is
    /// normally the whole table.
    #[instrument(skip(self, data), fields(table = %self.table, filters = self.filters.len()))]
    pub async fn update(self, data: impl Serialize) -> Result<UpdateResponse> {
        self.check_encoded()?;
        let body = UpdateBody {
            data: serde_json::to_value(data).map_err(ClientError::Encoding)?,
            filters: &self.filters,
        };
        let path = self.transport.path(&["api", "v1", "tables", &self.table])?;
        self.transport.send_json(Method::PUT, &path, &body).await
    }

    /// Delete every row matching the filters
    ///
    /// Without filters the backend decides what is deleted, which is
    /// normally the whole table.
    #[instrument(skip(self), fields(table = %self.table, filters = self.filters.len()))]
    pub async fn delete(self) -> Result<DeleteResponse> {
        self.check_encoded()?;
        let body = DeleteBody {
            filters: &self.filters,
        };
        let path = self.transport.path(&["api", "v1", "tables", &self.table])?;
        self.transport.send_json(Method::DELETE, &path, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ApiSurface, Credential};
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn builder() -> QueryBuilder {
        let transport = Transport::new(
            "http://localhost:8080",
            Credential::Bearer("key"),
            "test",
            Duration::from_secs(1),
            ApiSurface::Data,
        )
        .unwrap();
        QueryBuilder::new(Arc::new(transport), "users")
    }

    fn body_json(qb: &QueryBuilder) -> Value {
        serde_json::to_value(qb.query_body().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_builder_omits_all_keys() {
        assert_eq!(body_json(&builder()), json!({}));
    }

    #[test]
    fn test_filters_preserve_call_order() {
        let qb = builder()
            .eq("age", 30)
            .neq("status", "banned")
            .gt("score", 1.5)
            .gte("level", 2)
            .lt("rank", 10)
            .lte("karma", 100)
            .like("name", "jo%")
            .is_null("deleted_at");

        assert_eq!(
            body_json(&qb),
            json!({
                "filters": [
                    {"column": "age", "operator": "eq", "value": 30},
                    {"column": "status", "operator": "neq", "value": "banned"},
                    {"column": "score", "operator": "gt", "value": 1.5},
                    {"column": "level", "operator": "gte", "value": 2},
                    {"column": "rank", "operator": "lt", "value": 10},
                    {"column": "karma", "operator": "lte", "value": 100},
                    {"column": "name", "operator": "like", "value": "jo%"},
                    {"column": "deleted_at", "operator": "is"}
                ]
            })
        );
    }

    #[test]
    fn test_is_null_has_no_value_key() {
        let body = body_json(&builder().is_null("deleted_at"));
        let filter = &body["filters"][0];
        assert!(filter.as_object().unwrap().get("value").is_none());
    }

    #[test]
    fn test_select_last_call_wins() {
        let qb = builder().select(Vec::<String>::new()).select(["a", "b"]);
        assert_eq!(body_json(&qb), json!({"columns": ["a", "b"]}));

        let qb = builder().select(["a", "b"]).select(["c"]);
        assert_eq!(body_json(&qb), json!({"columns": ["c"]}));

        let qb = builder().select(["a"]).select(Vec::<String>::new());
        assert_eq!(body_json(&qb), json!({}));
    }

    #[test]
    fn test_order_and_paging_replace() {
        let qb = builder()
            .order_by("name", SortDirection::Asc)
            .order_by("created_at", SortDirection::Desc)
            .limit(10)
            .limit(20)
            .offset(5)
            .offset(-1);

        assert_eq!(
            body_json(&qb),
            json!({
                "order_by": "created_at",
                "order_direction": "desc",
                "limit": 20,
                "offset": -1
            })
        );
    }

    #[test]
    fn test_unencodable_value_is_encoding_error() {
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON object keys");

        let qb = builder().eq("ok", 1).eq("bad", bad);
        assert!(matches!(qb.query_body(), Err(ClientError::Encoding(_))));
        assert_eq!(qb.filters().len(), 1);
    }

    #[test]
    fn test_update_and_delete_bodies() {
        let filters = vec![FilterExpression::new("id", FilterOperator::Eq, json!(7))];
        let update = UpdateBody {
            data: json!({"name": "x"}),
            filters: &filters,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"data": {"name": "x"}, "filters": [{"column": "id", "operator": "eq", "value": 7}]})
        );

        let update = UpdateBody {
            data: json!({"name": "x"}),
            filters: &[],
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"data": {"name": "x"}}));

        let delete = DeleteBody { filters: &[] };
        assert_eq!(serde_json::to_value(&delete).unwrap(), json!({}));
    }

    #[test]
    fn test_operator_wire_names() {
        assert_eq!(serde_json::to_value(FilterOperator::IsNull).unwrap(), json!("is"));
        assert_eq!(serde_json::to_value(FilterOperator::Gte).unwrap(), json!("gte"));
        assert_eq!(serde_json::to_value(SortDirection::Asc).unwrap(), json!("asc"));
    }
}
