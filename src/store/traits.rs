use crate::error::Result;
use crate::store::types::{Filter, Row, SelectQuery, Strictness};
use async_trait::async_trait;

/// Table-scoped CRUD over the hosted row store.
/// Implemented by the REST client for the real backend and by an in-memory
/// store for tests and offline runs.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Fetch every row matching the query
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>>;

    /// Fetch at most one row, enforcing the given strictness
    async fn fetch_one(&self, query: &SelectQuery, strictness: Strictness) -> Result<Option<Row>> {
        let rows = self.select(query).await?;
        strictness.pick(&query.table, rows)
    }

    /// Insert a row and return it as stored, with server-assigned fields
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Overwrite the given fields on every matching row and return the rows
    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> Result<Vec<Row>>;

    /// Delete every matching row. Matching nothing is not an error.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()>;

    /// Get the name of the backend
    fn backend_name(&self) -> &'static str;
}
