use crate::error::{Error, Result};
use crate::store::traits::RowStore;
use crate::store::types::{Direction, Filter, Row, SelectQuery};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Error body returned by the backend on failure
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    message: Option<String>,
    code: Option<String>,
}

/// Row store backed by the hosted PostgREST API
pub struct RestRowStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestRowStore {
    /// Create a client for the backend at `base_url`, authenticated with `api_key`
    pub fn new(base_url: &str, api_key: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!("sitboard/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Backend returned status: {}", status);
        Err(backend_error(status.as_u16(), &body))
    }

    async fn rows(response: Response) -> Result<Vec<Row>> {
        let body = response.text().await?;
        debug!("Downloaded {} bytes of rows", body.len());
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Convert a failed response into a uniform error, keeping the backend's message
fn backend_error(status: u16, body: &str) -> Error {
    match serde_json::from_str::<BackendErrorBody>(body) {
        Ok(BackendErrorBody {
            message: Some(message),
            code,
        }) => Error::Backend { message, code },
        _ if body.is_empty() => Error::backend(format!("backend returned status {status}")),
        _ => Error::backend(format!("backend returned status {status}: {body}")),
    }
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equality filters in PostgREST query syntax
fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), format!("eq.{}", param_value(&f.value))))
        .collect()
}

fn select_params(query: &SelectQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.select_param())];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let direction = match order.direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

#[async_trait]
impl RowStore for RestRowStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        debug!(table = %query.table, "Fetching rows");
        let request = self
            .client
            .get(self.table_url(&query.table))
            .query(&select_params(query));
        let response = self.send(request).await?;
        Self::rows(response).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("select", "*")])
            .header("Prefer", "return=representation")
            .json(&vec![row]);
        let response = self.send(request).await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::backend(format!("insert into {table} returned no row")))
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> Result<Vec<Row>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(filters));
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&params)
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(request).await?;
        Self::rows(response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&filter_params(filters))
            .header("Prefer", "return=minimal");
        self.send(request).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}
