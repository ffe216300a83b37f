use crate::error::{Error, Result};
use crate::models::{LISTING_TABLE, SAVED_LISTING_TABLE};
use crate::store::traits::RowStore;
use crate::store::types::{Direction, Filter, Row, SelectQuery};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Shape of a table: primary key, column defaults and creation timestamp
#[derive(Debug, Clone)]
pub struct TableDef {
    pub primary_key: String,
    pub defaults: Row,
    pub created_at_column: Option<String>,
}

impl TableDef {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            defaults: Row::new(),
            created_at_column: None,
        }
    }

    pub fn with_default(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(column.to_string(), value.into());
        self
    }

    pub fn with_created_at(mut self, column: &str) -> Self {
        self.created_at_column = Some(column.to_string());
        self
    }
}

struct Table {
    def: TableDef,
    rows: Vec<Row>,
}

/// In-process row store.
///
/// Mimics the hosted backend closely enough for tests and offline runs:
/// server-assigned UUID keys, column defaults, equality filters and
/// single-column ordering.
#[derive(Default)]
pub struct MemoryRowStore {
    tables: Mutex<HashMap<String, Table>>,
    selects: AtomicUsize,
    latency: Option<Duration>,
    fail_next: Mutex<Option<Error>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the `listing` and `saved_listing` tables registered
    pub fn marketplace() -> Self {
        let store = Self::new();
        store.register(
            LISTING_TABLE,
            TableDef::new("listing_id").with_default("status", "ACTIVE"),
        );
        store.register(
            SAVED_LISTING_TABLE,
            TableDef::new("saved_listing_id").with_created_at("saved_at"),
        );
        store
    }

    /// Delay every call, so concurrent callers overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn register(&self, table: &str, def: TableDef) {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.insert(table.to_string(), Table { def, rows: Vec::new() });
    }

    /// Make the next call fail with the given error
    pub fn fail_next(&self, err: Error) {
        *self.fail_next.lock().unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    /// Number of selects served so far
    pub fn select_count(&self) -> usize {
        self.selects.load(AtomicOrdering::SeqCst)
    }

    /// Number of rows currently in a table
    pub fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    async fn before_call(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.fail_next.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&mut Table) -> T) -> Result<T> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let entry = tables.get_mut(table).ok_or_else(|| Error::Backend {
            message: format!("relation \"public.{table}\" does not exist"),
            code: Some("42P01".to_string()),
        })?;
        Ok(f(entry))
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|f| f.matches(row))
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        self.selects.fetch_add(1, AtomicOrdering::SeqCst);
        self.before_call().await?;

        let mut rows = self.with_table(&query.table, |table| {
            table
                .rows
                .iter()
                .filter(|row| matches_all(&query.filters, row))
                .cloned()
                .collect::<Vec<_>>()
        })?;

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if !query.columns.is_empty() {
            for row in rows.iter_mut() {
                row.retain(|column, _| query.columns.iter().any(|c| c == column));
            }
        }

        debug!(table = %query.table, rows = rows.len(), "memory select");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.before_call().await?;

        self.with_table(table, |t| {
            let mut stored = t.def.defaults.clone();
            stored.extend(row);
            stored
                .entry(t.def.primary_key.clone())
                .or_insert_with(|| json!(Uuid::new_v4().to_string()));
            if let Some(column) = &t.def.created_at_column {
                stored
                    .entry(column.clone())
                    .or_insert_with(|| json!(Utc::now().to_rfc3339()));
            }
            t.rows.push(stored.clone());
            stored
        })
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> Result<Vec<Row>> {
        self.before_call().await?;

        self.with_table(table, |t| {
            let mut updated = Vec::new();
            for row in t.rows.iter_mut().filter(|row| matches_all(filters, row)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(row.clone());
            }
            updated
        })
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        self.before_call().await?;

        self.with_table(table, |t| {
            t.rows.retain(|row| !matches_all(filters, row));
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
