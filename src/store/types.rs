use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A table row as the backend returns it
pub type Row = Map<String, Value>;

/// Equality filter on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column) == Some(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering by a single column
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// How many rows a single-row fetch may match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Exactly one row, anything else is an error
    Single,
    /// Zero or one row
    MaybeSingle,
}

impl Strictness {
    /// Reduce a result set to at most one row according to the strictness
    pub fn pick(self, table: &str, mut rows: Vec<Row>) -> Result<Option<Row>> {
        match (self, rows.len()) {
            (_, 1) => Ok(rows.pop()),
            (Strictness::MaybeSingle, 0) => Ok(None),
            (Strictness::Single, 0) => Err(Error::NotFound(format!(
                "JSON object requested, no rows returned from {table}"
            ))),
            (_, n) => Err(Error::Backend {
                message: format!("JSON object requested, multiple ({n}) rows returned from {table}"),
                code: Some("PGRST116".to_string()),
            }),
        }
    }
}

/// Table-scoped select with equality filters and optional ordering
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    /// Projected columns, empty meaning every column
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl SelectQuery {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    /// `select` parameter in PostgREST syntax
    pub fn select_param(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        }
    }
}
