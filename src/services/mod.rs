pub mod listings;
pub mod saved;

pub use listings::ListingService;
pub use saved::SavedListingService;

use crate::error::{Error, Result};
use crate::store::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Encode a model or input as a row
pub(crate) fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(Error::Decode(format!("expected an object, got {other}"))),
    }
}

/// Decode a backend row into a model
pub(crate) fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub(crate) fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}
