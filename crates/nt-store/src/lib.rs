//! # nt-store — The "Engine" of Natours
//!
//! In-memory JSON document collections. A [`Collection`] hands out [`Find`]
//! handles that implement [`nt_query::QueryHandle`], so a list query is
//! shaped by the builder and only touches the data when [`Find::exec`] runs.

pub mod collection;
pub mod error;
pub mod eval;
pub mod find;

pub use collection::Collection;
pub use error::StoreError;
pub use find::Find;

/// A stored JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field holding each document's identifier.
pub const ID_FIELD: &str = "id";

/// Turn an arbitrary JSON value into a [`Document`].
pub fn document_from_value(value: serde_json::Value) -> Result<Document, StoreError> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
