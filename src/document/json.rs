//! JSON record conversion.
//!
//! Turns one JSON object (one line of a record file) into a raw [`Document`]
//! against a schema. Reading the lines themselves is up to the caller.
//!
//! ```
//! use placedex::document::{FieldValue, JsonDocumentConverter};
//! use placedex::schema::collections::places_schema;
//!
//! let schema = places_schema().unwrap();
//! let doc = JsonDocumentConverter::new()
//!     .convert_str(r#"{"business_id": "b1", "stars": 4.5, "hours": {"Monday": "9:0-17:0"}}"#, &schema)
//!     .unwrap();
//!
//! assert_eq!(doc.get_field("stars"), Some(&FieldValue::Numeric(4.5)));
//! assert_eq!(doc.get_field("hours"), Some(&FieldValue::from(r#"{"Monday":"9:0-17:0"}"#)));
//! ```

use serde_json::Value;

use crate::document::document::Document;
use crate::document::field_value::FieldValue;
use crate::error::{PlacedexError, Result};
use crate::schema::Schema;

#[derive(Debug, Clone, Default)]
pub struct JsonDocumentConverter;

impl JsonDocumentConverter {
    pub fn new() -> Self {
        JsonDocumentConverter
    }

    /// Convert a parsed JSON object. Keys not declared in `schema` are
    /// ignored and `null` values are treated as absent.
    pub fn convert(&self, value: &Value, schema: &Schema) -> Result<Document> {
        let Value::Object(map) = value else {
            return Err(PlacedexError::invalid_argument(format!(
                "Expected a JSON object record, got {}",
                json_kind(value)
            )));
        };

        let mut doc = Document::new();
        for (key, val) in map {
            if !schema.has_field(key) {
                continue;
            }
            if let Some(field_value) = Self::field_value(val) {
                doc.add_field(key.clone(), field_value);
            }
        }
        Ok(doc)
    }

    /// Parse and convert one JSON line.
    pub fn convert_str(&self, input: &str, schema: &Schema) -> Result<Document> {
        let value: Value = serde_json::from_str(input)?;
        self.convert(&value, schema)
    }

    fn field_value(value: &Value) -> Option<FieldValue> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Number(n) => Some(match n.as_f64() {
                Some(f) => FieldValue::Numeric(f),
                None => FieldValue::Text(n.to_string()),
            }),
            Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            Value::Array(items) if items.iter().all(Value::is_string) => Some(FieldValue::Tags(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            )),
            other => Some(FieldValue::Text(other.to_string())),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
