//! Document structure.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::document::field_value::FieldValue;

/// Internal document identifier, assigned at commit. Identifiers increase
/// monotonically and are never reused within an index.
pub type DocId = u64;

/// Field values of one record, keyed by field name.
///
/// ```
/// use placedex::document::Document;
///
/// let doc = Document::builder()
///     .add_text("business_id", "b1")
///     .add_text("name", "Joe's Pizza")
///     .add_numeric("latitude", 36.115)
///     .add_tags("categories", ["Pizza", "Italian"])
///     .build();
///
/// assert_eq!(doc.len(), 4);
/// assert_eq!(doc.get_field("latitude").and_then(|v| v.as_numeric()), Some(36.115));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            fields: BTreeMap::new(),
        }
    }

    pub fn add_field<S: Into<String>>(&mut self, name: S, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, FieldValue> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }
}

impl FromIterator<(String, FieldValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Document {
            fields: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    pub fn add_text<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document.add_field(name, FieldValue::Text(value.into()));
        self
    }

    pub fn add_numeric<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.document.add_field(name, FieldValue::Numeric(value));
        self
    }

    pub fn add_boolean<S: Into<String>>(mut self, name: S, value: bool) -> Self {
        self.document.add_field(name, FieldValue::Boolean(value));
        self
    }

    pub fn add_tags<S, I, T>(mut self, name: S, tags: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into).collect();
        self.document.add_field(name, FieldValue::Tags(tags));
        self
    }

    pub fn add_timestamp<S: Into<String>>(mut self, name: S, value: NaiveDateTime) -> Self {
        self.document.add_field(name, FieldValue::Timestamp(value));
        self
    }

    pub fn add_field<S: Into<String>>(mut self, name: S, value: FieldValue) -> Self {
        self.document.add_field(name, value);
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}

/// A committed document as returned by readers: its identifier and the
/// values of its stored fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub doc_id: DocId,
    pub fields: Document,
}

impl StoredDocument {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get_field(name)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn get_numeric(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::numeric_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::builder()
            .add_text("review_id", "r1")
            .add_boolean("is_open", true)
            .add_numeric("stars", 4.0)
            .build();

        assert_eq!(doc.len(), 3);
        assert!(doc.has_field("review_id"));
        assert_eq!(doc.get_field("is_open"), Some(&FieldValue::Boolean(true)));
        assert_eq!(
            doc.field_names().collect::<Vec<_>>(),
            vec!["is_open", "review_id", "stars"]
        );
    }

    #[test]
    fn test_document_mutation() {
        let mut doc = Document::new();
        assert!(doc.is_empty());
        doc.add_field("name", FieldValue::from("Mario's"));
        assert_eq!(doc.remove_field("name"), Some(FieldValue::from("Mario's")));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_stored_document_accessors() {
        let stored = StoredDocument {
            doc_id: 7,
            fields: Document::builder()
                .add_text("name", "Joe's Pizza")
                .add_numeric("stars", 4.5)
                .build(),
        };

        assert_eq!(stored.get_text("name"), Some("Joe's Pizza"));
        assert_eq!(stored.get_numeric("stars"), Some(4.5));
        assert_eq!(stored.get_numeric("name"), None);
    }
}
