//! Field descriptors and the closed set of field types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The type of a schema field, resolved once at schema definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Exact atomic value, e.g. a record key.
    Identifier,
    /// Free text run through the analysis pipeline.
    Text,
    /// Floating point number.
    Numeric,
    /// True or false.
    Boolean,
    /// Comma-delimited list of atomic tags.
    TagList,
    /// Date and time in the index's fixed timestamp format.
    Timestamp,
}

impl FieldType {
    /// Only Text fields are tokenized; every other type indexes exact terms.
    pub fn is_analyzed(&self) -> bool {
        matches!(self, FieldType::Text)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Identifier => "identifier",
            FieldType::Text => "text",
            FieldType::Numeric => "numeric",
            FieldType::Boolean => "boolean",
            FieldType::TagList => "tag_list",
            FieldType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One field of a collection schema.
///
/// ```
/// use placedex::schema::{FieldDescriptor, FieldType};
///
/// let field = FieldDescriptor::identifier("business_id").stored(true).unique(true);
/// assert_eq!(field.field_type, FieldType::Identifier);
/// assert!(field.unique);
/// assert!(!field.required);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,

    /// Value is retrievable verbatim from search results.
    #[serde(default)]
    pub stored: bool,

    /// No two live documents may share this field's value. Identifier only.
    #[serde(default)]
    pub unique: bool,

    /// Records without this field are rejected.
    #[serde(default)]
    pub required: bool,
}

impl FieldDescriptor {
    pub fn new<S: Into<String>>(name: S, field_type: FieldType) -> Self {
        FieldDescriptor {
            name: name.into(),
            field_type,
            stored: false,
            unique: false,
            required: false,
        }
    }

    pub fn identifier<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Identifier)
    }

    pub fn text<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn numeric<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Numeric)
    }

    pub fn boolean<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn tag_list<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::TagList)
    }

    pub fn timestamp<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    pub fn stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_analysis() {
        assert!(FieldType::Text.is_analyzed());
        assert!(!FieldType::Identifier.is_analyzed());
        assert!(!FieldType::TagList.is_analyzed());
        assert_eq!(FieldType::TagList.to_string(), "tag_list");
    }

    #[test]
    fn test_descriptor_builders() {
        let field = FieldDescriptor::timestamp("date").stored(true).required(true);
        assert_eq!(field.name, "date");
        assert_eq!(field.field_type, FieldType::Timestamp);
        assert!(field.stored);
        assert!(field.required);
        assert!(!field.unique);
    }

    #[test]
    fn test_descriptor_serde_defaults() {
        let field: FieldDescriptor =
            serde_json::from_str(r#"{"name": "stars", "field_type": "Numeric"}"#).unwrap();
        assert_eq!(field, FieldDescriptor::numeric("stars"));
    }
}
