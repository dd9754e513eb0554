//! Registry of collection schemas.
//!
//! ```
//! use placedex::schema::{FieldDescriptor, FieldType, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new();
//! registry
//!     .define("places", vec![FieldDescriptor::identifier("business_id").unique(true)])
//!     .unwrap();
//!
//! assert_eq!(registry.field_type("places", "business_id"), Some(FieldType::Identifier));
//! assert!(registry.define("places", vec![FieldDescriptor::text("name")]).is_err());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{PlacedexError, Result};
use crate::schema::field::{FieldDescriptor, FieldType};
use crate::schema::schema::Schema;

/// Thread-safe map from collection name to its immutable schema.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    collections: RwLock<BTreeMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry {
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Define the schema of `collection`. Fails if the field set is invalid or
    /// the collection already has a schema.
    pub fn define<S: Into<String>>(
        &self,
        collection: S,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Arc<Schema>> {
        let collection = collection.into();
        if collection.is_empty() {
            return Err(PlacedexError::schema("Collection name cannot be empty"));
        }

        let schema = Arc::new(Schema::from_fields(fields)?);

        let mut collections = self.collections.write();
        if collections.contains_key(&collection) {
            return Err(PlacedexError::schema(format!(
                "Collection '{collection}' is already defined"
            )));
        }
        collections.insert(collection.clone(), Arc::clone(&schema));
        log::debug!(
            "Defined collection '{collection}' with {} fields",
            schema.len()
        );

        Ok(schema)
    }

    pub fn get(&self, collection: &str) -> Option<Arc<Schema>> {
        self.collections.read().get(collection).cloned()
    }

    /// Type of `name` in `collection`, or `None` if either is unknown.
    pub fn field_type(&self, collection: &str, name: &str) -> Option<FieldType> {
        self.collections
            .read()
            .get(collection)
            .and_then(|schema| schema.field_type(name))
    }

    /// Defined collection names in sorted order.
    pub fn collections(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.collections.read().contains_key(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_lookup() {
        let registry = SchemaRegistry::new();
        let schema = registry
            .define(
                "opinions",
                vec![
                    FieldDescriptor::identifier("review_id").unique(true),
                    FieldDescriptor::text("text"),
                ],
            )
            .unwrap();

        assert_eq!(schema.len(), 2);
        assert!(registry.contains("opinions"));
        assert_eq!(registry.get("opinions").unwrap().as_ref(), schema.as_ref());
        assert_eq!(registry.field_type("opinions", "text"), Some(FieldType::Text));
        assert_eq!(registry.field_type("opinions", "nope"), None);
        assert_eq!(registry.field_type("nope", "text"), None);
    }

    #[test]
    fn test_define_twice_fails() {
        let registry = SchemaRegistry::new();
        registry
            .define("places", vec![FieldDescriptor::text("name")])
            .unwrap();

        let err = registry
            .define("places", vec![FieldDescriptor::text("name")])
            .unwrap_err();
        assert!(matches!(err, PlacedexError::Schema(_)));
        assert_eq!(registry.collections(), vec!["places".to_string()]);
    }

    #[test]
    fn test_invalid_schema_not_registered() {
        let registry = SchemaRegistry::new();
        let result = registry.define(
            "places",
            vec![FieldDescriptor::text("name"), FieldDescriptor::text("name")],
        );

        assert!(result.is_err());
        assert!(!registry.contains("places"));
        assert!(registry.define("", vec![FieldDescriptor::text("a")]).is_err());
    }
}
