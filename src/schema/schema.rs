//! Collection schema: an ordered, validated set of field descriptors.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::{KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};
use crate::config::AnalysisConfig;
use crate::error::{PlacedexError, Result};
use crate::schema::field::{FieldDescriptor, FieldType};

/// Serialized form of a schema, persisted as the index's schema descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub fields: Vec<FieldDescriptor>,
}

/// The immutable field set of one collection.
///
/// Field order is the definition order. Construction validates that names
/// are non-empty and distinct and that uniqueness is only declared on a
/// single Identifier field.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "SchemaDescriptor", into = "SchemaDescriptor")]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Build and validate a schema from descriptors.
    pub fn from_fields(fields: Vec<FieldDescriptor>) -> Result<Self> {
        if fields.is_empty() {
            return Err(PlacedexError::schema("Schema must have at least one field"));
        }

        let mut positions = HashMap::with_capacity(fields.len());
        let mut unique_field: Option<&str> = None;

        for (position, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(PlacedexError::schema("Field name cannot be empty"));
            }
            if positions.insert(field.name.clone(), position).is_some() {
                return Err(PlacedexError::schema(format!(
                    "Field '{}' already exists",
                    field.name
                )));
            }
            if field.unique {
                if field.field_type != FieldType::Identifier {
                    return Err(PlacedexError::schema(format!(
                        "Field '{}' is {} but only identifier fields can be unique",
                        field.name, field.field_type
                    )));
                }
                if let Some(existing) = unique_field {
                    return Err(PlacedexError::schema(format!(
                        "Fields '{existing}' and '{}' are both unique; at most one unique field is allowed",
                        field.name
                    )));
                }
                unique_field = Some(&field.name);
            }
        }

        Ok(Schema { fields, positions })
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.positions.get(name).map(|&i| &self.fields[i])
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.field(name).map(|field| field.field_type)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// The single unique field, if one is declared.
    pub fn unique_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.unique)
    }

    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.stored)
    }

    pub fn text_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|field| field.field_type.is_analyzed())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Analyzers for every field: the standard pipeline for Text fields and
    /// whole-value keywords for everything else.
    pub fn analyzers(&self, config: &AnalysisConfig) -> Result<PerFieldAnalyzer> {
        let standard = Arc::new(StandardAnalyzer::from_config(config)?);
        let mut analyzers = PerFieldAnalyzer::new(Arc::new(KeywordAnalyzer::new()));
        for field in self.text_fields() {
            analyzers.add_analyzer(field.name.clone(), standard.clone());
        }
        Ok(analyzers)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl TryFrom<SchemaDescriptor> for Schema {
    type Error = PlacedexError;

    fn try_from(descriptor: SchemaDescriptor) -> Result<Self> {
        Schema::from_fields(descriptor.fields)
    }
}

impl From<Schema> for SchemaDescriptor {
    fn from(schema: Schema) -> Self {
        SchemaDescriptor {
            fields: schema.fields,
        }
    }
}

/// Incremental schema construction; validation runs in [`SchemaBuilder::build`].
///
/// ```
/// use placedex::schema::{FieldDescriptor, Schema};
///
/// let schema = Schema::builder()
///     .add_field(FieldDescriptor::identifier("business_id").stored(true).unique(true))
///     .add_field(FieldDescriptor::text("name").stored(true))
///     .build()
///     .unwrap();
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.unique_field().unwrap().name, "business_id");
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        SchemaBuilder { fields: Vec::new() }
    }

    pub fn add_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<Schema> {
        Schema::from_fields(self.fields)
    }
}
