//! Schema module for placedex.
//!
//! A schema is the fixed, ordered set of [`FieldDescriptor`]s of one
//! collection. Schemas are registered by collection name in a
//! [`SchemaRegistry`] and never change after definition.

pub mod collections;
pub mod field;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod schema;

pub use field::{FieldDescriptor, FieldType};
pub use registry::SchemaRegistry;
pub use schema::{Schema, SchemaBuilder};
