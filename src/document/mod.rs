//! Documents: the field values of one record.
//!
//! Raw records arrive as [`Document`]s whose values may not yet match the
//! schema (a numeric rating given as text, tags as one comma-joined string).
//! The index writer coerces them with [`FieldValue::coerce`] before staging.

pub mod document;
pub mod field_value;
pub mod json;

pub use document::{DocId, Document, DocumentBuilder, StoredDocument};
pub use field_value::FieldValue;
pub use json::JsonDocumentConverter;
