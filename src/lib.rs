//! # Placedex
//!
//! A local full-text, structured and geospatial search library for places and
//! the opinions written about them.
//!
//! ## Features
//!
//! - Fixed per-collection schemas with typed fields and one unique identifier
//! - Text analysis: word tokenizer, lowercase, Porter stemmer, stop words
//! - Batch index writers with atomic, retryable commits
//! - Snapshot-isolated readers that never block on commits
//! - Chunked and parallel bulk ingestion
//! - BM25F relevance scoring
//! - Radius filtering by haversine distance
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use placedex::config::IndexConfig;
//! use placedex::document::Document;
//! use placedex::index::{Index, UniquePolicy};
//! use placedex::query::{GeoFilter, QueryPoint};
//! use placedex::schema::{SchemaRegistry, collections};
//! use placedex::storage::MemoryStorage;
//!
//! let registry = SchemaRegistry::new();
//! collections::define_defaults(&registry).unwrap();
//! let schema = registry.get("places").unwrap();
//!
//! let index = Index::create(Arc::new(MemoryStorage::new()), schema, IndexConfig::default()).unwrap();
//! let mut writer = index.writer(UniquePolicy::Reject).unwrap();
//! writer
//!     .stage(
//!         Document::builder()
//!             .add_text("business_id", "b1")
//!             .add_text("name", "Joe's Pizza")
//!             .add_numeric("latitude", 36.17)
//!             .add_numeric("longitude", -115.14)
//!             .build(),
//!     )
//!     .unwrap();
//! writer.commit().unwrap();
//!
//! let searcher = index.searcher();
//! let query = index.query_parser().parse("pizza").unwrap();
//! let top = searcher.search(&query, Some(10)).unwrap();
//! assert_eq!(top.hits[0].document.get_field("name").and_then(|v| v.as_text()), Some("Joe's Pizza"));
//!
//! let nearby = GeoFilter::default()
//!     .combined(&searcher, &query, &QueryPoint::new(36.1, -115.1, 25.0).unwrap())
//!     .unwrap();
//! assert_eq!(nearby.len(), 1);
//! ```

pub mod analysis;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod schema;
pub mod storage;
pub mod util;

pub mod prelude {
    pub use crate::config::IndexConfig;
    pub use crate::document::{DocId, Document, FieldValue, StoredDocument};
    pub use crate::error::{PlacedexError, Result};
    pub use crate::index::{ChunkedIngestor, Index, IndexWriter, UniquePolicy};
    pub use crate::query::{GeoFilter, Query, QueryParser, QueryPoint, Searcher};
    pub use crate::schema::{FieldDescriptor, FieldType, Schema, SchemaRegistry};
    pub use crate::storage::{FileStorage, MemoryStorage, Storage};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
