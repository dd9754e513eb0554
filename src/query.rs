//! Query parsing, execution and scoring.
//!
//! A query string is parsed by a [`QueryParser`] into a [`Query`] tree,
//! evaluated by a [`Searcher`] against one index snapshot and ranked with
//! BM25F. [`GeoFilter`] narrows documents or ranked hits to a radius.

pub mod collector;
pub mod geo;
pub mod parser;
#[allow(clippy::module_inception)]
pub mod query;
pub mod scorer;
pub mod searcher;

pub use collector::{ScoredDoc, TopDocs, TopDocsCollector};
pub use geo::{COMBINED_TEXT_LIMIT, GeoFilter, GeoHit, GeoPoint, QueryPoint};
pub use parser::QueryParser;
pub use query::Query;
pub use scorer::{Bm25Config, Bm25Scorer};
pub use searcher::Searcher;
