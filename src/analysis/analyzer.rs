//! Analyzers combine a tokenizer with token filters.
//!
//! - [`standard::StandardAnalyzer`] - Text fields: words, lowercase, Porter stems, stop words
//! - [`keyword::KeywordAnalyzer`] - exact-valued fields: the whole value as one term
//! - [`pipeline::PipelineAnalyzer`] - any tokenizer with a custom filter chain
//! - [`per_field::PerFieldAnalyzer`] - routes each schema field to its analyzer

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Turns raw text into a token stream.
///
/// Implementations must be deterministic and total: the same input always
/// yields the same tokens, and any string (including an empty one) is
/// accepted.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    fn name(&self) -> &'static str;
}

pub mod keyword;
pub mod per_field;
pub mod pipeline;
pub mod standard;
