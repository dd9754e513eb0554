//! Text analysis for placedex.
//!
//! Analyzed text flows through a fixed pipeline: a tokenizer splits raw text
//! into words, then token filters normalize them. The [`StandardAnalyzer`]
//! used for Text fields runs
//!
//! ```text
//! RegexTokenizer (\w+) → LowercaseFilter → StopFilter (mark) → StemFilter (Porter) → RemoveStoppedFilter
//! ```
//!
//! Identifier, TagList and the other exact-valued field types go through the
//! [`KeywordAnalyzer`] instead, which keeps the whole value as one term.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::Analyzer;
pub use analyzer::keyword::KeywordAnalyzer;
pub use analyzer::per_field::PerFieldAnalyzer;
pub use analyzer::pipeline::PipelineAnalyzer;
pub use analyzer::standard::StandardAnalyzer;
pub use token::{Token, TokenStream};

use crate::error::Result;

/// Run `text` through `analyzer` and keep only the term texts.
///
/// ```
/// use placedex::analysis::{analyze_terms, StandardAnalyzer};
///
/// let analyzer = StandardAnalyzer::new().unwrap();
/// assert_eq!(analyze_terms(&analyzer, "The Running Dogs").unwrap(), vec!["run", "dog"]);
/// ```
pub fn analyze_terms(analyzer: &dyn Analyzer, text: &str) -> Result<Vec<String>> {
    Ok(analyzer.analyze(text)?.map(|token| token.text).collect())
}
