//! Tokenizers split raw text into tokens.
//!
//! - [`regex::RegexTokenizer`] - word tokens matched by a regular expression
//! - [`whole::WholeTokenizer`] - the entire input as a single token

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer.
    fn name(&self) -> &'static str;
}

pub mod regex;
pub mod whole;

pub use regex::RegexTokenizer;
pub use whole::WholeTokenizer;
