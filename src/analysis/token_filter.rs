//! Token filters transform token streams produced by tokenizers.
//!
//! - [`lowercase::LowercaseFilter`] - case folding
//! - [`stem::StemFilter`] - reduces words to a root form
//! - [`stop::StopFilter`] - removes or marks stop words
//! - [`remove_stopped::RemoveStoppedFilter`] - drops tokens marked as stopped
//!
//! ```
//! use placedex::analysis::token::Token;
//! use placedex::analysis::token_filter::Filter;
//! use placedex::analysis::token_filter::lowercase::LowercaseFilter;
//!
//! let tokens = vec![Token::new("Hello", 0), Token::new("WORLD", 1)];
//! let filtered: Vec<_> = LowercaseFilter::new()
//!     .filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(filtered[0].text, "hello");
//! assert_eq!(filtered[1].text, "world");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter.
    fn name(&self) -> &'static str;
}

pub mod lowercase;
pub mod remove_stopped;
pub mod stem;
pub mod stop;

pub use lowercase::LowercaseFilter;
pub use remove_stopped::RemoveStoppedFilter;
pub use stem::StemFilter;
pub use stop::StopFilter;
