//! Removes tokens marked as stopped by an earlier [`StopFilter`].
//!
//! Pairing a marking [`StopFilter`] before the stemmer with this filter after
//! it decides stop-ness on the unstemmed word while keeping stemming from
//! ever seeing stop words.
//!
//! ```
//! use placedex::analysis::token::Token;
//! use placedex::analysis::token_filter::Filter;
//! use placedex::analysis::token_filter::remove_stopped::RemoveStoppedFilter;
//!
//! let tokens = vec![Token::new("wa", 0), Token::new("was", 1).stop(), Token::new("", 2)];
//! let result: Vec<_> = RemoveStoppedFilter::new()
//!     .filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(result.len(), 1);
//! assert_eq!(result[0].text, "wa");
//! ```
//!
//! [`StopFilter`]: crate::analysis::token_filter::stop::StopFilter

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Drops stopped and empty tokens, leaving position gaps behind.
#[derive(Clone, Debug, Default)]
pub struct RemoveStoppedFilter;

impl RemoveStoppedFilter {
    pub fn new() -> Self {
        RemoveStoppedFilter
    }
}

impl Filter for RemoveStoppedFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(Box::new(
            tokens.filter(|token| !token.is_stopped() && !token.is_empty()),
        ))
    }

    fn name(&self) -> &'static str {
        "remove_stopped"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_only_marked_tokens_removed() {
        let tokens = vec![
            Token::new("it", 0),
            Token::new("the", 1).stop(),
            Token::new("ar", 2),
        ];
        let result: Vec<Token> = RemoveStoppedFilter::new()
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .collect();

        let texts: Vec<&str> = result.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["it", "ar"]);
        assert_eq!(result[1].position, 2);
    }
}
