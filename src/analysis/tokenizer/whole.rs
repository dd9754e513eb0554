//! Tokenizer that keeps the entire input as one token.

use super::Tokenizer;
use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// Emits the input unchanged as a single token, or nothing for empty input.
#[derive(Clone, Debug, Default)]
pub struct WholeTokenizer;

impl WholeTokenizer {
    pub fn new() -> Self {
        WholeTokenizer
    }
}

impl Tokenizer for WholeTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        if text.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        let token = Token::with_offsets(text, 0, 0, text.len());
        Ok(Box::new(std::iter::once(token)))
    }

    fn name(&self) -> &'static str {
        "whole"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_tokenizer() {
        let tokens: Vec<Token> = WholeTokenizer::new()
            .tokenize("b1-Joe's Pizza")
            .unwrap()
            .collect();

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "b1-Joe's Pizza");
        assert_eq!(tokens[0].end_offset, 14);
    }

    #[test]
    fn test_whole_tokenizer_empty() {
        assert_eq!(WholeTokenizer::new().tokenize("").unwrap().count(), 0);
    }
}
