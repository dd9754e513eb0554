//! Token types for text analysis.
//!
//! A [`Token`] is the unit that flows through the analysis pipeline: a term,
//! its ordinal position in the source text, and the byte offsets it came from.
//! Tokens are produced at index time and consumed to build postings.
//!
//! ```
//! use placedex::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.position, 1);
//! assert_eq!(token.end_offset, 11);
//! ```

use serde::{Deserialize, Serialize};

/// A single analyzed token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The (normalized) term text.
    pub text: String,

    /// Ordinal position assigned by the tokenizer. Filters that drop tokens
    /// leave gaps rather than renumbering.
    pub position: usize,

    /// Byte offset of the first character in the source text.
    pub start_offset: usize,

    /// Byte offset one past the last character in the source text.
    pub end_offset: usize,

    /// Marked by a stop filter that keeps stopped tokens in the stream.
    pub stopped: bool,
}

impl Token {
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset: 0,
            end_offset: 0,
            stopped: false,
        }
    }

    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            stopped: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Mark the token as a stop word.
    pub fn stop(mut self) -> Self {
        self.stopped = true;
        self
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Replace the text, keeping position and offsets.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }
}

/// A boxed stream of tokens.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;
