//! Stop word filter.
//!
//! Matching is whole-token and case-insensitive: a token is removed only when
//! its complete lowercased text is in the stop set, so "The" is removed by
//! "the" while "Theodore" is kept.
//!
//! ```
//! use placedex::analysis::token::Token;
//! use placedex::analysis::token_filter::Filter;
//! use placedex::analysis::token_filter::stop::StopFilter;
//!
//! let filter = StopFilter::from_words(["the", "of"]);
//! let tokens = vec![Token::new("The", 0), Token::new("Theodore", 1), Token::new("of", 2)];
//! let result: Vec<_> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();
//!
//! assert_eq!(result.len(), 1);
//! assert_eq!(result[0].text, "Theodore");
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::config::DEFAULT_STOP_WORDS;
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct StopFilter {
    stop_words: Arc<HashSet<String>>,
    remove_stopped: bool,
}

impl StopFilter {
    /// Filter with the default stop word list.
    pub fn new() -> Self {
        Self::from_words(DEFAULT_STOP_WORDS.iter().copied())
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stop_words = words
            .into_iter()
            .map(|word| word.as_ref().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        StopFilter {
            stop_words: Arc::new(stop_words),
            remove_stopped: true,
        }
    }

    /// Keep stop words in the stream, marked as stopped, instead of dropping them.
    pub fn remove_stopped(mut self, remove: bool) -> Self {
        self.remove_stopped = remove;
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        if word.chars().any(char::is_uppercase) {
            self.stop_words.contains(&word.to_lowercase())
        } else {
            self.stop_words.contains(word)
        }
    }

    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let this = self.clone();
        Ok(Box::new(tokens.filter_map(move |token| {
            if token.is_stopped() || !this.is_stop_word(&token.text) {
                Some(token)
            } else if this.remove_stopped {
                None
            } else {
                Some(token.stop())
            }
        })))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    fn run(filter: &StopFilter, words: &[&str]) -> Vec<Token> {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        filter.filter(Box::new(tokens.into_iter())).unwrap().collect()
    }

    #[test]
    fn test_stop_filter() {
        let filter = StopFilter::from_words(vec!["the", "and", "or"]);
        let result = run(&filter, &["hello", "the", "world", "and", "test"]);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].text, "hello");
        assert_eq!(result[1].text, "world");
        assert_eq!(result[1].position, 2);
        assert_eq!(result[2].text, "test");
    }

    #[test]
    fn test_stop_filter_case_insensitive_whole_token() {
        let filter = StopFilter::from_words(vec!["THE", "a"]);
        let result = run(&filter, &["The", "tHe", "Theodore", "A", "apple", "bathe"]);

        let texts: Vec<&str> = result.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Theodore", "apple", "bathe"]);
    }

    #[test]
    fn test_stop_filter_preserve_stopped() {
        let filter = StopFilter::from_words(vec!["the"]).remove_stopped(false);
        let result = run(&filter, &["hello", "the", "world"]);

        assert_eq!(result.len(), 3);
        assert!(!result[0].is_stopped());
        assert!(result[1].is_stopped());
        assert!(!result[2].is_stopped());
    }

    #[test]
    fn test_default_list_is_not_stemmed() {
        let filter = StopFilter::new();
        assert_eq!(filter.len(), 15);
        assert!(filter.is_stop_word("was"));
        assert!(filter.is_stop_word("ARE"));
        assert!(!filter.is_stop_word("wa"));
        assert!(!filter.is_stop_word("ar"));
    }

    #[test]
    fn test_empty_stop_list() {
        let filter = StopFilter::from_words(Vec::<String>::new());
        assert!(filter.is_empty());
        assert_eq!(run(&filter, &["the", "a"]).len(), 2);
    }
}
