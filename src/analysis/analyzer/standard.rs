//! Standard analyzer for Text fields.
//!
//! # Pipeline
//!
//! 1. RegexTokenizer (`\w+`, Unicode word characters)
//! 2. LowercaseFilter
//! 3. StopFilter (configurable list), marking stop words on the unstemmed text
//! 4. StemFilter (Porter), which passes marked tokens through
//! 5. RemoveStoppedFilter
//!
//! ```
//! use placedex::analysis::{Analyzer, StandardAnalyzer};
//!
//! let analyzer = StandardAnalyzer::new().unwrap();
//! let tokens: Vec<_> = analyzer.analyze("The pizza was AMAZING").unwrap().collect();
//!
//! assert_eq!(tokens.len(), 2);
//! assert_eq!(tokens[0].text, "pizza");
//! assert_eq!(tokens[0].position, 1);
//! assert_eq!(tokens[1].text, "amaz");
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::remove_stopped::RemoveStoppedFilter;
use crate::analysis::token_filter::stem::{PorterStemmer, StemFilter};
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::config::{AnalysisConfig, DEFAULT_STOP_WORDS};
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct StandardAnalyzer {
    inner: PipelineAnalyzer,
}

impl StandardAnalyzer {
    /// Analyzer with the default stop word list.
    pub fn new() -> Result<Self> {
        Self::with_stop_words(DEFAULT_STOP_WORDS.iter().copied())
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        Self::with_stop_words(config.stop_words.iter())
    }

    pub fn with_stop_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stop = StopFilter::from_words(words).remove_stopped(false);
        let inner = PipelineAnalyzer::new(Arc::new(RegexTokenizer::new()?))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(stop))
            .add_filter(Arc::new(StemFilter::with_stemmer(Arc::new(PorterStemmer::new()))))
            .add_filter(Arc::new(RemoveStoppedFilter::new()));

        Ok(StandardAnalyzer { inner })
    }

    pub fn inner(&self) -> &PipelineAnalyzer {
        &self.inner
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_terms;

    #[test]
    fn test_standard_pipeline_order() {
        let analyzer = StandardAnalyzer::new().unwrap();
        assert_eq!(
            analyzer.inner().stages(),
            vec!["regex", "lowercase", "stop", "stem", "remove_stopped"]
        );
    }

    #[test]
    fn test_standard_analyzer() {
        let analyzer = StandardAnalyzer::new().unwrap();
        let terms = analyze_terms(&analyzer, "Joe's Pizza is the BEST pizza in Nashville").unwrap();

        assert_eq!(terms, vec!["joe", "s", "pizza", "best", "pizza", "nashvil"]);
    }

    #[test]
    fn test_stop_words_whole_token_only() {
        let analyzer = StandardAnalyzer::new().unwrap();
        let terms = analyze_terms(&analyzer, "The Theodore THE other").unwrap();

        assert_eq!(terms, vec!["theodor", "other"]);
    }

    #[test]
    fn test_stems_of_stop_words_are_kept() {
        let analyzer = StandardAnalyzer::new().unwrap();
        for (text, expected) in [("WA", "wa"), ("AR", "ar"), ("ars", "ar"), ("its", "it")] {
            assert_eq!(analyze_terms(&analyzer, text).unwrap(), vec![expected], "{text}");
        }
        assert!(analyze_terms(&analyzer, "was ARE It").unwrap().is_empty());
    }

    #[test]
    fn test_positions_keep_gaps() {
        let analyzer = StandardAnalyzer::new().unwrap();
        let tokens: Vec<_> = analyzer.analyze("friendly and fast").unwrap().collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 2);
    }

    #[test]
    fn test_total_and_deterministic() {
        let analyzer = StandardAnalyzer::new().unwrap();
        for text in ["", "   ", "!!!", "Crème brûlée — très bon", "日本語のテキスト", "a the of"] {
            let first = analyze_terms(&analyzer, text).unwrap();
            let second = analyze_terms(&analyzer, text).unwrap();
            assert_eq!(first, second);
        }
        assert!(analyze_terms(&analyzer, "").unwrap().is_empty());
        assert!(analyze_terms(&analyzer, "a the of").unwrap().is_empty());
    }

    #[test]
    fn test_configured_stop_words() {
        let config = AnalysisConfig {
            stop_words: vec!["Pizza".to_string()],
        };
        let analyzer = StandardAnalyzer::from_config(&config).unwrap();

        assert_eq!(analyze_terms(&analyzer, "the pizza place").unwrap(), vec!["the", "place"]);
    }
}
