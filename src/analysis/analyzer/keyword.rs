//! Keyword analyzer that treats the entire input as a single term.
//!
//! Used for Identifier fields and for the canonical terms of every other
//! exact-valued field type.
//!
//! ```
//! use placedex::analysis::{Analyzer, KeywordAnalyzer};
//!
//! let tokens: Vec<_> = KeywordAnalyzer::new().analyze("b1-XyZ").unwrap().collect();
//! assert_eq!(tokens.len(), 1);
//! assert_eq!(tokens[0].text, "b1-XyZ");
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::tokenizer::whole::WholeTokenizer;
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct KeywordAnalyzer {
    inner: PipelineAnalyzer,
}

impl KeywordAnalyzer {
    pub fn new() -> Self {
        KeywordAnalyzer {
            inner: PipelineAnalyzer::new(Arc::new(WholeTokenizer::new())),
        }
    }
}

impl Default for KeywordAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
