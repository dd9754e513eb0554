//! Pipeline analyzer that combines a tokenizer with token filters.
//!
//! Filters run in the order they were added.
//!
//! ```
//! use std::sync::Arc;
//!
//! use placedex::analysis::Analyzer;
//! use placedex::analysis::analyzer::pipeline::PipelineAnalyzer;
//! use placedex::analysis::token_filter::lowercase::LowercaseFilter;
//! use placedex::analysis::token_filter::stop::StopFilter;
//! use placedex::analysis::tokenizer::regex::RegexTokenizer;
//!
//! let analyzer = PipelineAnalyzer::new(Arc::new(RegexTokenizer::new().unwrap()))
//!     .add_filter(Arc::new(LowercaseFilter::new()))
//!     .add_filter(Arc::new(StopFilter::from_words(vec!["the", "and"])));
//!
//! let tokens: Vec<_> = analyzer.analyze("Hello THE world AND test").unwrap().collect();
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[2].text, "test");
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

#[derive(Clone)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineAnalyzer {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            tokenizer,
            filters: Vec::new(),
        }
    }

    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    /// Names of the tokenizer and filters, in application order.
    pub fn stages(&self) -> Vec<&'static str> {
        std::iter::once(self.tokenizer.name())
            .chain(self.filters.iter().map(|f| f.name()))
            .collect()
    }
}

impl std::fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAnalyzer")
            .field("stages", &self.stages())
            .finish()
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let mut tokens = self.tokenizer.tokenize(text)?;
        for filter in &self.filters {
            tokens = filter.filter(tokens)?;
        }
        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token_filter::lowercase::LowercaseFilter;
    use crate::analysis::tokenizer::whole::WholeTokenizer;

    #[test]
    fn test_pipeline_without_filters() {
        let analyzer = PipelineAnalyzer::new(Arc::new(WholeTokenizer::new()));
        let tokens: Vec<_> = analyzer.analyze("Nashville, TN").unwrap().collect();

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "Nashville, TN");
        assert_eq!(analyzer.stages(), vec!["whole"]);
    }

    #[test]
    fn test_pipeline_stage_order() {
        let analyzer = PipelineAnalyzer::new(Arc::new(WholeTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()));
        let tokens: Vec<_> = analyzer.analyze("Nashville").unwrap().collect();

        assert_eq!(tokens[0].text, "nashville");
        assert_eq!(analyzer.stages(), vec!["whole", "lowercase"]);
        assert_eq!(analyzer.filters().len(), 1);
    }
}
