//! BM25F relevance scoring.
//!
//! One matched `(field, term)` leaf contributes
//!
//! ```text
//! w_f · idf · tf·(k1+1) / (tf + k1·(1 − b + b·len/avglen))
//! ```
//!
//! with `idf = ln(1 + (N − df + 0.5)/(df + 0.5))`, where `N` is the number of
//! live documents carrying the field and `df` the number containing the term.

use std::collections::BTreeMap;

use crate::config::ScoringConfig;

/// BM25F parameters; the same structure as [`ScoringConfig`].
pub type Bm25Config = ScoringConfig;

#[derive(Debug, Clone)]
pub struct Bm25Scorer {
    k1: f32,
    b: f32,
    field_weights: BTreeMap<String, f32>,
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Self::new(&Bm25Config::default())
    }
}

impl Bm25Scorer {
    pub fn new(config: &Bm25Config) -> Self {
        Bm25Scorer {
            k1: config.k1,
            b: config.b,
            field_weights: config.field_weights.clone(),
        }
    }

    pub fn k1(&self) -> f32 {
        self.k1
    }

    pub fn b(&self) -> f32 {
        self.b
    }

    /// Weight of `field`; unlisted fields weigh 1.0.
    pub fn field_weight(&self, field: &str) -> f32 {
        self.field_weights.get(field).copied().unwrap_or(1.0)
    }

    /// Inverse document frequency. Always positive, even for terms present in
    /// every document.
    pub fn idf(doc_count: u64, doc_freq: u64) -> f32 {
        let n = doc_count as f64;
        let df = doc_freq as f64;
        let ratio = ((n - df + 0.5) / (df + 0.5)).max(0.0);
        (1.0 + ratio).ln() as f32
    }

    /// Contribution of one leaf.
    ///
    /// `length_ratio` is `len / avglen` for the document's field; pass 1.0 to
    /// disable length normalization.
    pub fn score(&self, field: &str, idf: f32, term_freq: u32, length_ratio: f32) -> f32 {
        if term_freq == 0 {
            return 0.0;
        }
        let tf = term_freq as f32;
        let norm = self.k1 * (1.0 - self.b + self.b * length_ratio);
        self.field_weight(field) * idf * (tf * (self.k1 + 1.0)) / (tf + norm)
    }
}
