//! Collecting ranked results.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::document::{DocId, Document};

/// A ranked search hit with its stored fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
    pub document: Document,
}

/// Ranked hits, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopDocs {
    /// Number of matching documents before truncation.
    pub total_hits: usize,
    pub hits: Vec<ScoredDoc>,
}

impl TopDocs {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn doc_ids(&self) -> Vec<DocId> {
        self.hits.iter().map(|hit| hit.doc_id).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    doc_id: DocId,
    score: f32,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Greater means worse: lower score, then higher doc id.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Keeps the best `limit` documents: descending score, ties broken by
/// ascending doc id.
#[derive(Debug)]
pub struct TopDocsCollector {
    limit: Option<usize>,
    /// Max-heap on [`Entry`] order, so the worst kept hit is on top.
    hits: BinaryHeap<Entry>,
    total_hits: usize,
}

impl TopDocsCollector {
    /// `None` keeps every hit.
    pub fn new(limit: Option<usize>) -> Self {
        TopDocsCollector {
            limit,
            hits: BinaryHeap::new(),
            total_hits: 0,
        }
    }

    pub fn collect(&mut self, doc_id: DocId, score: f32) {
        self.total_hits += 1;
        let entry = Entry { doc_id, score };

        match self.limit {
            Some(limit) if self.hits.len() >= limit => {
                if self.hits.peek().is_some_and(|worst| entry < *worst) {
                    self.hits.pop();
                    self.hits.push(entry);
                }
            }
            _ => self.hits.push(entry),
        }
    }

    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Kept `(doc_id, score)` pairs, best first.
    pub fn into_ranked(self) -> Vec<(DocId, f32)> {
        self.hits
            .into_sorted_vec()
            .into_iter()
            .map(|entry| (entry.doc_id, entry.score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_and_tie_break() {
        let mut collector = TopDocsCollector::new(None);
        collector.collect(4, 1.0);
        collector.collect(1, 2.5);
        collector.collect(2, 1.0);
        collector.collect(0, 1.0);

        assert_eq!(collector.total_hits(), 4);
        assert_eq!(
            collector.into_ranked(),
            vec![(1, 2.5), (0, 1.0), (2, 1.0), (4, 1.0)]
        );
    }

    #[test]
    fn test_limit() {
        let mut collector = TopDocsCollector::new(Some(2));
        for (doc_id, score) in [(0, 0.5), (1, 3.0), (2, 1.0), (3, 3.0), (4, 0.1)] {
            collector.collect(doc_id, score);
        }
        assert_eq!(collector.total_hits(), 5);
        assert_eq!(collector.into_ranked(), vec![(1, 3.0), (3, 3.0)]);

        let mut none = TopDocsCollector::new(Some(0));
        none.collect(1, 1.0);
        assert_eq!(none.total_hits(), 1);
        assert!(none.into_ranked().is_empty());
    }
}
