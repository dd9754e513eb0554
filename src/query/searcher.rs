//! Query execution against an index snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::document::{DocId, StoredDocument};
use crate::error::{PlacedexError, Result};
use crate::index::posting::PostingList;
use crate::index::segment::Segment;
use crate::index::snapshot::{FieldStats, IndexSnapshot};
use crate::query::collector::{ScoredDoc, TopDocs, TopDocsCollector};
use crate::query::query::Query;
use crate::query::scorer::{Bm25Config, Bm25Scorer};
use crate::schema::FieldDescriptor;

/// Scores per matching document.
type Matches = BTreeMap<DocId, f32>;

/// Searches one snapshot. Results never change for the lifetime of the
/// searcher, whatever is committed meanwhile.
#[derive(Debug, Clone)]
pub struct Searcher {
    snapshot: Arc<IndexSnapshot>,
    scorer: Bm25Scorer,
}

impl Searcher {
    pub fn new(snapshot: Arc<IndexSnapshot>, config: &Bm25Config) -> Self {
        Searcher {
            snapshot,
            scorer: Bm25Scorer::new(config),
        }
    }

    pub fn snapshot(&self) -> &Arc<IndexSnapshot> {
        &self.snapshot
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    pub fn num_docs(&self) -> u64 {
        self.snapshot.num_docs()
    }

    pub fn doc(&self, doc_id: DocId) -> Option<StoredDocument> {
        self.snapshot.doc(doc_id)
    }

    /// Ranked hits for `query`; `None` returns every match.
    pub fn search(&self, query: &Query, limit: Option<usize>) -> Result<TopDocs> {
        let matches = self.evaluate(query)?;

        let mut collector = TopDocsCollector::new(limit);
        for (&doc_id, &score) in &matches {
            collector.collect(doc_id, score);
        }
        let total_hits = collector.total_hits();

        let hits = collector
            .into_ranked()
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.snapshot.doc(doc_id).map(|stored| ScoredDoc {
                    doc_id,
                    score,
                    document: stored.fields,
                })
            })
            .collect();

        log::debug!("query {query} matched {total_hits} docs");
        Ok(TopDocs { total_hits, hits })
    }

    /// Number of live documents matching `query`.
    pub fn count(&self, query: &Query) -> Result<usize> {
        Ok(self.evaluate(query)?.len())
    }

    fn evaluate(&self, query: &Query) -> Result<Matches> {
        match query {
            Query::Term { field, term } => self.term_matches(field, term),
            Query::Phrase { field, terms } => self.phrase_matches(field, terms),
            Query::Boolean {
                must,
                should,
                must_not,
            } => self.boolean_matches(must, should, must_not),
            Query::All => Ok(self.snapshot.live_doc_ids().map(|id| (id, 1.0)).collect()),
            Query::Empty => Ok(Matches::new()),
        }
    }

    fn boolean_matches(&self, must: &[Query], should: &[Query], must_not: &[Query]) -> Result<Matches> {
        let mut matches = match must.split_first() {
            Some((first, rest)) => {
                let mut matches = self.evaluate(first)?;
                for clause in rest {
                    if matches.is_empty() {
                        break;
                    }
                    let other = self.evaluate(clause)?;
                    matches.retain(|doc_id, _| other.contains_key(doc_id));
                    for (doc_id, score) in matches.iter_mut() {
                        *score += other[doc_id];
                    }
                }
                for clause in should {
                    for (doc_id, score) in self.evaluate(clause)? {
                        if let Some(total) = matches.get_mut(&doc_id) {
                            *total += score;
                        }
                    }
                }
                matches
            }
            None => {
                let mut matches = Matches::new();
                for clause in should {
                    for (doc_id, score) in self.evaluate(clause)? {
                        *matches.entry(doc_id).or_insert(0.0) += score;
                    }
                }
                matches
            }
        };

        for clause in must_not {
            if matches.is_empty() {
                break;
            }
            for doc_id in self.evaluate(clause)?.keys() {
                matches.remove(doc_id);
            }
        }
        Ok(matches)
    }

    fn field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.snapshot
            .schema()
            .field(name)
            .ok_or_else(|| PlacedexError::invalid_argument(format!("Unknown field '{name}'")))
    }

    /// `len / avglen`, or 1.0 where lengths are not normalized.
    fn length_ratio(
        &self,
        segment: &Segment,
        field: &str,
        doc_id: DocId,
        stats: &FieldStats,
        normalize: bool,
    ) -> f32 {
        let avg = stats.avg_length();
        if !normalize || avg <= 0.0 {
            return 1.0;
        }
        segment.field_length(field, doc_id).unwrap_or(0) as f32 / avg
    }

    fn term_matches(&self, field: &str, term: &str) -> Result<Matches> {
        let normalize = self.field(field)?.field_type.is_analyzed();
        let mut matches = Matches::new();

        let doc_freq = self.snapshot.doc_freq(field, term);
        if doc_freq == 0 {
            return Ok(matches);
        }
        let stats = self.snapshot.field_stats(field);
        let idf = Bm25Scorer::idf(stats.doc_count, doc_freq);

        for segment in self.snapshot.segments() {
            let Some(postings) = segment.postings(field, term) else {
                continue;
            };
            for posting in postings {
                if self.snapshot.is_deleted(posting.doc_id) {
                    continue;
                }
                let ratio = self.length_ratio(segment, field, posting.doc_id, &stats, normalize);
                let score = self.scorer.score(field, idf, posting.frequency, ratio);
                matches.insert(posting.doc_id, score);
            }
        }
        Ok(matches)
    }

    fn phrase_matches(&self, field: &str, terms: &[(u32, String)]) -> Result<Matches> {
        match terms {
            [] => return Ok(Matches::new()),
            [(_, term)] => return self.term_matches(field, term),
            _ => {}
        }
        let normalize = self.field(field)?.field_type.is_analyzed();
        let mut matches = Matches::new();

        let stats = self.snapshot.field_stats(field);
        let mut idf = 0.0;
        for (_, term) in terms {
            let doc_freq = self.snapshot.doc_freq(field, term);
            if doc_freq == 0 {
                return Ok(matches);
            }
            idf += Bm25Scorer::idf(stats.doc_count, doc_freq);
        }

        for segment in self.snapshot.segments() {
            let lists: Option<Vec<(i64, &PostingList)>> = terms
                .iter()
                .map(|(offset, term)| {
                    segment
                        .postings(field, term)
                        .map(|list| (*offset as i64, list))
                })
                .collect();
            let Some(lists) = lists else {
                continue;
            };
            let Some(((first_offset, first), rest)) = lists.split_first() else {
                continue;
            };

            for posting in *first {
                if self.snapshot.is_deleted(posting.doc_id) {
                    continue;
                }
                let Some(others) = rest
                    .iter()
                    .map(|(offset, list)| list.get(posting.doc_id).map(|p| (offset - first_offset, p)))
                    .collect::<Option<Vec<_>>>()
                else {
                    continue;
                };

                let frequency = posting
                    .positions()
                    .iter()
                    .filter(|&&start| {
                        others.iter().all(|(delta, other)| {
                            u32::try_from(start as i64 + delta)
                                .is_ok_and(|position| other.has_position(position))
                        })
                    })
                    .count() as u32;
                if frequency == 0 {
                    continue;
                }

                let ratio = self.length_ratio(segment, field, posting.doc_id, &stats, normalize);
                matches.insert(posting.doc_id, self.scorer.score(field, idf, frequency, ratio));
            }
        }
        Ok(matches)
    }
}
