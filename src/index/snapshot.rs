//! Point-in-time views of an index.
//!
//! An [`IndexSnapshot`] is the immutable state produced by one commit: the
//! visible segments, the tombstone set and per-field statistics. Readers hold
//! an `Arc<IndexSnapshot>` and never observe later commits.

use std::collections::BTreeMap;
use std::sync::Arc;

use bit_vec::BitVec;

use crate::document::{DocId, FieldValue, StoredDocument};
use crate::error::{PlacedexError, Result};
use crate::index::posting::Posting;
use crate::index::segment::Segment;
use crate::schema::Schema;

/// Corpus statistics of one field over live documents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldStats {
    /// Live documents with a value for the field.
    pub doc_count: u64,
    /// Sum of the field's token counts over those documents.
    pub total_length: u64,
}

impl FieldStats {
    pub fn avg_length(&self) -> f32 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_length as f32 / self.doc_count as f32
        }
    }
}

#[derive(Debug)]
pub struct IndexSnapshot {
    schema: Arc<Schema>,
    timestamp_format: String,
    generation: u64,
    max_doc: DocId,
    segments: Vec<Arc<Segment>>,
    tombstones: BitVec,
    field_stats: BTreeMap<String, FieldStats>,
    num_docs: u64,
}

impl IndexSnapshot {
    /// Assemble a snapshot and compute its statistics.
    pub fn new(
        schema: Arc<Schema>,
        timestamp_format: String,
        generation: u64,
        max_doc: DocId,
        segments: Vec<Arc<Segment>>,
        tombstones: &[DocId],
    ) -> Self {
        let mut deleted = BitVec::from_elem(max_doc as usize, false);
        for &doc_id in tombstones {
            if (doc_id as usize) < deleted.len() {
                deleted.set(doc_id as usize, true);
            }
        }

        let mut snapshot = IndexSnapshot {
            schema,
            timestamp_format,
            generation,
            max_doc,
            segments,
            tombstones: deleted,
            field_stats: BTreeMap::new(),
            num_docs: 0,
        };
        snapshot.compute_stats();
        snapshot
    }

    /// An empty snapshot at generation 0.
    pub fn empty(schema: Arc<Schema>, timestamp_format: String) -> Self {
        Self::new(schema, timestamp_format, 0, 0, Vec::new(), &[])
    }

    fn compute_stats(&mut self) {
        let mut stats: BTreeMap<String, FieldStats> = BTreeMap::new();
        let mut num_docs = 0;

        for segment in &self.segments {
            let live: Vec<bool> = segment
                .doc_ids()
                .iter()
                .map(|&doc_id| !self.is_deleted(doc_id))
                .collect();
            num_docs += live.iter().filter(|&&alive| alive).count() as u64;

            for field in self.schema.fields() {
                let Some(lengths) = segment.field_lengths(&field.name) else {
                    continue;
                };
                let entry = stats.entry(field.name.clone()).or_default();
                for (length, alive) in lengths.iter().zip(&live) {
                    if let (Some(length), true) = (length, alive) {
                        entry.doc_count += 1;
                        entry.total_length += *length as u64;
                    }
                }
            }
        }

        self.field_stats = stats;
        self.num_docs = num_docs;
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn segments(&self) -> &[Arc<Segment>] {
        &self.segments
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// One past the largest doc id ever assigned, including deleted ones.
    pub fn max_doc(&self) -> DocId {
        self.max_doc
    }

    pub fn is_deleted(&self, doc_id: DocId) -> bool {
        self.tombstones.get(doc_id as usize).unwrap_or(false)
    }

    pub fn num_deleted(&self) -> u64 {
        self.tombstones.iter().filter(|&deleted| deleted).count() as u64
    }

    pub fn field_stats(&self, field: &str) -> FieldStats {
        self.field_stats.get(field).copied().unwrap_or_default()
    }

    /// Number of live documents containing `term` in `field`.
    pub fn doc_freq(&self, field: &str, term: &str) -> u64 {
        self.postings(field, term).count() as u64
    }

    /// Live postings of `term` in `field`, in doc id order across segments.
    pub fn postings<'a>(
        &'a self,
        field: &'a str,
        term: &'a str,
    ) -> impl Iterator<Item = &'a Posting> + 'a {
        self.segments
            .iter()
            .filter_map(move |segment| segment.postings(field, term))
            .flat_map(|list| list.iter())
            .filter(move |posting| !self.is_deleted(posting.doc_id))
    }

    /// Token count of `field` in a live document.
    pub fn field_length(&self, field: &str, doc_id: DocId) -> Option<u32> {
        self.segment_of(doc_id)?.field_length(field, doc_id)
    }

    fn segment_of(&self, doc_id: DocId) -> Option<&Arc<Segment>> {
        if doc_id >= self.max_doc || self.is_deleted(doc_id) {
            return None;
        }
        self.segments.iter().find(|segment| segment.contains(doc_id))
    }

    /// Stored fields of a live document.
    pub fn doc(&self, doc_id: DocId) -> Option<StoredDocument> {
        self.segment_of(doc_id)?.stored_document(doc_id)
    }

    /// Every live stored document, in ascending doc id order.
    pub fn documents(&self) -> impl Iterator<Item = StoredDocument> + '_ {
        self.segments.iter().flat_map(move |segment| {
            segment
                .stored_documents()
                .filter(move |(doc_id, _)| !self.is_deleted(*doc_id))
                .map(|(doc_id, fields)| StoredDocument {
                    doc_id,
                    fields: fields.clone(),
                })
        })
    }

    /// Live doc ids in ascending order.
    pub fn live_doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.segments
            .iter()
            .flat_map(|segment| segment.doc_ids().iter().copied())
            .filter(move |&doc_id| !self.is_deleted(doc_id))
    }

    /// Exact lookup: live documents whose `field` holds `value`.
    ///
    /// Text fields match one already-analyzed term; every other type matches
    /// its canonical term (e.g. `"4.5"` for a Numeric field).
    pub fn find_by(&self, field: &str, value: &str) -> Result<Vec<StoredDocument>> {
        let descriptor = self
            .schema
            .field(field)
            .ok_or_else(|| PlacedexError::invalid_argument(format!("Unknown field '{field}'")))?;

        let term = if descriptor.field_type.is_analyzed() {
            value.to_string()
        } else {
            FieldValue::from(value)
                .coerce(descriptor, &self.timestamp_format)
                .map_err(|e| PlacedexError::invalid_argument(e.to_string()))?
                .index_terms(&self.timestamp_format)
                .into_iter()
                .next()
                .unwrap_or_default()
        };

        Ok(self
            .postings(field, &term)
            .filter_map(|posting| self.doc(posting.doc_id))
            .collect())
    }

    /// Live holders of a unique value.
    pub(crate) fn unique_holders(&self, field: &str, value: &str) -> Vec<DocId> {
        self.postings(field, value).map(|p| p.doc_id).collect()
    }
}
