//! Postings and posting lists.
//!
//! A posting records one document's occurrences of one term in one field.
//! Posting lists are kept sorted by document id and never change once their
//! segment is committed.

use std::io::{Read, Write};

use crate::document::DocId;
use crate::error::{PlacedexError, Result};
use crate::storage::structured::{StructReader, StructWriter};

/// A single posting in a posting list.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    /// Document ID.
    pub doc_id: DocId,
    /// Term frequency in the document.
    pub frequency: u32,
    /// Ascending token positions of the term in the field.
    pub positions: Vec<u32>,
}

impl Posting {
    /// Create a posting with positions; the frequency is their count.
    pub fn with_positions(doc_id: DocId, positions: Vec<u32>) -> Self {
        Posting {
            doc_id,
            frequency: positions.len() as u32,
            positions,
        }
    }

    /// Add a position to this posting.
    pub fn add_position(&mut self, position: u32) {
        self.positions.push(position);
        self.frequency = self.positions.len() as u32;
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    pub fn has_position(&self, position: u32) -> bool {
        self.positions.binary_search(&position).is_ok()
    }
}

/// The postings of one term, sorted by document id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a posting. Document ids must arrive in ascending order, which
    /// is how segments are built.
    pub fn push(&mut self, posting: Posting) {
        debug_assert!(
            self.postings
                .last()
                .is_none_or(|last| last.doc_id < posting.doc_id)
        );
        self.postings.push(posting);
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// The posting for `doc_id`, if the document contains the term.
    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|index| &self.postings[index])
    }

    /// Total occurrences across all documents.
    pub fn total_frequency(&self) -> u64 {
        self.postings.iter().map(|p| p.frequency as u64).sum()
    }

    /// Encode with delta-compressed document ids and positions.
    pub fn encode<W: Write>(&self, writer: &mut StructWriter<W>) -> Result<()> {
        writer.write_varint(self.postings.len() as u64)?;

        let mut prev_doc_id = 0u64;
        for posting in &self.postings {
            writer.write_varint(posting.doc_id - prev_doc_id)?;
            prev_doc_id = posting.doc_id;
            writer.write_delta_u32s(&posting.positions)?;
        }

        Ok(())
    }

    pub fn decode<R: Read>(reader: &mut StructReader<R>) -> Result<Self> {
        let count = reader.read_len()?;
        let mut postings = Vec::with_capacity(count);
        let mut prev_doc_id = 0u64;

        for index in 0..count {
            let delta = reader.read_varint()?;
            if index > 0 && delta == 0 {
                return Err(PlacedexError::storage("Posting list is not strictly ascending"));
            }
            let doc_id = prev_doc_id
                .checked_add(delta)
                .ok_or_else(|| PlacedexError::storage("Posting doc id overflow"))?;
            prev_doc_id = doc_id;

            let positions = reader.read_delta_u32s()?;
            postings.push(Posting::with_positions(doc_id, positions));
        }

        Ok(PostingList { postings })
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
