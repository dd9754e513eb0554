//! Immutable segments.
//!
//! A segment holds a closed, ascending run of documents: their stored field
//! values, per-field token counts and a per-field term dictionary. Segments
//! are built in memory by [`SegmentBuilder`], written once as
//! `seg_<uuid>.seg` and only ever read afterwards.
//!
//! File layout (all varints LEB128, integers little-endian):
//!
//! ```text
//! magic "PDXSEG" | version u32 | segment id
//! doc ids (delta) | stored documents (bincode, length-prefixed)
//! field lengths: [field name, per doc (length + 1, 0 = absent)]
//! terms: [field name, [term, posting list]]
//! crc32
//! ```

use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::document::{DocId, Document, StoredDocument};
use crate::error::{PlacedexError, Result};
use crate::index::posting::{Posting, PostingList};
use crate::index::writer::PreparedDocument;
use crate::storage::structured::{StructReader, StructWriter};
use crate::storage::{Storage, StorageInput, StorageOutput};

const MAGIC: &[u8; 6] = b"PDXSEG";
const VERSION: u32 = 1;

/// File name for a segment id.
pub fn segment_file_name(segment_id: &str) -> String {
    format!("seg_{segment_id}.seg")
}

/// An immutable committed segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    id: String,
    doc_ids: Vec<DocId>,
    stored: Vec<Document>,
    field_lengths: BTreeMap<String, Vec<Option<u32>>>,
    terms: BTreeMap<String, BTreeMap<String, PostingList>>,
}

impl Segment {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> String {
        segment_file_name(&self.id)
    }

    pub fn doc_count(&self) -> usize {
        self.doc_ids.len()
    }

    /// Document ids in ascending order.
    pub fn doc_ids(&self) -> &[DocId] {
        &self.doc_ids
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.ordinal(doc_id).is_some()
    }

    fn ordinal(&self, doc_id: DocId) -> Option<usize> {
        self.doc_ids.binary_search(&doc_id).ok()
    }

    /// Stored fields of `doc_id`, ignoring tombstones.
    pub fn stored_document(&self, doc_id: DocId) -> Option<StoredDocument> {
        let ordinal = self.ordinal(doc_id)?;
        Some(StoredDocument {
            doc_id,
            fields: self.stored[ordinal].clone(),
        })
    }

    /// Stored documents in doc id order.
    pub fn stored_documents(&self) -> impl Iterator<Item = (DocId, &Document)> {
        self.doc_ids.iter().copied().zip(self.stored.iter())
    }

    /// Token count of `field` in `doc_id`, or `None` when the document has no value.
    pub fn field_length(&self, field: &str, doc_id: DocId) -> Option<u32> {
        let ordinal = self.ordinal(doc_id)?;
        self.field_lengths.get(field)?.get(ordinal).copied().flatten()
    }

    /// Per-document lengths of `field`, parallel to [`doc_ids`](Self::doc_ids).
    pub fn field_lengths(&self, field: &str) -> Option<&[Option<u32>]> {
        self.field_lengths.get(field).map(Vec::as_slice)
    }

    pub fn postings(&self, field: &str, term: &str) -> Option<&PostingList> {
        self.terms.get(field)?.get(term)
    }

    /// Term dictionary of one field.
    pub fn terms(&self, field: &str) -> Option<&BTreeMap<String, PostingList>> {
        self.terms.get(field)
    }

    /// Write this segment to `storage` and sync it.
    pub fn write(&self, storage: &dyn Storage) -> Result<()> {
        let output = storage.create_output(&self.file_name())?;
        let mut writer = StructWriter::new(output);

        writer.write_raw(MAGIC)?;
        writer.write_u32(VERSION)?;
        writer.write_string(&self.id)?;

        writer.write_delta_u64s(&self.doc_ids)?;
        for document in &self.stored {
            writer.write_bytes(&bincode::serialize(document)?)?;
        }

        writer.write_varint(self.field_lengths.len() as u64)?;
        for (field, lengths) in &self.field_lengths {
            writer.write_string(field)?;
            for length in lengths {
                writer.write_varint(length.map_or(0, |len| len as u64 + 1))?;
            }
        }

        writer.write_varint(self.terms.len() as u64)?;
        for (field, dictionary) in &self.terms {
            writer.write_string(field)?;
            writer.write_varint(dictionary.len() as u64)?;
            for (term, postings) in dictionary {
                writer.write_string(term)?;
                postings.encode(&mut writer)?;
            }
        }

        let mut output = writer.finish()?;
        output.flush_and_sync()?;

        log::debug!(
            "wrote segment {} ({} docs, {} bytes)",
            self.id,
            self.doc_count(),
            output.position()
        );
        Ok(())
    }

    /// Read and checksum-verify the segment `segment_id`.
    pub fn read(storage: &dyn Storage, segment_id: &str) -> Result<Self> {
        let name = segment_file_name(segment_id);
        let input = storage.open_input(&name)?;
        let size = input.size()?;
        let mut reader = StructReader::new(input, size)?;

        let magic = reader.read_raw(MAGIC.len())?;
        if magic != MAGIC {
            return Err(PlacedexError::storage(format!("{name} is not a segment file")));
        }
        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(PlacedexError::storage(format!(
                "{name} has unsupported version {version}"
            )));
        }
        let id = reader.read_string()?;
        if id != segment_id {
            return Err(PlacedexError::storage(format!(
                "{name} holds segment '{id}'"
            )));
        }

        let doc_ids = reader.read_delta_u64s()?;
        if doc_ids.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(PlacedexError::storage(format!(
                "{name} doc ids are not strictly ascending"
            )));
        }

        let mut stored = Vec::with_capacity(doc_ids.len());
        for _ in &doc_ids {
            stored.push(bincode::deserialize(&reader.read_bytes()?)?);
        }

        let field_count = reader.read_len()?;
        let mut field_lengths = BTreeMap::new();
        for _ in 0..field_count {
            let field = reader.read_string()?;
            let mut lengths = Vec::with_capacity(doc_ids.len());
            for _ in &doc_ids {
                let raw = reader.read_varint()?;
                lengths.push(raw.checked_sub(1).map(|len| len as u32));
            }
            field_lengths.insert(field, lengths);
        }

        let field_count = reader.read_len()?;
        let mut terms = BTreeMap::new();
        for _ in 0..field_count {
            let field = reader.read_string()?;
            let term_count = reader.read_len()?;
            let mut dictionary = BTreeMap::new();
            for _ in 0..term_count {
                let term = reader.read_string()?;
                dictionary.insert(term, PostingList::decode(&mut reader)?);
            }
            terms.insert(field, dictionary);
        }

        reader
            .verify_checksum()
            .map_err(|e| PlacedexError::storage(format!("{name}: {e}")))?;

        Ok(Segment {
            id,
            doc_ids,
            stored,
            field_lengths,
            terms,
        })
    }
}

/// Accumulates prepared documents into a [`Segment`].
#[derive(Debug)]
pub struct SegmentBuilder {
    id: String,
    doc_ids: Vec<DocId>,
    stored: Vec<Document>,
    field_lengths: AHashMap<String, Vec<Option<u32>>>,
    terms: AHashMap<String, AHashMap<String, PostingList>>,
}

impl SegmentBuilder {
    pub fn new<S: Into<String>>(id: S) -> Self {
        SegmentBuilder {
            id: id.into(),
            doc_ids: Vec::new(),
            stored: Vec::new(),
            field_lengths: AHashMap::new(),
            terms: AHashMap::new(),
        }
    }

    /// Start a builder with a fresh random id.
    pub fn with_random_id() -> Self {
        Self::new(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Add a document. Ids must be strictly ascending.
    pub fn add(&mut self, doc_id: DocId, document: &PreparedDocument) -> Result<()> {
        if self.doc_ids.last().is_some_and(|&last| last >= doc_id) {
            return Err(PlacedexError::invalid_argument(format!(
                "doc id {doc_id} is not ascending"
            )));
        }

        let ordinal = self.doc_ids.len();
        self.doc_ids.push(doc_id);
        self.stored.push(document.stored().clone());

        for (field, analyzed) in document.fields() {
            let lengths = self.field_lengths.entry(field.clone()).or_default();
            lengths.resize(ordinal, None);
            lengths.push(Some(analyzed.length));

            let mut by_term: AHashMap<&str, Vec<u32>> = AHashMap::new();
            for (term, position) in &analyzed.terms {
                by_term.entry(term.as_str()).or_default().push(*position);
            }

            let dictionary = self.terms.entry(field.clone()).or_default();
            for (term, mut positions) in by_term {
                positions.sort_unstable();
                dictionary
                    .entry(term.to_string())
                    .or_default()
                    .push(Posting::with_positions(doc_id, positions));
            }
        }

        Ok(())
    }

    /// Freeze into a segment with sorted dictionaries.
    pub fn build(self) -> Segment {
        let doc_count = self.doc_ids.len();
        let field_lengths = self
            .field_lengths
            .into_iter()
            .map(|(field, mut lengths)| {
                lengths.resize(doc_count, None);
                (field, lengths)
            })
            .collect();
        let terms = self
            .terms
            .into_iter()
            .map(|(field, dictionary)| (field, dictionary.into_iter().collect()))
            .collect();

        Segment {
            id: self.id,
            doc_ids: self.doc_ids,
            stored: self.stored,
            field_lengths,
            terms,
        }
    }
}
