//! Staging and committing documents.
//!
//! An [`IndexWriter`] validates records against the schema, analyzes them and
//! keeps them in a private staging buffer. Nothing becomes searchable until
//! [`IndexWriter::commit`] publishes the whole buffer as one new segment.
//!
//! ```
//! use std::sync::Arc;
//!
//! use placedex::config::IndexConfig;
//! use placedex::document::Document;
//! use placedex::index::{Index, UniquePolicy};
//! use placedex::schema::{FieldDescriptor, Schema};
//! use placedex::storage::MemoryStorage;
//!
//! let schema = Schema::builder()
//!     .add_field(FieldDescriptor::identifier("business_id").stored(true).unique(true))
//!     .add_field(FieldDescriptor::text("name").stored(true))
//!     .build()
//!     .unwrap();
//! let index = Index::create(Arc::new(MemoryStorage::new()), schema, IndexConfig::default()).unwrap();
//!
//! let mut writer = index.writer(UniquePolicy::Reject).unwrap();
//! writer
//!     .stage(Document::builder().add_text("business_id", "b1").add_text("name", "Joe's Pizza").build())
//!     .unwrap();
//! assert_eq!(index.reader().num_docs(), 0);
//!
//! let info = writer.commit().unwrap();
//! assert_eq!(info.doc_count, 1);
//! assert_eq!(index.reader().num_docs(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::PerFieldAnalyzer;
use crate::config::IndexConfig;
use crate::document::{DocId, Document, FieldValue};
use crate::error::{PlacedexError, Result};
use crate::index::Index;
use crate::schema::{FieldType, Schema};

/// How a writer resolves a record whose unique value is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniquePolicy {
    /// The colliding record fails with a validation error.
    #[default]
    Reject,
    /// The new record replaces the previous holder at commit.
    Overwrite,
}

/// Terms of one field of one document, with token positions.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedField {
    /// Token count used for length normalization.
    pub length: u32,
    pub terms: Vec<(String, u32)>,
}

/// A record that passed validation and analysis, ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocument {
    stored: Document,
    unique_key: Option<String>,
    fields: BTreeMap<String, AnalyzedField>,
}

impl PreparedDocument {
    /// Values of the stored fields exactly as they were supplied.
    pub fn stored(&self) -> &Document {
        &self.stored
    }

    /// Value of the schema's unique field, if any.
    pub fn unique_key(&self) -> Option<&str> {
        self.unique_key.as_deref()
    }

    pub fn fields(&self) -> &BTreeMap<String, AnalyzedField> {
        &self.fields
    }
}

/// Turns raw documents into [`PreparedDocument`]s. Cheap to clone and safe to
/// share between preparation threads.
#[derive(Clone)]
pub struct DocumentPreparer {
    schema: Arc<Schema>,
    analyzers: Arc<PerFieldAnalyzer>,
    timestamp_format: String,
}

impl DocumentPreparer {
    pub fn new(schema: Arc<Schema>, config: &IndexConfig) -> Result<Self> {
        let analyzers = Arc::new(schema.analyzers(&config.analysis)?);
        Ok(Self::with_analyzers(
            schema,
            analyzers,
            config.timestamp_format.clone(),
        ))
    }

    pub fn with_analyzers(
        schema: Arc<Schema>,
        analyzers: Arc<PerFieldAnalyzer>,
        timestamp_format: String,
    ) -> Self {
        DocumentPreparer {
            schema,
            analyzers,
            timestamp_format,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn analyzers(&self) -> &Arc<PerFieldAnalyzer> {
        &self.analyzers
    }

    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    /// Validate, coerce and analyze one record.
    ///
    /// Unknown fields, missing required fields and failed coercions are
    /// validation errors; a malformed timestamp is a parse error.
    pub fn prepare(&self, document: Document) -> Result<PreparedDocument> {
        let mut values = document.into_fields();

        if let Some(unknown) = values.keys().find(|name| !self.schema.has_field(name)) {
            return Err(PlacedexError::validation(unknown.as_str(), "unknown field"));
        }

        let mut stored = Document::new();
        let mut unique_key = None;
        let mut fields = BTreeMap::new();

        for descriptor in self.schema.fields() {
            let Some(value) = values.remove(&descriptor.name) else {
                if descriptor.required {
                    return Err(PlacedexError::validation(
                        &descriptor.name,
                        "required field is missing",
                    ));
                }
                continue;
            };

            if descriptor.stored {
                stored.add_field(descriptor.name.clone(), value.clone());
            }
            let value = value
                .coerce(descriptor, &self.timestamp_format)
                .inspect_err(|e| {
                    if let PlacedexError::Parse { field, value } = e {
                        log::warn!(
                            "skipping record: field '{field}' has invalid timestamp '{value}'"
                        );
                    }
                })?;
            let analyzed = self.analyze(&descriptor.name, descriptor.field_type, &value)?;

            if descriptor.unique {
                unique_key = analyzed.terms.first().map(|(term, _)| term.clone());
            }
            fields.insert(descriptor.name.clone(), analyzed);
        }

        Ok(PreparedDocument {
            stored,
            unique_key,
            fields,
        })
    }

    fn analyze(
        &self,
        field: &str,
        field_type: FieldType,
        value: &FieldValue,
    ) -> Result<AnalyzedField> {
        let terms: Vec<(String, u32)> = match (field_type, value) {
            (FieldType::Text, FieldValue::Text(text)) => self
                .analyzers
                .analyze_field(field, text)?
                .map(|token| (token.text, token.position as u32))
                .collect(),
            _ => value
                .index_terms(&self.timestamp_format)
                .into_iter()
                .zip(0u32..)
                .collect(),
        };

        Ok(AnalyzedField {
            length: terms.len() as u32,
            terms,
        })
    }
}

impl fmt::Debug for DocumentPreparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPreparer")
            .field("fields", &self.schema.field_names().collect::<Vec<_>>())
            .field("timestamp_format", &self.timestamp_format)
            .finish()
    }
}

/// Per-record outcomes of a batch of stage calls.
#[derive(Debug, Default)]
pub struct StageReport {
    pub staged: usize,
    /// Ordinal and error of each record rejected by validation.
    pub rejected: Vec<(usize, PlacedexError)>,
    /// Ordinal and raw value of each record skipped for a bad timestamp.
    pub skipped: Vec<(usize, String)>,
}

impl StageReport {
    fn record(&mut self, ordinal: usize, result: Result<()>) {
        match result {
            Ok(()) => self.staged += 1,
            Err(PlacedexError::Parse { value, .. }) => self.skipped.push((ordinal, value)),
            Err(e) => {
                log::debug!("rejected record {ordinal}: {e}");
                self.rejected.push((ordinal, e));
            }
        }
    }

    /// Records that did not make it into the buffer.
    pub fn failed(&self) -> usize {
        self.rejected.len() + self.skipped.len()
    }
}

/// Result of a commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// Manifest generation visible after the commit.
    pub generation: u64,
    /// The new segment, or `None` when nothing was committed.
    pub segment_id: Option<String>,
    pub doc_count: usize,
    /// Previous holders of a unique value tombstoned by this commit.
    pub overwritten: usize,
    pub first_doc_id: Option<DocId>,
    /// Staged records dropped because another writer committed their unique
    /// value first (only under [`UniquePolicy::Reject`]).
    pub conflicts: usize,
}

impl CommitInfo {
    pub(crate) fn unchanged(generation: u64, conflicts: usize) -> Self {
        CommitInfo {
            generation,
            segment_id: None,
            doc_count: 0,
            overwritten: 0,
            first_doc_id: None,
            conflicts,
        }
    }
}

/// Stages documents for one index and commits them atomically.
pub struct IndexWriter {
    index: Index,
    policy: UniquePolicy,
    buffer: Vec<PreparedDocument>,
    staged_keys: AHashMap<String, usize>,
}

impl IndexWriter {
    pub(crate) fn new(index: Index, policy: UniquePolicy) -> Self {
        IndexWriter {
            index,
            policy,
            buffer: Vec::new(),
            staged_keys: AHashMap::new(),
        }
    }

    pub fn policy(&self) -> UniquePolicy {
        self.policy
    }

    /// Number of staged documents.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Validate, analyze and buffer one record.
    pub fn stage(&mut self, document: Document) -> Result<()> {
        let prepared = self.index.preparer().prepare(document)?;
        self.stage_prepared(prepared)
    }

    /// Stage every record, collecting per-record failures instead of stopping.
    pub fn stage_all<I>(&mut self, documents: I) -> StageReport
    where
        I: IntoIterator<Item = Document>,
    {
        self.stage_all_from(0, documents.into_iter().map(Ok))
    }

    /// Buffer records prepared elsewhere; ordinals start at `offset`.
    pub(crate) fn stage_all_from<I>(&mut self, offset: usize, documents: I) -> StageReport
    where
        I: IntoIterator<Item = Result<Document>>,
    {
        let mut report = StageReport::default();
        for (i, document) in documents.into_iter().enumerate() {
            let result = document.and_then(|doc| self.stage(doc));
            report.record(offset + i, result);
        }
        report
    }

    pub(crate) fn stage_prepared_all<I>(&mut self, offset: usize, prepared: I) -> StageReport
    where
        I: IntoIterator<Item = Result<PreparedDocument>>,
    {
        let mut report = StageReport::default();
        for (i, document) in prepared.into_iter().enumerate() {
            let result = document.and_then(|doc| self.stage_prepared(doc));
            report.record(offset + i, result);
        }
        report
    }

    /// Buffer an already prepared record, enforcing the unique policy.
    pub fn stage_prepared(&mut self, prepared: PreparedDocument) -> Result<()> {
        let Some(key) = prepared.unique_key().map(str::to_string) else {
            self.buffer.push(prepared);
            return Ok(());
        };
        let field = self
            .index
            .schema()
            .unique_field()
            .map(|f| f.name.clone())
            .unwrap_or_default();

        if let Some(&slot) = self.staged_keys.get(&key) {
            return match self.policy {
                UniquePolicy::Reject => Err(PlacedexError::validation(
                    field,
                    format!("value '{key}' is already staged"),
                )),
                UniquePolicy::Overwrite => {
                    log::debug!("replacing staged record for '{key}'");
                    self.buffer[slot] = prepared;
                    Ok(())
                }
            };
        }

        if self.policy == UniquePolicy::Reject
            && !self.index.reader().unique_holders(&field, &key).is_empty()
        {
            return Err(PlacedexError::validation(
                field,
                format!("value '{key}' already exists"),
            ));
        }

        self.staged_keys.insert(key, self.buffer.len());
        self.buffer.push(prepared);
        Ok(())
    }

    /// Publish the staging buffer as one segment.
    ///
    /// On failure nothing becomes visible and the buffer is kept, so calling
    /// `commit` again retries the same documents.
    pub fn commit(&mut self) -> Result<CommitInfo> {
        let info = self.index.commit_prepared(&self.buffer, self.policy)?;
        self.buffer.clear();
        self.staged_keys.clear();
        Ok(info)
    }

    /// Discard the staging buffer.
    pub fn rollback(&mut self) {
        log::debug!("rolling back {} staged documents", self.buffer.len());
        self.buffer.clear();
        self.staged_keys.clear();
    }
}

impl fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexWriter")
            .field("policy", &self.policy)
            .field("pending", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;
    use crate::storage::MemoryStorage;

    fn schema() -> Schema {
        Schema::builder()
            .add_field(FieldDescriptor::identifier("review_id").stored(true).unique(true))
            .add_field(FieldDescriptor::text("text").stored(true))
            .add_field(FieldDescriptor::numeric("stars").stored(true).required(true))
            .add_field(FieldDescriptor::timestamp("date").stored(true))
            .add_field(FieldDescriptor::boolean("verified"))
            .build()
            .unwrap()
    }

    fn index() -> Index {
        Index::create(
            Arc::new(MemoryStorage::new()),
            schema(),
            IndexConfig::default(),
        )
        .unwrap()
    }

    fn review(id: &str, text: &str, stars: &str) -> Document {
        Document::builder()
            .add_text("review_id", id)
            .add_text("text", text)
            .add_text("stars", stars)
            .build()
    }

    #[test]
    fn test_prepare_document() {
        let preparer = DocumentPreparer::new(Arc::new(schema()), &IndexConfig::default()).unwrap();
        let doc = review("r1", "The pizza was great", "4")
            .into_fields()
            .into_iter()
            .chain([
                ("date".to_string(), FieldValue::from("2021-03-04 10:00:00")),
                ("verified".to_string(), FieldValue::from("yes")),
            ])
            .collect();

        let prepared = preparer.prepare(doc).unwrap();
        assert_eq!(prepared.unique_key(), Some("r1"));
        assert_eq!(prepared.stored().get_field("stars"), Some(&FieldValue::from("4")));
        assert_eq!(
            prepared.stored().get_field("date"),
            Some(&FieldValue::from("2021-03-04 10:00:00"))
        );
        assert!(!prepared.stored().has_field("verified"));

        let text = &prepared.fields()["text"];
        assert_eq!(
            text.terms,
            vec![("pizza".to_string(), 1), ("great".to_string(), 3)]
        );
        assert_eq!(text.length, 2);
        assert_eq!(prepared.fields()["stars"].terms, vec![("4".to_string(), 0)]);
        assert_eq!(prepared.fields()["verified"].terms, vec![("true".to_string(), 0)]);
    }

    #[test]
    fn test_stage_validation() {
        let index = index();
        let mut writer = index.writer(UniquePolicy::Reject).unwrap();

        let err = writer.stage(review("r1", "ok", "many")).unwrap_err();
        assert!(matches!(err, PlacedexError::Validation { ref field, .. } if field == "stars"));

        let missing = Document::builder().add_text("review_id", "r2").build();
        assert!(writer.stage(missing).is_err());

        let unknown = Document::builder()
            .add_text("review_id", "r3")
            .add_text("stars", "3")
            .add_text("color", "red")
            .build();
        assert!(matches!(
            writer.stage(unknown),
            Err(PlacedexError::Validation { ref field, .. }) if field == "color"
        ));

        let mut bad_date = review("r4", "ok", "3");
        bad_date.add_field("date", FieldValue::from("2021/03/04"));
        assert!(matches!(
            writer.stage(bad_date),
            Err(PlacedexError::Parse { ref value, .. }) if value == "2021/03/04"
        ));

        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_stage_all_report() {
        let index = index();
        let mut writer = index.writer(UniquePolicy::Reject).unwrap();

        let mut bad_date = review("r3", "fine", "2");
        bad_date.add_field("date", FieldValue::from("yesterday"));
        let report = writer.stage_all(vec![
            review("r1", "good", "5"),
            review("r2", "bad", "x"),
            bad_date,
            review("r4", "meh", "3"),
        ]);

        assert_eq!(report.staged, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, 1);
        assert_eq!(report.skipped, vec![(2, "yesterday".to_string())]);
        assert_eq!(report.failed(), 2);
        assert_eq!(writer.pending(), 2);
    }

    #[test]
    fn test_unique_reject() {
        let index = index();
        let mut writer = index.writer(UniquePolicy::Reject).unwrap();
        writer.stage(review("r1", "first", "5")).unwrap();
        assert!(writer.stage(review("r1", "again", "1")).is_err());
        writer.commit().unwrap();

        let mut other = index.writer(UniquePolicy::Reject).unwrap();
        assert!(other.stage(review("r1", "third", "2")).is_err());
        assert_eq!(index.reader().num_docs(), 1);
    }

    #[test]
    fn test_unique_overwrite() {
        let index = index();
        let mut writer = index.writer(UniquePolicy::Overwrite).unwrap();
        writer.stage(review("r1", "first", "5")).unwrap();
        writer.stage(review("r1", "second", "4")).unwrap();
        assert_eq!(writer.pending(), 1);
        let info = writer.commit().unwrap();
        assert_eq!(info.first_doc_id, Some(0));
        assert_eq!(info.overwritten, 0);

        writer.stage(review("r1", "third", "3")).unwrap();
        let info = writer.commit().unwrap();
        assert_eq!(info.overwritten, 1);
        assert_eq!(info.first_doc_id, Some(1));

        let reader = index.reader();
        assert_eq!(reader.num_docs(), 1);
        assert!(reader.doc(0).is_none());
        let found = reader.find_by("review_id", "r1").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].doc_id, 1);
        assert_eq!(found[0].get_text("text"), Some("third"));
    }

    #[test]
    fn test_commit_conflict_between_writers() {
        let index = index();
        let mut first = index.writer(UniquePolicy::Reject).unwrap();
        let mut second = index.writer(UniquePolicy::Reject).unwrap();
        first.stage(review("r1", "first", "5")).unwrap();
        second.stage(review("r1", "second", "1")).unwrap();
        second.stage(review("r2", "other", "2")).unwrap();

        first.commit().unwrap();
        let info = second.commit().unwrap();
        assert_eq!(info.conflicts, 1);
        assert_eq!(info.doc_count, 1);
        assert_eq!(index.reader().num_docs(), 2);
    }

    #[test]
    fn test_rollback_and_empty_commit() {
        let index = index();
        let mut writer = index.writer(UniquePolicy::Reject).unwrap();
        writer.stage(review("r1", "first", "5")).unwrap();
        writer.rollback();
        assert_eq!(writer.pending(), 0);

        let info = writer.commit().unwrap();
        assert_eq!(info, CommitInfo::unchanged(0, 0));
        assert_eq!(index.reader().generation(), 0);
    }
}
