//! The index handle: lifecycle, snapshots and the commit protocol.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::analysis::PerFieldAnalyzer;
use crate::config::IndexConfig;
use crate::error::{PlacedexError, Result};
use crate::index::manifest::{MANIFEST_TEMP_FILE, Manifest, SCHEMA_FILE, SegmentInfo};
use crate::index::segment::{Segment, SegmentBuilder, segment_file_name};
use crate::index::snapshot::IndexSnapshot;
use crate::index::writer::{CommitInfo, DocumentPreparer, IndexWriter, PreparedDocument, UniquePolicy};
use crate::query::parser::QueryParser;
use crate::query::searcher::Searcher;
use crate::schema::Schema;
use crate::storage::Storage;

/// A handle to one collection's index.
///
/// Handles are cheap to clone; clones share the same state. Readers take
/// snapshots with [`reader`](Index::reader) or [`searcher`](Index::searcher)
/// and are never blocked by commits.
#[derive(Clone)]
pub struct Index {
    inner: Arc<IndexInner>,
}

struct IndexInner {
    storage: Arc<dyn Storage>,
    schema: Arc<Schema>,
    config: IndexConfig,
    preparer: DocumentPreparer,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    /// Held for the whole commit; guards the manifest and the doc id counter.
    manifest: Mutex<Manifest>,
    closed: AtomicBool,
}

impl Index {
    /// Create a new, empty index in `storage`.
    pub fn create<S: Into<Arc<Schema>>>(
        storage: Arc<dyn Storage>,
        schema: S,
        config: IndexConfig,
    ) -> Result<Index> {
        config.validate()?;
        let schema = schema.into();

        if Manifest::exists(storage.as_ref()) || storage.file_exists(SCHEMA_FILE) {
            return Err(PlacedexError::schema(
                "An index already exists in this storage",
            ));
        }

        storage.write_all(SCHEMA_FILE, &serde_json::to_vec_pretty(schema.as_ref())?)?;
        let manifest = Manifest::default();
        manifest.save(storage.as_ref())?;

        log::info!("created index with {} fields", schema.len());
        Self::assemble(storage, schema, config, manifest, Vec::new())
    }

    /// Open an existing index, verifying the schema and every segment checksum.
    pub fn open<S: Into<Arc<Schema>>>(
        storage: Arc<dyn Storage>,
        schema: S,
        config: IndexConfig,
    ) -> Result<Index> {
        config.validate()?;
        let schema = schema.into();

        if !storage.file_exists(SCHEMA_FILE) {
            return Err(PlacedexError::storage(format!(
                "No index found: {SCHEMA_FILE} is missing"
            )));
        }
        let persisted: Schema = serde_json::from_slice(&storage.read_all(SCHEMA_FILE)?)
            .map_err(|e| PlacedexError::schema(format!("Unreadable {SCHEMA_FILE}: {e}")))?;
        if persisted != *schema {
            return Err(PlacedexError::schema(
                "Schema does not match the schema the index was created with",
            ));
        }

        let manifest = Manifest::load(storage.as_ref())?;
        let mut segments = Vec::with_capacity(manifest.segments.len());
        for info in &manifest.segments {
            let segment = Segment::read(storage.as_ref(), &info.segment_id)?;
            if segment.doc_count() as u64 != info.doc_count
                || segment.doc_ids().first().copied() != Some(info.first_doc_id)
            {
                return Err(PlacedexError::storage(format!(
                    "Segment {} does not match the manifest",
                    info.segment_id
                )));
            }
            segments.push(Arc::new(segment));
        }

        remove_orphans(storage.as_ref(), &manifest);

        log::info!(
            "opened index at generation {} ({} segments, {} live docs)",
            manifest.generation,
            segments.len(),
            manifest.live_docs()
        );
        Self::assemble(storage, schema, config, manifest, segments)
    }

    /// Open the index in `storage`, creating it when none exists.
    pub fn open_or_create<S: Into<Arc<Schema>>>(
        storage: Arc<dyn Storage>,
        schema: S,
        config: IndexConfig,
    ) -> Result<Index> {
        if Manifest::exists(storage.as_ref()) {
            Self::open(storage, schema, config)
        } else {
            Self::create(storage, schema, config)
        }
    }

    fn assemble(
        storage: Arc<dyn Storage>,
        schema: Arc<Schema>,
        config: IndexConfig,
        manifest: Manifest,
        segments: Vec<Arc<Segment>>,
    ) -> Result<Index> {
        let preparer = DocumentPreparer::new(schema.clone(), &config)?;
        let snapshot = IndexSnapshot::new(
            schema.clone(),
            config.timestamp_format.clone(),
            manifest.generation,
            manifest.next_doc_id,
            segments,
            &manifest.tombstones,
        );

        Ok(Index {
            inner: Arc::new(IndexInner {
                storage,
                schema,
                config,
                preparer,
                snapshot: RwLock::new(Arc::new(snapshot)),
                manifest: Mutex::new(manifest),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Reject further commits and writers. Snapshots already taken stay valid.
    pub fn close(&self) {
        let _guard = self.inner.manifest.lock();
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            log::info!("closed index at generation {}", self.generation());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    pub fn analyzers(&self) -> &Arc<PerFieldAnalyzer> {
        self.inner.preparer.analyzers()
    }

    pub(crate) fn preparer(&self) -> &DocumentPreparer {
        &self.inner.preparer
    }

    /// The currently visible snapshot.
    pub fn reader(&self) -> Arc<IndexSnapshot> {
        self.inner.snapshot.read().clone()
    }

    /// A searcher over the currently visible snapshot.
    pub fn searcher(&self) -> Searcher {
        Searcher::new(self.reader(), &self.inner.config.scoring)
    }

    /// A query parser using this index's analyzers, defaulting to all Text fields.
    pub fn query_parser(&self) -> QueryParser {
        QueryParser::new(self.inner.schema.clone(), self.analyzers().clone())
            .with_timestamp_format(self.inner.config.timestamp_format.clone())
    }

    pub fn generation(&self) -> u64 {
        self.reader().generation()
    }

    /// A writer with its own staging buffer.
    pub fn writer(&self, policy: UniquePolicy) -> Result<IndexWriter> {
        if self.is_closed() {
            return Err(PlacedexError::Closed);
        }
        Ok(IndexWriter::new(self.clone(), policy))
    }

    /// Publish `documents` as one new segment.
    ///
    /// Doc ids are assigned, overwrites resolved, the segment file and the
    /// manifest written, and only then is the visible snapshot swapped. Any
    /// failure before the manifest rename leaves the index unchanged.
    pub(crate) fn commit_prepared(
        &self,
        documents: &[PreparedDocument],
        policy: UniquePolicy,
    ) -> Result<CommitInfo> {
        let mut manifest = self.inner.manifest.lock();
        if self.is_closed() {
            return Err(PlacedexError::commit("index is closed"));
        }

        let current = self.reader();
        if documents.is_empty() {
            return Ok(CommitInfo::unchanged(manifest.generation, 0));
        }

        let unique_field = self.inner.schema.unique_field().map(|f| f.name.as_str());
        let mut accepted = Vec::with_capacity(documents.len());
        let mut tombstones = Vec::new();
        let mut conflicts = 0;
        for document in documents {
            if let (Some(field), Some(key)) = (unique_field, document.unique_key()) {
                let holders = current.unique_holders(field, key);
                if !holders.is_empty() {
                    match policy {
                        UniquePolicy::Reject => {
                            log::warn!("dropping staged record: '{key}' was committed by another writer");
                            conflicts += 1;
                            continue;
                        }
                        UniquePolicy::Overwrite => tombstones.extend(holders),
                    }
                }
            }
            accepted.push(document);
        }
        if accepted.is_empty() {
            return Ok(CommitInfo::unchanged(manifest.generation, conflicts));
        }

        let first_doc_id = manifest.next_doc_id;
        let generation = manifest.generation + 1;
        let mut builder = SegmentBuilder::with_random_id();
        for (doc_id, document) in (first_doc_id..).zip(&accepted) {
            builder
                .add(doc_id, document)
                .map_err(|e| PlacedexError::commit(e.to_string()))?;
        }
        let segment = Arc::new(builder.build());
        let segment_id = segment.id().to_string();

        let next_manifest = manifest.with_segment(
            SegmentInfo {
                segment_id: segment_id.clone(),
                doc_count: segment.doc_count() as u64,
                first_doc_id,
                generation,
            },
            &tombstones,
        );

        let storage = self.inner.storage.as_ref();
        if let Err(e) = segment.write(storage) {
            discard(storage, &segment_file_name(&segment_id));
            return Err(PlacedexError::commit(format!(
                "writing segment {segment_id}: {e}"
            )));
        }
        if let Err(e) = next_manifest.save(storage) {
            discard(storage, &segment_file_name(&segment_id));
            return Err(PlacedexError::commit(format!(
                "writing manifest generation {generation}: {e}"
            )));
        }

        let mut segments = current.segments().to_vec();
        segments.push(segment);
        let snapshot = IndexSnapshot::new(
            self.inner.schema.clone(),
            self.inner.config.timestamp_format.clone(),
            generation,
            next_manifest.next_doc_id,
            segments,
            &next_manifest.tombstones,
        );
        *self.inner.snapshot.write() = Arc::new(snapshot);
        log::debug!("swapped snapshot to generation {generation}");

        let overwritten = next_manifest.tombstones.len() - manifest.tombstones.len();
        *manifest = next_manifest;

        log::info!(
            "committed generation {generation}: {} docs from {first_doc_id}, {overwritten} overwritten",
            accepted.len()
        );
        Ok(CommitInfo {
            generation,
            segment_id: Some(segment_id),
            doc_count: accepted.len(),
            overwritten,
            first_doc_id: Some(first_doc_id),
            conflicts,
        })
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("storage", &self.inner.storage)
            .field("generation", &self.generation())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn discard(storage: &dyn Storage, name: &str) {
    if let Err(e) = storage.delete_file(name) {
        log::warn!("could not remove partial file {name}: {e}");
    }
}

/// Delete segment files no manifest names, left behind by failed commits.
fn remove_orphans(storage: &dyn Storage, manifest: &Manifest) {
    let Ok(files) = storage.list_files() else {
        return;
    };
    for name in files {
        let orphan_segment = name.starts_with("seg_")
            && name.ends_with(".seg")
            && !manifest
                .segments
                .iter()
                .any(|info| segment_file_name(&info.segment_id) == name);
        if orphan_segment || name == MANIFEST_TEMP_FILE {
            log::debug!("removing orphaned file {name}");
            discard(storage, &name);
        }
    }
}
