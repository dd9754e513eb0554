//! Indexing: segments, the commit protocol and batch ingestion.
//!
//! An [`Index`] owns a sequence of immutable [`Segment`]s named by a
//! [`Manifest`]. Writers stage documents independently and publish them with
//! an atomic commit; readers work on an [`IndexSnapshot`] that later commits
//! never change.

pub mod chunk;
#[allow(clippy::module_inception)]
pub mod index;
pub mod manifest;
pub mod posting;
pub mod segment;
pub mod snapshot;
pub mod writer;

pub use chunk::{ChunkReport, ChunkedIngestor, IngestReport, chunk, chunk_ranges};
pub use index::Index;
pub use manifest::{Manifest, SegmentInfo};
pub use posting::{Posting, PostingList};
pub use segment::{Segment, SegmentBuilder};
pub use snapshot::{FieldStats, IndexSnapshot};
pub use writer::{
    AnalyzedField, CommitInfo, DocumentPreparer, IndexWriter, PreparedDocument, StageReport,
    UniquePolicy,
};
