//! Bounded-memory ingestion of large record sets.
//!
//! Records are split into `k` contiguous chunks. Each chunk is staged into its
//! own writer and committed on its own, so a failing chunk neither rolls back
//! earlier chunks nor stops later ones. In parallel mode, chunks are validated
//! and analyzed on a rayon pool and handed to a single committer over a
//! bounded crossbeam channel; commits still happen in chunk order.

use std::ops::Range;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::config::IngestConfig;
use crate::document::Document;
use crate::error::{PlacedexError, Result};
use crate::index::Index;
use crate::index::writer::{CommitInfo, IndexWriter, PreparedDocument};

/// Split `0..n` into `k` contiguous ranges of `n / k` records, with the
/// remainder going to the last range.
///
/// ```
/// use placedex::index::chunk_ranges;
///
/// assert_eq!(chunk_ranges(10, 3).unwrap(), vec![0..3, 3..6, 6..10]);
/// assert!(chunk_ranges(2, 3).is_err());
/// ```
pub fn chunk_ranges(n: usize, k: usize) -> Result<Vec<Range<usize>>> {
    if k == 0 {
        return Err(PlacedexError::invalid_argument(
            "chunk count must be at least 1",
        ));
    }
    if k > n && !(n == 0 && k == 1) {
        return Err(PlacedexError::invalid_argument(format!(
            "cannot split {n} records into {k} chunks"
        )));
    }

    let batch = n / k;
    let mut ranges: Vec<Range<usize>> = (0..k - 1).map(|i| i * batch..(i + 1) * batch).collect();
    ranges.push((k - 1) * batch..n);
    Ok(ranges)
}

/// Partition owned records the same way as [`chunk_ranges`].
pub fn chunk<T>(records: Vec<T>, k: usize) -> Result<Vec<Vec<T>>> {
    let ranges = chunk_ranges(records.len(), k)?;
    let mut rest = records.into_iter();
    Ok(ranges
        .iter()
        .map(|range| rest.by_ref().take(range.len()).collect())
        .collect())
}

/// Outcome of one chunk.
#[derive(Debug)]
pub struct ChunkReport {
    pub index: usize,
    /// Ordinals of the chunk's records in the input.
    pub range: Range<usize>,
    pub staged: usize,
    pub rejected: Vec<(usize, PlacedexError)>,
    pub skipped: Vec<(usize, String)>,
    pub commit: Result<CommitInfo>,
    /// Preparation plus commit time.
    pub elapsed: Duration,
    /// Kept with its buffer while the commit has not succeeded.
    writer: Option<IndexWriter>,
}

impl ChunkReport {
    pub fn size(&self) -> usize {
        self.range.len()
    }

    pub fn is_committed(&self) -> bool {
        self.commit.is_ok()
    }
}

/// Outcome of an ingest call, one entry per chunk in chunk order.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub chunks: Vec<ChunkReport>,
}

impl IngestReport {
    /// Chunks whose commit failed and can be retried.
    pub fn failed_chunks(&self) -> Vec<&ChunkReport> {
        self.chunks.iter().filter(|c| !c.is_committed()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.chunks.iter().all(ChunkReport::is_committed)
    }

    pub fn total_staged(&self) -> usize {
        self.chunks.iter().map(|c| c.staged).sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.chunks.iter().map(|c| c.rejected.len()).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.chunks.iter().map(|c| c.skipped.len()).sum()
    }

    /// Documents made visible by the successful commits.
    pub fn committed_docs(&self) -> usize {
        self.chunks
            .iter()
            .filter_map(|c| c.commit.as_ref().ok())
            .map(|info| info.doc_count)
            .sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.chunks.iter().map(|c| c.elapsed).sum()
    }
}

struct PreparedChunk {
    index: usize,
    range: Range<usize>,
    documents: Vec<Result<PreparedDocument>>,
    elapsed: Duration,
}

/// Splits record sets into chunks and commits them one by one.
#[derive(Debug)]
pub struct ChunkedIngestor {
    index: Index,
    config: IngestConfig,
}

impl ChunkedIngestor {
    pub fn new(index: &Index, config: IngestConfig) -> Self {
        ChunkedIngestor {
            index: index.clone(),
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Stage and commit chunk by chunk on the calling thread.
    pub fn ingest(&self, records: Vec<Document>) -> Result<IngestReport> {
        self.ensure_open()?;
        let ranges = chunk_ranges(records.len(), self.config.batches)?;
        let chunks = chunk(records, self.config.batches)?;
        let preparer = self.index.preparer();

        let mut report = IngestReport::default();
        for (index, (range, documents)) in ranges.into_iter().zip(chunks).enumerate() {
            let started = Instant::now();
            let documents = documents
                .into_iter()
                .map(|doc| preparer.prepare(doc))
                .collect();
            report.chunks.push(self.commit_chunk(PreparedChunk {
                index,
                range,
                documents,
                elapsed: started.elapsed(),
            }));
        }

        self.log_summary(&report);
        Ok(report)
    }

    /// Prepare chunks on `workers` threads and commit them here, in order.
    ///
    /// Chunks are prepared a window of `workers` at a time and queued in
    /// chunk order, so at most one window plus `queue_capacity` prepared
    /// chunks are held in memory.
    pub fn ingest_parallel(&self, records: Vec<Document>) -> Result<IngestReport> {
        self.ensure_open()?;
        let ranges = chunk_ranges(records.len(), self.config.batches)?;
        let chunks = chunk(records, self.config.batches)?;
        let workers = self.config.workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("placedex-ingest-{i}"))
            .build()
            .map_err(|e| {
                PlacedexError::invalid_argument(format!("Failed to create thread pool: {e}"))
            })?;

        let (sender, receiver) = bounded::<PreparedChunk>(self.config.queue_capacity.max(1));
        let preparer = self.index.preparer();
        let work: Vec<(usize, (Range<usize>, Vec<Document>))> =
            ranges.into_iter().zip(chunks).enumerate().collect();

        let mut report = IngestReport::default();
        std::thread::scope(|scope| {
            scope.spawn(move || {
                let mut work = work.into_iter().peekable();
                while work.peek().is_some() {
                    let window: Vec<_> = work.by_ref().take(workers).collect();
                    let prepared: Vec<PreparedChunk> = pool.install(|| {
                        window
                            .into_par_iter()
                            .map(|(index, (range, documents))| {
                                let started = Instant::now();
                                let documents = documents
                                    .into_iter()
                                    .map(|doc| preparer.prepare(doc))
                                    .collect();
                                PreparedChunk {
                                    index,
                                    range,
                                    documents,
                                    elapsed: started.elapsed(),
                                }
                            })
                            .collect()
                    });
                    for chunk in prepared {
                        let index = chunk.index;
                        if sender.send(chunk).is_err() {
                            log::warn!("commit queue closed before chunk {index} was sent");
                            return;
                        }
                    }
                }
            });

            for prepared in receiver.iter() {
                report.chunks.push(self.commit_chunk(prepared));
            }
        });

        self.log_summary(&report);
        Ok(report)
    }

    /// Commit a failed chunk again from its retained buffer.
    pub fn retry(&self, chunk: &mut ChunkReport) -> Result<CommitInfo> {
        if let Ok(info) = &chunk.commit {
            return Ok(info.clone());
        }
        let Some(writer) = chunk.writer.as_mut() else {
            return Err(PlacedexError::commit(format!(
                "chunk {} has no retained buffer",
                chunk.index
            )));
        };

        let started = Instant::now();
        let result = writer.commit();
        chunk.elapsed += started.elapsed();
        match result {
            Ok(info) => {
                log::info!(
                    "chunk {} committed on retry at generation {}",
                    chunk.index,
                    info.generation
                );
                chunk.writer = None;
                chunk.commit = Ok(info.clone());
                Ok(info)
            }
            Err(e) => {
                log::warn!("retry of chunk {} failed: {e}", chunk.index);
                chunk.commit = Err(PlacedexError::commit(e.to_string()));
                Err(e)
            }
        }
    }

    /// Retry every failed chunk in order; returns how many now succeeded.
    pub fn retry_failed(&self, report: &mut IngestReport) -> usize {
        report
            .chunks
            .iter_mut()
            .filter(|c| !c.is_committed())
            .filter_map(|c| self.retry(c).ok())
            .count()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.index.is_closed() {
            Err(PlacedexError::Closed)
        } else {
            Ok(())
        }
    }

    fn commit_chunk(&self, chunk: PreparedChunk) -> ChunkReport {
        let started = Instant::now();
        let PreparedChunk {
            index,
            range,
            documents,
            elapsed,
        } = chunk;

        let mut writer = match self.index.writer(self.config.unique_policy) {
            Ok(writer) => writer,
            Err(e) => {
                log::warn!("chunk {index} not committed: {e}");
                return ChunkReport {
                    index,
                    range,
                    staged: 0,
                    rejected: Vec::new(),
                    skipped: Vec::new(),
                    commit: Err(e),
                    elapsed: elapsed + started.elapsed(),
                    writer: None,
                };
            }
        };

        let staged = writer.stage_prepared_all(range.start, documents);
        let commit = writer.commit();
        let elapsed = elapsed + started.elapsed();
        match &commit {
            Ok(info) => log::debug!(
                "chunk {index} ({} records) committed {} docs in {elapsed:?}",
                range.len(),
                info.doc_count
            ),
            Err(e) => log::warn!("chunk {index} ({} records) failed to commit: {e}", range.len()),
        }

        ChunkReport {
            index,
            range,
            staged: staged.staged,
            rejected: staged.rejected,
            skipped: staged.skipped,
            writer: commit.is_err().then_some(writer),
            commit,
            elapsed,
        }
    }

    fn log_summary(&self, report: &IngestReport) {
        log::info!(
            "ingested {} chunks: {} staged, {} rejected, {} skipped, {} failed chunks in {:?}",
            report.chunks.len(),
            report.total_staged(),
            report.total_rejected(),
            report.total_skipped(),
            report.failed_chunks().len(),
            report.elapsed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::IndexConfig;
    use crate::schema::{FieldDescriptor, Schema};
    use crate::storage::MemoryStorage;

    fn index() -> Index {
        let schema = Schema::builder()
            .add_field(FieldDescriptor::identifier("review_id").stored(true).unique(true))
            .add_field(FieldDescriptor::text("text").stored(true))
            .add_field(FieldDescriptor::numeric("stars").stored(true))
            .build()
            .unwrap();
        Index::create(Arc::new(MemoryStorage::new()), schema, IndexConfig::default()).unwrap()
    }

    fn reviews(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| {
                Document::builder()
                    .add_text("review_id", format!("r{i}"))
                    .add_text("text", format!("review number {i} about pizza"))
                    .add_text("stars", if i == 4 { "lots".to_string() } else { "3".to_string() })
                    .build()
            })
            .collect()
    }

    fn config(batches: usize) -> IngestConfig {
        IngestConfig {
            batches,
            workers: 3,
            queue_capacity: 2,
            ..IngestConfig::default()
        }
    }

    #[test]
    fn test_chunk_ranges() {
        assert_eq!(chunk_ranges(10, 1).unwrap(), vec![0..10]);
        assert_eq!(chunk_ranges(10, 4).unwrap(), vec![0..2, 2..4, 4..6, 6..10]);
        assert_eq!(chunk_ranges(3, 3).unwrap(), vec![0..1, 1..2, 2..3]);
        assert_eq!(chunk_ranges(0, 1).unwrap(), vec![0..0]);

        assert!(chunk_ranges(10, 0).is_err());
        assert!(chunk_ranges(0, 0).is_err());
        assert!(chunk_ranges(0, 2).is_err());
        assert!(matches!(
            chunk_ranges(3, 4),
            Err(PlacedexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_chunk_covers_input() {
        let chunks = chunk((0..11).collect::<Vec<_>>(), 3).unwrap();
        assert_eq!(chunks, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8, 9, 10]]);
    }

    #[test]
    fn test_sequential_ingest() {
        let index = index();
        let ingestor = ChunkedIngestor::new(&index, config(3));
        let report = ingestor.ingest(reviews(10)).unwrap();

        assert_eq!(report.chunks.len(), 3);
        assert!(report.is_complete());
        assert_eq!(report.total_staged(), 9);
        assert_eq!(report.committed_docs(), 9);
        assert_eq!(report.chunks[1].rejected.len(), 1);
        assert_eq!(report.chunks[1].rejected[0].0, 4);
        assert_eq!(report.chunks[2].size(), 4);

        let reader = index.reader();
        assert_eq!(reader.num_docs(), 9);
        assert_eq!(reader.generation(), 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = index();
        ChunkedIngestor::new(&sequential, config(4))
            .ingest(reviews(25))
            .unwrap();

        let parallel = index();
        let report = ChunkedIngestor::new(&parallel, config(4))
            .ingest_parallel(reviews(25))
            .unwrap();
        assert!(report.is_complete());
        let order: Vec<usize> = report.chunks.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);

        let left: Vec<_> = sequential.reader().documents().collect();
        let right: Vec<_> = parallel.reader().documents().collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_ingest_too_many_chunks() {
        let index = index();
        let ingestor = ChunkedIngestor::new(&index, config(5));
        assert!(ingestor.ingest(reviews(3)).is_err());
        assert!(ingestor.ingest_parallel(reviews(3)).is_err());
        assert_eq!(index.reader().num_docs(), 0);
    }

    #[test]
    fn test_ingest_closed_index() {
        let index = index();
        index.close();
        let ingestor = ChunkedIngestor::new(&index, config(1));
        assert!(matches!(
            ingestor.ingest(reviews(3)),
            Err(PlacedexError::Closed)
        ));
    }
}
