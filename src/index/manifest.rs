//! The commit pointer.
//!
//! `manifest.json` names the visible segments, the tombstoned doc ids and the
//! next doc id to assign. It is replaced atomically: the new version is
//! written to `manifest.json.tmp`, synced, then renamed over the old one.

use serde::{Deserialize, Serialize};

use crate::document::DocId;
use crate::error::{PlacedexError, Result};
use crate::storage::Storage;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_TEMP_FILE: &str = "manifest.json.tmp";
pub const SCHEMA_FILE: &str = "schema.json";

/// Information about a segment named by the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// Segment identifier; the file is `seg_<id>.seg`.
    pub segment_id: String,

    /// Number of documents in this segment.
    pub doc_count: u64,

    /// Smallest doc id in this segment.
    pub first_doc_id: DocId,

    /// Generation that introduced this segment.
    pub generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generation: u64,
    pub next_doc_id: DocId,
    pub segments: Vec<SegmentInfo>,
    /// Ascending, without duplicates.
    pub tombstones: Vec<DocId>,
}

impl Manifest {
    pub fn exists(storage: &dyn Storage) -> bool {
        storage.file_exists(MANIFEST_FILE)
    }

    pub fn load(storage: &dyn Storage) -> Result<Self> {
        let bytes = storage.read_all(MANIFEST_FILE)?;
        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| PlacedexError::storage(format!("Corrupt {MANIFEST_FILE}: {e}")))?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Write-temp-then-rename. A failure before the rename leaves the
    /// previous manifest in place; once renamed, the new one is authoritative.
    pub fn save(&self, storage: &dyn Storage) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let result = storage
            .write_all(MANIFEST_TEMP_FILE, &bytes)
            .and_then(|_| storage.rename_file(MANIFEST_TEMP_FILE, MANIFEST_FILE));
        if let Err(e) = result {
            let _ = storage.delete_file(MANIFEST_TEMP_FILE);
            return Err(e);
        }
        if let Err(e) = storage.sync() {
            log::warn!("manifest generation {} renamed but not synced: {e}", self.generation);
        }
        Ok(())
    }

    /// Live documents: all segment documents minus tombstones.
    pub fn live_docs(&self) -> u64 {
        let total: u64 = self.segments.iter().map(|s| s.doc_count).sum();
        total.saturating_sub(self.tombstones.len() as u64)
    }

    /// The manifest that results from committing one more segment.
    pub fn with_segment(&self, info: SegmentInfo, tombstones: &[DocId]) -> Manifest {
        let mut next = self.clone();
        next.generation = info.generation;
        next.next_doc_id = info.first_doc_id + info.doc_count;
        next.segments.push(info);
        next.tombstones.extend_from_slice(tombstones);
        next.tombstones.sort_unstable();
        next.tombstones.dedup();
        next
    }

    fn check(&self) -> Result<()> {
        let mut expected_min = 0;
        for segment in &self.segments {
            if segment.first_doc_id < expected_min {
                return Err(PlacedexError::storage(format!(
                    "Segment {} overlaps an earlier segment",
                    segment.segment_id
                )));
            }
            expected_min = segment.first_doc_id + segment.doc_count;
        }
        if expected_min > self.next_doc_id {
            return Err(PlacedexError::storage(format!(
                "next_doc_id {} is below assigned ids",
                self.next_doc_id
            )));
        }
        if self.tombstones.iter().any(|&id| id >= self.next_doc_id) {
            return Err(PlacedexError::storage("Tombstone beyond assigned ids"));
        }
        Ok(())
    }
}
