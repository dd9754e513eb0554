//! End-to-end scenarios over the places and opinions collections

use std::sync::Arc;

use placedex::config::{IndexConfig, IngestConfig};
use placedex::document::{DocId, Document, JsonDocumentConverter};
use placedex::error::Result;
use placedex::index::{ChunkedIngestor, Index, UniquePolicy, chunk_ranges};
use placedex::query::{GeoFilter, GeoHit, QueryPoint};
use placedex::schema::collections::{opinions_schema, places_schema};
use placedex::storage::{FileStorage, Storage, StorageConfig};
use tempfile::TempDir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn file_storage(dir: &TempDir) -> Arc<dyn Storage> {
    Arc::new(FileStorage::new(dir.path(), StorageConfig::default()).unwrap())
}

fn places_index(dir: &TempDir) -> Index {
    let schema = places_schema().unwrap();
    let index = Index::create(file_storage(dir), schema.clone(), IndexConfig::default()).unwrap();

    let converter = JsonDocumentConverter::new();
    let records = [
        r#"{"business_id":"b1","name":"Joe's Pizza","city":"Nashville","latitude":36.115,"longitude":-86.767,"stars":4.5,"categories":"Pizza, Italian","is_open":1}"#,
        r#"{"business_id":"b2","name":"Mario's","city":"Nashville","latitude":36.200,"longitude":-86.900,"stars":4.0,"categories":["Italian"],"is_open":0}"#,
    ];
    let mut writer = index.writer(UniquePolicy::Reject).unwrap();
    for record in records {
        writer.stage(converter.convert_str(record, &schema).unwrap()).unwrap();
    }
    writer.commit().unwrap();
    index
}

#[test]
fn test_scenario_a_phrase_query_on_name() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let index = places_index(&dir);

    let query = index.query_parser().parse("name:\"Joe's Pizza\"").unwrap();
    let top = index.searcher().search(&query, None).unwrap();

    assert_eq!(top.total_hits, 1);
    assert_eq!(
        top.hits[0].document.get_field("business_id").and_then(|v| v.as_text()),
        Some("b1")
    );
}

#[test]
fn test_scenario_b_geospatial_scan() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let index = places_index(&dir);
    let searcher = index.searcher();
    let filter = GeoFilter::default();

    let near = QueryPoint::new(36.115118, -86.766925, 0.5).unwrap();
    let hits = filter.scan(&searcher, &near);
    assert_eq!(hits.len(), 1);
    assert_eq!(
        hits[0].document.get_field("business_id").and_then(|v| v.as_text()),
        Some("b1")
    );
    assert!(hits[0].distance_km < 0.05);
    assert_eq!(hits[0].score, None);

    // b2 is well over 10 km away.
    let wide = QueryPoint::new(36.115118, -86.766925, 10.0).unwrap();
    assert_eq!(filter.scan(&searcher, &wide).len(), 1);
    let everything = QueryPoint::new(36.115118, -86.766925, 50.0).unwrap();
    assert_eq!(filter.scan(&searcher, &everything).len(), 2);

    // Combined mode keeps text rank order and scores.
    let query = index.query_parser().parse("city:nashville").unwrap();
    let combined = filter.combined(&searcher, &query, &near).unwrap();
    assert_eq!(combined.len(), 1);
    assert!(combined[0].score.is_some());
}

#[test]
fn test_combined_search_drops_matches_below_text_cutoff() -> Result<()> {
    init_logger();
    let dir = TempDir::new().unwrap();
    let index = Index::create(file_storage(&dir), places_schema()?, IndexConfig::default())?;

    // Equal names rank by doc id, so doc 5 is the lowest-ranked match. Docs 0
    // and 5 sit on the query point, the rest are hundreds of km away.
    let mut writer = index.writer(UniquePolicy::Reject)?;
    for i in 0..6 {
        let (lat, lon) = if i == 0 || i == 5 {
            (36.1627, -86.7816)
        } else {
            (40.0 + i as f64, -80.0)
        };
        writer.stage(
            Document::builder()
                .add_text("business_id", format!("b{i}"))
                .add_text("name", format!("pizza place {i}"))
                .add_numeric("latitude", lat)
                .add_numeric("longitude", lon)
                .build(),
        )?;
    }
    writer.commit()?;

    let searcher = index.searcher();
    let query = index.query_parser().parse("pizza")?;
    let point = QueryPoint::new(36.1627, -86.7816, 1.0)?;
    let ids = |hits: &[GeoHit]| -> Vec<DocId> {
        hits.iter().map(|hit| hit.doc_id).collect()
    };

    let ranked = searcher.search(&query, None)?;
    assert_eq!(ranked.doc_ids(), vec![0, 1, 2, 3, 4, 5]);

    let filter = GeoFilter::default().with_text_limit(3);
    assert_eq!(ids(&filter.combined(&searcher, &query, &point)?), vec![0]);
    assert_eq!(ids(&filter.scan(&searcher, &point)), vec![0, 5]);

    let filter = GeoFilter::default().with_text_limit(6);
    assert_eq!(ids(&filter.combined(&searcher, &query, &point)?), vec![0, 5]);

    Ok(())
}

#[test]
fn test_scenario_c_chunk_sizes() {
    init_logger();
    let ranges = chunk_ranges(95, 10).unwrap();
    let sizes: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
    assert_eq!(sizes, vec![9, 9, 9, 9, 9, 9, 9, 9, 9, 14]);

    let dir = TempDir::new().unwrap();
    let index = Index::create(
        file_storage(&dir),
        places_schema().unwrap(),
        IndexConfig::default(),
    )
    .unwrap();
    let records: Vec<Document> = (0..95)
        .map(|i| {
            Document::builder()
                .add_text("business_id", format!("b{i}"))
                .add_text("name", format!("Place {i}"))
                .build()
        })
        .collect();

    let config = IngestConfig {
        batches: 10,
        ..IngestConfig::default()
    };
    let report = ChunkedIngestor::new(&index, config).ingest(records).unwrap();
    let sizes: Vec<usize> = report.chunks.iter().map(|c| c.size()).collect();
    assert_eq!(sizes, vec![9, 9, 9, 9, 9, 9, 9, 9, 9, 14]);
    assert!(report.is_complete());
    assert_eq!(index.reader().num_docs(), 95);
    assert_eq!(index.generation(), 10);
}

#[test]
fn test_scenario_d_bad_timestamp_is_skipped() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let index = Index::create(
        file_storage(&dir),
        opinions_schema().unwrap(),
        IndexConfig::default(),
    )
    .unwrap();

    let records: Vec<Document> = (0..6)
        .map(|i| {
            let date = if i == 2 {
                "2021-13-40 00:00:00".to_string()
            } else {
                format!("2021-01-0{} 12:30:00", i + 1)
            };
            Document::builder()
                .add_text("review_id", format!("r{i}"))
                .add_text("user_id", "u1")
                .add_text("business_id", "b1")
                .add_text("text", "Great crust, friendly staff")
                .add_text("date", date)
                .build()
        })
        .collect();

    let config = IngestConfig {
        batches: 2,
        ..IngestConfig::default()
    };
    let report = ChunkedIngestor::new(&index, config).ingest(records).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.chunks[0].skipped, vec![(2, "2021-13-40 00:00:00".to_string())]);
    assert_eq!(report.chunks[0].commit.as_ref().unwrap().doc_count, 2);
    assert_eq!(report.total_skipped(), 1);

    let reader = index.reader();
    assert_eq!(reader.num_docs(), 5);
    assert!(reader.find_by("review_id", "r2").unwrap().is_empty());
    assert_eq!(reader.find_by("date", "2021-01-04 12:30:00").unwrap().len(), 1);
}
