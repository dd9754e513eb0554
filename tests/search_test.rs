//! Integration tests for stored fields, analysis and ranked search

use std::sync::Arc;

use chrono::NaiveDate;
use placedex::analysis::{StandardAnalyzer, analyze_terms};
use placedex::config::{IndexConfig, IngestConfig};
use placedex::document::{Document, FieldValue};
use placedex::error::Result;
use placedex::index::{ChunkedIngestor, Index, UniquePolicy};
use placedex::query::{Bm25Scorer, GeoPoint, Query};
use placedex::schema::collections::{opinions_schema, places_schema};
use placedex::storage::{FileStorage, MemoryStorage, Storage, StorageConfig};
use tempfile::TempDir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reviews(n: usize) -> Vec<Document> {
    let texts = [
        "The pizza was great and the crust was crispy",
        "Terrible service, cold pizza",
        "Tacos everywhere, tacos forever",
        "Theodore recommended the noodles",
        "A quiet place for coffee",
    ];
    (0..n)
        .map(|i| {
            Document::builder()
                .add_text("review_id", format!("r{i:03}"))
                .add_text("business_id", format!("b{}", i % 7))
                .add_numeric("stars", (i % 5 + 1) as f64)
                .add_text("text", texts[i % texts.len()])
                .add_text("date", format!("2020-02-{:02} 08:15:00", i % 28 + 1))
                .build()
        })
        .collect()
}

#[test]
fn test_stored_fields_round_trip() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let storage: Arc<dyn Storage> =
        Arc::new(FileStorage::new(dir.path(), StorageConfig::default()).unwrap());
    let index =
        Index::create(storage.clone(), places_schema().unwrap(), IndexConfig::default()).unwrap();

    let original = Document::builder()
        .add_text("business_id", "b1")
        .add_text("name", "Joe's Pizza")
        .add_numeric("latitude", 36.115)
        .add_numeric("longitude", -86.767)
        .add_text("stars", "4.5")
        .add_boolean("is_open", true)
        .add_text("categories", "Pizza, Italian")
        .add_text("hours", r#"{"Monday":"11:0-22:0"}"#)
        .build();
    let mut writer = index.writer(UniquePolicy::Reject).unwrap();
    writer.stage(original.clone()).unwrap();
    writer.commit().unwrap();
    index.close();

    let reopened = Index::open(storage, places_schema().unwrap(), IndexConfig::default()).unwrap();
    let reader = reopened.reader();
    let stored = reader.doc(0).unwrap();
    assert_eq!(stored.fields, original);
    assert_eq!(stored.get_numeric("stars"), Some(4.5));

    // Terms still come from the coerced values.
    assert_eq!(reader.find_by("categories", "Italian").unwrap().len(), 1);
    assert_eq!(reader.find_by("stars", "4.5").unwrap().len(), 1);
}

#[test]
fn test_timestamp_round_trip() {
    init_logger();
    let index = Index::create(
        Arc::new(MemoryStorage::new()),
        opinions_schema().unwrap(),
        IndexConfig::default(),
    )
    .unwrap();
    let parsed = NaiveDate::from_ymd_opt(2021, 5, 6)
        .unwrap()
        .and_hms_opt(19, 0, 0)
        .unwrap();
    let mut writer = index.writer(UniquePolicy::Reject).unwrap();
    writer.stage(reviews(1).remove(0)).unwrap();
    writer
        .stage(
            Document::builder()
                .add_text("review_id", "r-typed")
                .add_timestamp("date", parsed)
                .build(),
        )
        .unwrap();
    writer.commit().unwrap();

    let reader = index.reader();
    let text = reader.doc(0).unwrap();
    assert_eq!(text.get("date"), Some(&FieldValue::from("2020-02-01 08:15:00")));
    assert_eq!(text.get_numeric("stars"), Some(1.0));
    let typed = reader.doc(1).unwrap();
    assert_eq!(typed.get("date"), Some(&FieldValue::Timestamp(parsed)));

    assert_eq!(reader.find_by("date", "2020-02-01 08:15:00").unwrap().len(), 1);
    assert_eq!(reader.find_by("date", "2021-05-06 19:00:00").unwrap().len(), 1);
}

#[test]
fn test_stop_words_are_whole_tokens() {
    let analyzer = StandardAnalyzer::new().unwrap();
    let first = analyze_terms(&analyzer, "Theodore and THE Others").unwrap();
    let second = analyze_terms(&analyzer, "Theodore and THE Others").unwrap();
    assert_eq!(first, second);
    assert!(first.iter().any(|t| t.starts_with("theodor")));
    assert!(!first.contains(&"the".to_string()));
    assert!(!first.contains(&"and".to_string()));
    assert!(analyze_terms(&analyzer, "").unwrap().is_empty());
}

#[test]
fn test_words_stemming_to_stop_words_are_searchable() -> Result<()> {
    init_logger();
    let analyzer = StandardAnalyzer::new()?;
    for word in ["WA", "AR", "ars"] {
        assert!(!analyze_terms(&analyzer, word)?.is_empty(), "{word} was dropped");
    }

    let index = Index::create(
        Arc::new(MemoryStorage::new()),
        places_schema()?,
        IndexConfig::default(),
    )?;
    let mut writer = index.writer(UniquePolicy::Reject)?;
    for (id, name, state) in [("b1", "Pike Place", "WA"), ("b2", "Ars Nova", "AR")] {
        writer.stage(
            Document::builder()
                .add_text("business_id", id)
                .add_text("name", name)
                .add_text("state", state)
                .build(),
        )?;
    }
    writer.commit()?;

    let parser = index.query_parser();
    let searcher = index.searcher();
    let business = |query: &Query| -> Result<Vec<String>> {
        Ok(searcher
            .search(query, None)?
            .hits
            .iter()
            .filter_map(|hit| hit.document.get_field("business_id")?.as_text().map(str::to_string))
            .collect())
    };

    assert_eq!(business(&parser.parse("state:WA")?)?, vec!["b1"]);
    assert_eq!(business(&parser.parse_field("state", "AR")?)?, vec!["b2"]);
    assert_eq!(business(&parser.parse_field("name", "ars")?)?, vec!["b2"]);

    Ok(())
}

#[test]
fn test_scoring_is_deterministic() {
    init_logger();
    let index = Index::create(
        Arc::new(MemoryStorage::new()),
        opinions_schema().unwrap(),
        IndexConfig::default(),
    )
    .unwrap();
    let report = ChunkedIngestor::new(
        &index,
        IngestConfig {
            batches: 4,
            ..IngestConfig::default()
        },
    )
    .ingest(reviews(40))
    .unwrap();
    assert!(report.is_complete());

    let parser = index.query_parser();
    let query = parser.parse("pizza OR tacos OR theodore").unwrap();
    let first = index.searcher().search(&query, None).unwrap();
    let second = index.searcher().search(&query, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.total_hits, 32);

    // Descending score, ties by ascending doc id.
    for pair in first.hits.windows(2) {
        assert!(
            pair[0].score > pair[1].score
                || (pair[0].score == pair[1].score && pair[0].doc_id < pair[1].doc_id)
        );
    }

    // Repeated "tacos" outranks single mentions of the other terms.
    let tacos = parser.parse("tacos").unwrap();
    let top = index.searcher().search(&tacos, Some(3)).unwrap();
    assert_eq!(top.total_hits, 8);
    assert_eq!(top.doc_ids(), vec![2, 7, 12]);

    let stats = index.reader().field_stats("text");
    let idf = Bm25Scorer::idf(stats.doc_count, 8);
    assert!(idf > 0.0);
}

#[test]
fn test_parallel_and_sequential_ingest_agree() {
    init_logger();
    let sequential_dir = TempDir::new().unwrap();
    let parallel_dir = TempDir::new().unwrap();
    let open = |dir: &TempDir| {
        let storage: Arc<dyn Storage> =
            Arc::new(FileStorage::new(dir.path(), StorageConfig::default()).unwrap());
        Index::create(storage, opinions_schema().unwrap(), IndexConfig::default()).unwrap()
    };
    let config = IngestConfig {
        batches: 7,
        workers: 4,
        queue_capacity: 2,
        ..IngestConfig::default()
    };

    let sequential = open(&sequential_dir);
    ChunkedIngestor::new(&sequential, config.clone())
        .ingest(reviews(100))
        .unwrap();

    let parallel = open(&parallel_dir);
    let report = ChunkedIngestor::new(&parallel, config)
        .ingest_parallel(reviews(100))
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.chunks.len(), 7);
    assert_eq!(report.chunks[6].size(), 16);

    let left: Vec<_> = sequential.reader().documents().collect();
    let right: Vec<_> = parallel.reader().documents().collect();
    assert_eq!(left.len(), 100);
    assert_eq!(left, right);

    let query = Query::term("text", "pizza");
    assert_eq!(
        sequential.searcher().search(&query, None).unwrap(),
        parallel.searcher().search(&query, None).unwrap()
    );
}

#[test]
fn test_haversine_properties() {
    let points = [
        GeoPoint::new(0.0, 0.0).unwrap(),
        GeoPoint::new(36.115, -86.767).unwrap(),
        GeoPoint::new(-33.86, 151.21).unwrap(),
        GeoPoint::new(89.9, 179.9).unwrap(),
    ];
    for a in &points {
        assert_eq!(a.distance_km(a), 0.0);
        for b in &points {
            let (ab, ba) = (a.distance_km(b), b.distance_km(a));
            assert!((ab - ba).abs() < 1e-9);
            assert!(ab >= 0.0);
        }
    }
    let d = points[0].distance_km(&GeoPoint::new(0.0, 1.0).unwrap());
    assert!((d - 111.19).abs() < 0.01);
}
