//! Scanner and report storage over the on-disk sample snapshot.

use fairline::config::EngineConfig;
use fairline::data::snapshot::FileQuoteSource;
use fairline::data::QuoteSource;
use fairline::engine::scanner::Scanner;
use fairline::matching::catalog::MarketCatalog;
use fairline::storage;
use fairline::strategy::EvPipeline;

use crate::{load_fixture, FIXTURE};

fn temp_path() -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("fairline_it_report_{}.json", uuid::Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

fn make_scanner(path: &str) -> Scanner<FileQuoteSource> {
    let pipeline = EvPipeline::new(EngineConfig::default(), MarketCatalog::default()).unwrap();
    Scanner::new(FileQuoteSource::new(path), pipeline)
}

#[tokio::test]
async fn test_file_source_matches_fixture() {
    let source = FileQuoteSource::new(FIXTURE);
    let quotes = source.load_snapshot().await.unwrap();
    assert_eq!(quotes.len(), load_fixture().len());
}

#[tokio::test]
async fn test_scan_and_persist_report() {
    let scanner = make_scanner(FIXTURE);
    let report = scanner.scan_once().await.unwrap();
    assert_eq!(report.devig_method, "multiplicative");
    assert_eq!(report.stats.opportunities, 2);
    assert_eq!(report.top(1).len(), 1);
    assert_eq!(report.top(10).len(), 2);

    let path = temp_path();
    storage::save_report(&report, &path).unwrap();
    let loaded = storage::load_report(&path).unwrap().unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.stats, report.stats);
    assert_eq!(loaded.opportunities.len(), 2);
    assert_eq!(loaded.opportunities[0].bookmaker, "softbook");

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_scan_missing_snapshot_errors() {
    let scanner = make_scanner("/nonexistent/fairline/quotes.json");
    assert!(scanner.scan_once().await.is_err());
}
