//! JSON snapshot file source.
//!
//! Reads a file written by the odds collaborator. Accepts either a bare
//! array of quotes or an object with a `quotes` array (optionally with
//! other metadata alongside, which is ignored).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::QuoteSource;
use crate::types::{EngineError, RawQuote};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Bare(Vec<Value>),
    Wrapped { quotes: Vec<Value> },
}

/// Parse snapshot JSON text.
///
/// Records are decoded one at a time; a record that isn't a quote object
/// is skipped and the rest of the snapshot survives.
pub fn parse_snapshot(json: &str) -> Result<Vec<RawQuote>> {
    let parsed: SnapshotFile = serde_json::from_str(json).map_err(|e| EngineError::Snapshot {
        source_name: "json".to_string(),
        message: e.to_string(),
    })?;
    let records = match parsed {
        SnapshotFile::Bare(records) => records,
        SnapshotFile::Wrapped { quotes } => quotes,
    };

    let mut quotes = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<RawQuote>(record) {
            Ok(quote) => quotes.push(quote),
            Err(e) => warn!(index, error = %e, "Snapshot record is not a quote, skipped"),
        }
    }
    Ok(quotes)
}

/// Snapshot source backed by a JSON file on disk.
pub struct FileQuoteSource {
    path: PathBuf,
}

impl FileQuoteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuoteSource for FileQuoteSource {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn load_snapshot(&self) -> Result<Vec<RawQuote>> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", self.path.display()))?;
        let quotes = parse_snapshot(&json)
            .with_context(|| format!("Failed to parse snapshot {}", self.path.display()))?;
        debug!(path = %self.path.display(), count = quotes.len(), "Snapshot loaded");
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::intake::parse_quotes;
    use crate::matching::catalog::MarketCatalog;

    fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("fairline_test_snapshot_{}.json", uuid::Uuid::new_v4()));
        p
    }

    #[test]
    fn test_parse_bare_and_wrapped() {
        let bare = r#"[{"subject":"A","market_key":"totals","line":2.5,"over_price":1.9,"bookmaker":"x"}]"#;
        assert_eq!(parse_snapshot(bare).unwrap().len(), 1);

        let wrapped = r#"{"fetched_at":"2026-10-16T12:00:00Z","quotes":[
            {"subject":"A","market_key":"totals","line":2.5,"over_price":1.9,"bookmaker":"x"},
            {"subject":"A","market_key":"totals","line":2.5,"over_price":1.95,"bookmaker":"y"}]}"#;
        assert_eq!(parse_snapshot(wrapped).unwrap().len(), 2);
    }

    #[test]
    fn test_bad_record_does_not_sink_snapshot() {
        let json = r#"[
            {"subject":"A","market_key":"totals","line":2.5,"over_price":1.9,"bookmaker":"x"},
            {"subject":"A","market_key":"totals","line":2.5,"over_price":1.95,"bookmaker":"y"},
            {"subject":null,"market_key":"totals","line":2.5,"over_price":2.0,"bookmaker":"z"},
            {"subject":"A","market_key":"totals","line":2.5,"over_price":2.0,"bookmaker":"w","timestamp":1700000000},
            17
        ]"#;
        let quotes = parse_snapshot(json).unwrap();
        assert_eq!(quotes.len(), 4);
        assert_eq!(quotes[2].subject, "");
        assert_eq!(quotes[3].timestamp.as_deref(), Some("1700000000"));

        let catalog = MarketCatalog::default();
        let (parsed, rejected) = parse_quotes(&quotes, &catalog);
        assert_eq!(parsed.len(), 3);
        assert_eq!(rejected, 1);
        assert!(parsed[2].timestamp.is_some());
    }

    #[test]
    fn test_parse_garbage_is_snapshot_error() {
        let err = parse_snapshot("{not json").unwrap_err();
        assert!(err.downcast_ref::<EngineError>().is_some());
    }

    #[tokio::test]
    async fn test_file_source_reads_snapshot() {
        let path = temp_path();
        std::fs::write(
            &path,
            r#"[{"subject":"A","market_key":"totals","line":"2.5","over_price":"1.9","bookmaker":"x"}]"#,
        )
        .unwrap();

        let source = FileQuoteSource::new(&path);
        let quotes = source.load_snapshot().await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].bookmaker, "x");
        assert!(source.name().starts_with("file:"));

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_file_source_missing_file_errors() {
        let source = FileQuoteSource::new(temp_path());
        assert!(source.load_snapshot().await.is_err());
    }

    #[test]
    fn test_file_source_blocking_wrapped() {
        let path = temp_path();
        std::fs::write(
            &path,
            r#"{"quotes":[{"subject":"A","market":"totals","point":2.5,"over":1.9,"under":1.9,"book":"x"}]}"#,
        )
        .unwrap();

        let quotes = tokio_test::block_on(FileQuoteSource::new(&path).load_snapshot()).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].market_key, "totals");

        std::fs::remove_file(&path).unwrap();
    }
}
