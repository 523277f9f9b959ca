//! Persistence layer.
//!
//! Saves and loads scan reports to/from a JSON file so downstream
//! consumers can pick up the latest ranking.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::ScanReport;

/// Save a scan report as pretty JSON, replacing any previous one.
pub fn save_report(report: &ScanReport, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialise scan report")?;

    std::fs::write(path, &json).context(format!("Failed to write report to {path}"))?;

    debug!(
        path,
        run_id = %report.run_id,
        opportunities = report.opportunities.len(),
        "Report saved"
    );
    Ok(())
}

/// Load a scan report from a JSON file.
/// Returns None if the file doesn't exist (nothing scanned yet).
pub fn load_report(path: &str) -> Result<Option<ScanReport>> {
    if !Path::new(path).exists() {
        info!(path, "No saved report found");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path).context(format!("Failed to read report from {path}"))?;

    let report: ScanReport =
        serde_json::from_str(&json).context(format!("Failed to parse report from {path}"))?;

    info!(
        path,
        run_id = %report.run_id,
        generated_at = %report.generated_at,
        opportunities = report.opportunities.len(),
        "Report loaded from disk"
    );

    Ok(Some(report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvOpportunity, MarketCategory, ReferenceQuote, RunStats, Side};
    use chrono::Utc;

    fn temp_path() -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("fairline_test_report_{}.json", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    fn make_report() -> ScanReport {
        ScanReport {
            run_id: uuid::Uuid::new_v4(),
            generated_at: Utc::now(),
            source: "file:quotes.json".to_string(),
            devig_method: "power".to_string(),
            stats: RunStats {
                quotes_in: 3,
                clusters: 1,
                opportunities: 1,
                ..RunStats::default()
            },
            opportunities: vec![EvOpportunity {
                subject: "Arsenal v Chelsea".to_string(),
                market_key: "totals".to_string(),
                market_name: "Total Goals".to_string(),
                category: MarketCategory::Match,
                line: 2.5,
                side: Side::Primary,
                bet_type: "Over".to_string(),
                bookmaker: "softbook".to_string(),
                offered_odds: 2.30,
                fair_odds: 2.0,
                fair_probability: 0.5,
                ev_percent: 15.0,
                books_used: 1,
                references: vec![ReferenceQuote {
                    bookmaker: "book_b".to_string(),
                    over_price: 2.0,
                    under_price: Some(2.0),
                    vig_percent: 0.0,
                    fair_probability: 0.5,
                }],
            }],
        }
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path();
        let report = make_report();
        save_report(&report, &path).unwrap();

        let loaded = load_report(&path).unwrap().unwrap();
        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.devig_method, "power");
        assert_eq!(loaded.stats, report.stats);
        assert_eq!(loaded.opportunities[0].bookmaker, "softbook");
        assert_eq!(loaded.opportunities[0].references.len(), 1);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_nonexistent() {
        let loaded = load_report(&temp_path()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_overwrites_previous() {
        let path = temp_path();
        save_report(&make_report(), &path).unwrap();

        let mut second = make_report();
        second.opportunities.clear();
        save_report(&second, &path).unwrap();

        let loaded = load_report(&path).unwrap().unwrap();
        assert_eq!(loaded.run_id, second.run_id);
        assert!(loaded.opportunities.is_empty());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_corrupt_file_errors() {
        let path = temp_path();
        std::fs::write(&path, "{ definitely not a report").unwrap();
        assert!(load_report(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
