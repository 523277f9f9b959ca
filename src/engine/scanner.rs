//! Snapshot scanner.
//!
//! Pulls one snapshot from a `QuoteSource`, runs it through the EV
//! pipeline and stamps the result as a `ScanReport`. Loading is async;
//! the pipeline itself is plain synchronous computation.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::data::QuoteSource;
use crate::strategy::EvPipeline;
use crate::types::ScanReport;

/// Pairs a quote source with a configured pipeline.
pub struct Scanner<S: QuoteSource> {
    source: S,
    pipeline: EvPipeline,
}

impl<S: QuoteSource> Scanner<S> {
    pub fn new(source: S, pipeline: EvPipeline) -> Self {
        Self { source, pipeline }
    }

    pub fn pipeline(&self) -> &EvPipeline {
        &self.pipeline
    }

    /// Load the current snapshot and rank it.
    pub async fn scan_once(&self) -> Result<ScanReport> {
        let source_name = self.source.name();
        let raws = self
            .source
            .load_snapshot()
            .await
            .with_context(|| format!("Failed to load snapshot from {source_name}"))?;

        if raws.is_empty() {
            warn!(source = %source_name, "Snapshot is empty");
        }

        let run = self.pipeline.run(&raws);
        let report = ScanReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            source: source_name,
            devig_method: self.pipeline.method().to_string(),
            stats: run.stats,
            opportunities: run.opportunities,
        };

        info!(
            run_id = %report.run_id,
            source = %report.source,
            opportunities = report.stats.opportunities,
            best_ev = report
                .opportunities
                .first()
                .map(|o| format!("{:.2}%", o.ev_percent))
                .unwrap_or_else(|| "-".to_string()),
            "Scan complete"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
