//! Line clustering.
//!
//! Within one subject/market group, books often hang slightly different
//! lines (2.5 vs 2.75, 10.5 vs 10.25). Quotes whose lines sit within a
//! tolerance of a cluster's running average are treated as the same bet.
//!
//! The scan is greedy over lines sorted ascending: a quote joins the first
//! open cluster whose average is close enough, otherwise it opens a new
//! one. Averages are not revisited after later joins.

use std::cmp::Ordering;

use tracing::debug;

use super::grouper::QuoteGroup;
use super::normalize::round_half;
use super::outlier::{filter_outliers, OutlierBounds};
use crate::types::{MarketCategory, MarketCluster, MarketType, Quote};

/// Slack on tolerance comparisons so 0.25 apart counts as within 0.25.
const TOLERANCE_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Tolerance for totals and one-way markets.
    pub line_tolerance: f64,
    /// Stricter tolerance for spreads, which must not blend full-match
    /// and partial-period handicaps.
    pub spread_tolerance: f64,
    /// Minimum distinct bookmakers for a cluster to survive.
    pub min_bookmakers: usize,
    pub outliers: OutlierBounds,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 0.25,
            spread_tolerance: 0.10,
            min_bookmakers: 2,
            outliers: OutlierBounds::default(),
        }
    }
}

impl ClusterConfig {
    pub fn tolerance_for(&self, market_type: MarketType) -> f64 {
        match market_type {
            MarketType::Spread => self.spread_tolerance,
            MarketType::Totals | MarketType::PlayerOneWay => self.line_tolerance,
        }
    }
}

// ---------------------------------------------------------------------------
// Clustering
// ---------------------------------------------------------------------------

/// What happened to one group's quotes.
#[derive(Debug, Clone, Default)]
pub struct ClusterOutcome {
    pub clusters: Vec<MarketCluster>,
    /// Quotes dropped because their book already sat in the matched cluster.
    pub duplicate_books: usize,
    pub outliers_removed: usize,
    /// Candidate clusters discarded for having too few books.
    pub undersized: usize,
}

/// Open cluster during the scan.
struct Candidate {
    members: Vec<Quote>,
    line_sum: f64,
}

impl Candidate {
    fn average(&self) -> f64 {
        self.line_sum / self.members.len() as f64
    }

    fn has_book(&self, bookmaker: &str) -> bool {
        self.members.iter().any(|q| q.bookmaker == bookmaker)
    }
}

/// Cluster one group's quotes into market lines.
pub fn cluster_group(
    group: &QuoteGroup,
    category: MarketCategory,
    config: &ClusterConfig,
) -> ClusterOutcome {
    let mut outcome = ClusterOutcome::default();

    let mut sorted = group.quotes.clone();
    sorted.sort_by(|a, b| a.line.partial_cmp(&b.line).unwrap_or(Ordering::Equal));

    let mut candidates: Vec<Candidate> = Vec::new();
    for quote in sorted {
        let tolerance = config.tolerance_for(quote.market_type);
        let matched = candidates
            .iter()
            .position(|c| (quote.line - c.average()).abs() <= tolerance + TOLERANCE_EPSILON);

        match matched {
            Some(i) if candidates[i].has_book(&quote.bookmaker) => {
                debug!(
                    bookmaker = %quote.bookmaker,
                    subject = %group.key.subject,
                    line = quote.line,
                    "Book already in cluster, later quote dropped"
                );
                outcome.duplicate_books += 1;
            }
            Some(i) => {
                let candidate = &mut candidates[i];
                candidate.line_sum += quote.line;
                candidate.members.push(quote);
            }
            None => candidates.push(Candidate {
                line_sum: quote.line,
                members: vec![quote],
            }),
        }
    }

    for candidate in candidates {
        let (kept, dropped) = filter_outliers(candidate.members, &config.outliers);
        for q in &dropped {
            debug!(
                bookmaker = %q.bookmaker,
                subject = %group.key.subject,
                market = %group.key.market_key,
                price = q.over_price,
                "Outlier price removed from cluster"
            );
        }
        outcome.outliers_removed += dropped.len();

        let Some(market_type) = kept.first().map(|q| q.market_type) else {
            continue;
        };
        let cluster = MarketCluster {
            subject: group.display_subject.clone(),
            market_key: group.key.market_key.clone(),
            market_type,
            category,
            line: 0.0,
            members: kept,
        };
        if cluster.book_count() < config.min_bookmakers {
            debug!(
                subject = %group.key.subject,
                market = %group.key.market_key,
                books = cluster.book_count(),
                min = config.min_bookmakers,
                "Cluster below minimum bookmakers, discarded"
            );
            outcome.undersized += 1;
            continue;
        }
        let line = round_half(cluster.average_line());
        outcome.clusters.push(MarketCluster { line, ..cluster });
    }

    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
