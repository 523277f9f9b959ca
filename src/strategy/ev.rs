//! EV scoring.
//!
//! Scores every offered price in a cluster against its fair value and
//! keeps the ones inside the actionable band: at least the minimum edge,
//! at most the plausibility ceiling.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::types::{EvOpportunity, FairValue, MarketCluster, Side};

/// Slack on threshold comparisons so that a 3.00% edge clears a 3% floor.
const EV_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Business thresholds for surfacing an opportunity.
#[derive(Debug, Clone, PartialEq)]
pub struct EvConfig {
    /// Minimum EV percent to surface (inclusive).
    pub min_ev_percent: f64,
    /// EV percent above which a reading is treated as a matching error.
    pub max_plausible_ev: f64,
    /// Books whose prices may be surfaced. Empty means all.
    pub playable_books: Vec<String>,
}

impl Default for EvConfig {
    fn default() -> Self {
        Self {
            min_ev_percent: 3.0,
            max_plausible_ev: 35.0,
            playable_books: Vec::new(),
        }
    }
}

impl EvConfig {
    pub fn is_playable(&self, bookmaker: &str) -> bool {
        self.playable_books.is_empty()
            || self
                .playable_books
                .iter()
                .any(|b| b.eq_ignore_ascii_case(bookmaker))
    }

    /// Classify an EV reading.
    pub fn screen(&self, ev_percent: f64) -> EvScreen {
        if ev_percent > self.max_plausible_ev + EV_EPSILON {
            EvScreen::Implausible
        } else if ev_percent + EV_EPSILON < self.min_ev_percent {
            EvScreen::BelowThreshold
        } else {
            EvScreen::Accepted
        }
    }
}

/// Outcome of checking one EV reading against the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvScreen {
    Accepted,
    BelowThreshold,
    /// Above the plausibility ceiling: almost certainly mismatched markets.
    Implausible,
}

/// Bettor's edge in percent: `(p * odds - 1) * 100`.
pub fn ev_percent(fair_probability: f64, offered_odds: f64) -> f64 {
    (fair_probability * offered_odds - 1.0) * 100.0
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Result of scoring one side of one cluster.
#[derive(Debug, Clone, Default)]
pub struct SideScore {
    pub accepted: Vec<EvOpportunity>,
    pub below_threshold: usize,
    pub implausible: usize,
}

/// Scores prices against fair values.
#[derive(Debug, Clone)]
pub struct EvScorer {
    config: EvConfig,
}

impl EvScorer {
    pub fn new(config: EvConfig) -> Self {
        Self { config }
    }

    /// Access the EV configuration.
    pub fn config(&self) -> &EvConfig {
        &self.config
    }

    /// Score every playable member quoting `side`, reference books included.
    pub fn score_side(
        &self,
        cluster: &MarketCluster,
        side: Side,
        fair: &FairValue,
        market_name: &str,
    ) -> SideScore {
        let mut score = SideScore::default();

        for quote in &cluster.members {
            let Some(offered) = quote.price(side) else {
                continue;
            };
            if !self.config.is_playable(&quote.bookmaker) {
                continue;
            }

            let ev = ev_percent(fair.fair_probability, offered);
            match self.config.screen(ev) {
                EvScreen::BelowThreshold => score.below_threshold += 1,
                EvScreen::Implausible => {
                    warn!(
                        bookmaker = %quote.bookmaker,
                        subject = %cluster.subject,
                        market = %cluster.market_key,
                        line = cluster.line,
                        side = side.label(cluster.market_type),
                        offered,
                        fair_odds = format!("{:.3}", fair.fair_odds),
                        ev = format!("{:.1}%", ev),
                        ceiling = format!("{:.1}%", self.config.max_plausible_ev),
                        "Implausible EV, likely a mismatched market; not surfaced"
                    );
                    score.implausible += 1;
                }
                EvScreen::Accepted => {
                    debug!(
                        bookmaker = %quote.bookmaker,
                        subject = %cluster.subject,
                        market = %cluster.market_key,
                        side = side.label(cluster.market_type),
                        offered,
                        ev = format!("{:.2}%", ev),
                        "EV opportunity"
                    );
                    score.accepted.push(EvOpportunity {
                        subject: cluster.subject.clone(),
                        market_key: cluster.market_key.clone(),
                        market_name: market_name.to_string(),
                        category: cluster.category,
                        line: cluster.line,
                        side,
                        bet_type: side.label(cluster.market_type).to_string(),
                        bookmaker: quote.bookmaker.clone(),
                        offered_odds: offered,
                        fair_odds: fair.fair_odds,
                        fair_probability: fair.fair_probability,
                        ev_percent: ev,
                        books_used: fair.books_used(),
                        references: fair.references.clone(),
                    });
                }
            }
        }

        score
    }
}

/// Sort by EV descending. Stable, so equal edges keep input order.
pub fn rank(opportunities: &mut [EvOpportunity]) {
    opportunities.sort_by(|a, b| {
        b.ev_percent
            .partial_cmp(&a.ev_percent)
            .unwrap_or(Ordering::Equal)
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
