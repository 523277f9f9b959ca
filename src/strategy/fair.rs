//! Fair value derivation.
//!
//! Picks the reference probability for one side of a cluster. The policy
//! is applied in a fixed order:
//!
//! 1. a designated sharp book (first match in priority order),
//! 2. with exactly two two-sided books, the one with the lower margin,
//! 3. otherwise the mean of every two-sided book's de-vigged value.
//!
//! One-way markets use a two-sided book when one exists, else the median
//! one-sided implied probability shrunk by an assumed margin.

use tracing::debug;

use super::devig::{DevigMethod, DevigResult};
use crate::matching::outlier::median;
use crate::types::{FairValue, MarketCluster, MarketType, Quote, ReferenceQuote, Side};

/// Configuration for fair value selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FairValueConfig {
    pub method: DevigMethod,
    /// Highest priority first.
    pub sharp_books: Vec<String>,
    pub min_reference_books: usize,
    pub one_way_vig_allowance: f64,
}

impl Default for FairValueConfig {
    fn default() -> Self {
        Self {
            method: DevigMethod::Multiplicative,
            sharp_books: Vec::new(),
            min_reference_books: 1,
            one_way_vig_allowance: 0.08,
        }
    }
}

/// A two-sided book and its de-vigged result.
struct Devigged<'a> {
    quote: &'a Quote,
    result: DevigResult,
}

impl Devigged<'_> {
    fn probability(&self, side: Side) -> f64 {
        match side {
            Side::Primary => self.result.fair_a,
            Side::Secondary => self.result.fair_b,
        }
    }

    fn reference(&self, side: Side) -> ReferenceQuote {
        ReferenceQuote {
            bookmaker: self.quote.bookmaker.clone(),
            over_price: self.quote.over_price,
            under_price: self.quote.under_price,
            vig_percent: self.result.vig_percent,
            fair_probability: self.probability(side),
        }
    }
}

/// Derives fair values under one configured policy.
#[derive(Debug, Clone)]
pub struct FairValuePolicy {
    config: FairValueConfig,
}

impl FairValuePolicy {
    pub fn new(config: FairValueConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FairValueConfig {
        &self.config
    }

    /// Fair value for one side of a cluster, or None when the cluster
    /// can't support one (not enough two-sided books).
    pub fn fair_value(&self, cluster: &MarketCluster, side: Side) -> Option<FairValue> {
        let pool: Vec<Devigged<'_>> = cluster
            .members
            .iter()
            .filter_map(|q| {
                let under = q.under_price?;
                Some(Devigged {
                    quote: q,
                    result: self.config.method.devig(q.over_price, under),
                })
            })
            .collect();

        let fair = match cluster.market_type {
            MarketType::PlayerOneWay => {
                if side != Side::Primary {
                    return None;
                }
                if pool.is_empty() {
                    self.one_way_fallback(cluster)
                } else {
                    Some(self.single_book(&pool, side))
                }
            }
            MarketType::Totals | MarketType::Spread => {
                if pool.len() < self.config.min_reference_books.max(1) {
                    debug!(
                        subject = %cluster.subject,
                        market = %cluster.market_key,
                        line = cluster.line,
                        two_sided = pool.len(),
                        "Not enough two-sided books for a fair value"
                    );
                    return None;
                }
                Some(self.two_sided(&pool, side))
            }
        }?;

        // Degenerate probabilities can't be priced.
        if fair.fair_probability > 0.0 && fair.fair_probability < 1.0 {
            Some(fair)
        } else {
            None
        }
    }

    fn sharp<'p, 'a>(&self, pool: &'p [Devigged<'a>]) -> Option<&'p Devigged<'a>> {
        self.config.sharp_books.iter().find_map(|name| {
            pool.iter()
                .find(|d| d.quote.bookmaker.eq_ignore_ascii_case(name))
        })
    }

    fn lowest_vig<'p, 'a>(pool: &'p [Devigged<'a>]) -> Option<&'p Devigged<'a>> {
        pool.iter().reduce(|best, d| {
            if d.result.vig_percent < best.result.vig_percent {
                d
            } else {
                best
            }
        })
    }

    fn from_single(d: &Devigged<'_>, side: Side) -> FairValue {
        let p = d.probability(side);
        FairValue {
            fair_probability: p,
            fair_odds: 1.0 / p,
            vig_percent: d.result.vig_percent,
            reference_bookmaker: Some(d.quote.bookmaker.clone()),
            references: vec![d.reference(side)],
        }
    }

    /// Sharp book, else lowest margin. Pool must be non-empty.
    fn single_book(&self, pool: &[Devigged<'_>], side: Side) -> FairValue {
        let chosen = self
            .sharp(pool)
            .or_else(|| Self::lowest_vig(pool))
            .unwrap_or(&pool[0]);
        Self::from_single(chosen, side)
    }

    /// Sharp book, else lower margin of two, else pool mean. Pool must be non-empty.
    fn two_sided(&self, pool: &[Devigged<'_>], side: Side) -> FairValue {
        if self.sharp(pool).is_some() || pool.len() <= 2 {
            return self.single_book(pool, side);
        }

        let n = pool.len() as f64;
        let p = pool.iter().map(|d| d.probability(side)).sum::<f64>() / n;
        FairValue {
            fair_probability: p,
            fair_odds: 1.0 / p,
            vig_percent: pool.iter().map(|d| d.result.vig_percent).sum::<f64>() / n,
            reference_bookmaker: None,
            references: pool.iter().map(|d| d.reference(side)).collect(),
        }
    }

    /// No book prices both sides: median one-sided implied probability,
    /// shrunk by the assumed margin.
    fn one_way_fallback(&self, cluster: &MarketCluster) -> Option<FairValue> {
        let implied: Vec<f64> = cluster.members.iter().map(|q| 1.0 / q.over_price).collect();
        let mid = median(&implied)?;
        let p = mid / (1.0 + self.config.one_way_vig_allowance);
        let vig_percent = self.config.one_way_vig_allowance * 100.0;

        Some(FairValue {
            fair_probability: p,
            fair_odds: 1.0 / p,
            vig_percent,
            reference_bookmaker: None,
            references: cluster
                .members
                .iter()
                .map(|q| ReferenceQuote {
                    bookmaker: q.bookmaker.clone(),
                    over_price: q.over_price,
                    under_price: None,
                    vig_percent,
                    fair_probability: p,
                })
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
