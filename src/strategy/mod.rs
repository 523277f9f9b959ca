//! Strategy engine: de-vigging, fair value derivation and EV ranking.

pub mod devig;
pub mod ev;
pub mod fair;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::data::intake::parse_quotes;
use crate::matching::catalog::MarketCatalog;
use crate::matching::MarketMatcher;
use crate::types::{EngineError, EvOpportunity, Quote, RawQuote, RunStats, Side};
use devig::DevigMethod;
use ev::{rank, EvConfig, EvScorer};
use fair::{FairValueConfig, FairValuePolicy};

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

/// Ranked opportunities plus the counters that explain them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedRun {
    /// Sorted by EV descending.
    pub opportunities: Vec<EvOpportunity>,
    pub stats: RunStats,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Pipelines intake → matching → fair value → EV scoring → ranking.
///
/// Holds only immutable configuration, so one instance can serve any
/// number of concurrent `run` calls. The same snapshot always yields the
/// same ordered output.
#[derive(Debug, Clone)]
pub struct EvPipeline {
    matcher: MarketMatcher,
    fair: FairValuePolicy,
    scorer: EvScorer,
}

impl EvPipeline {
    /// Build a pipeline, failing fast on bad configuration or an unknown
    /// de-vig method.
    pub fn new(config: EngineConfig, catalog: MarketCatalog) -> Result<Self, EngineError> {
        config.validate()?;
        let method: DevigMethod = config.devig_method.parse()?;

        let matcher = MarketMatcher::new(config.cluster_config(), catalog);
        let fair = FairValuePolicy::new(FairValueConfig {
            method,
            sharp_books: lowercase_all(&config.sharp_books),
            min_reference_books: config.min_reference_books,
            one_way_vig_allowance: config.one_way_vig_allowance,
        });
        let scorer = EvScorer::new(EvConfig {
            min_ev_percent: config.min_ev_percent,
            max_plausible_ev: config.max_plausible_ev,
            playable_books: lowercase_all(&config.playable_books),
        });

        Ok(Self {
            matcher,
            fair,
            scorer,
        })
    }

    /// The de-vig method in force.
    pub fn method(&self) -> DevigMethod {
        self.fair.config().method
    }

    /// Same pipeline under a different de-vig method.
    pub fn with_method(&self, method: DevigMethod) -> Self {
        let mut config = self.fair.config().clone();
        config.method = method;
        Self {
            matcher: self.matcher.clone(),
            fair: FairValuePolicy::new(config),
            scorer: self.scorer.clone(),
        }
    }

    pub fn catalog(&self) -> &MarketCatalog {
        self.matcher.catalog()
    }

    /// Run the full pipeline over one snapshot of raw quotes.
    ///
    /// Malformed quotes are dropped and counted, never an error.
    pub fn run(&self, raws: &[RawQuote]) -> RankedRun {
        let (quotes, rejected) = parse_quotes(raws, self.catalog());
        let mut result = self.rank_quotes(quotes);
        result.stats.quotes_in = raws.len();
        result.stats.quotes_rejected += rejected;

        info!(
            method = %self.method(),
            quotes_in = result.stats.quotes_in,
            rejected = result.stats.quotes_rejected,
            clusters = result.stats.clusters,
            outliers = result.stats.outliers_removed,
            skipped_sides = result.stats.sides_skipped,
            implausible = result.stats.implausible,
            opportunities = result.stats.opportunities,
            "EV run complete"
        );

        result
    }

    /// Rank already-normalized quotes. `quotes_in` counts what was passed;
    /// quotes with no usable subject count as rejected.
    pub fn rank_quotes(&self, quotes: Vec<Quote>) -> RankedRun {
        let mut stats = RunStats {
            quotes_in: quotes.len(),
            ..RunStats::default()
        };

        let (clusters, match_stats) = self.matcher.match_quotes(quotes);
        stats.quotes_rejected = match_stats.blank_subjects;
        stats.groups = match_stats.groups;
        stats.clusters = match_stats.clusters;
        stats.outliers_removed = match_stats.outliers_removed;

        let mut opportunities = Vec::new();
        for cluster in &clusters {
            let market_name = self.catalog().display_name(&cluster.market_key);
            let sides: &[Side] = if cluster.market_type.is_two_sided() {
                &Side::BOTH
            } else {
                &[Side::Primary]
            };

            for &side in sides {
                let Some(fair) = self.fair.fair_value(cluster, side) else {
                    debug!(
                        subject = %cluster.subject,
                        market = %cluster.market_key,
                        line = cluster.line,
                        side = side.label(cluster.market_type),
                        "No fair value, side skipped"
                    );
                    stats.sides_skipped += 1;
                    continue;
                };

                let score = self.scorer.score_side(cluster, side, &fair, &market_name);
                stats.below_threshold += score.below_threshold;
                stats.implausible += score.implausible;
                opportunities.extend(score.accepted);
            }
        }

        rank(&mut opportunities);
        stats.opportunities = opportunities.len();

        RankedRun {
            opportunities,
            stats,
        }
    }
}

fn lowercase_all(names: &[String]) -> Vec<String> {
    names.iter().map(|n| n.trim().to_lowercase()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_raw(
        subject: &str,
        market: &str,
        book: &str,
        line: f64,
        over: f64,
        under: Option<f64>,
    ) -> RawQuote {
        RawQuote {
            subject: subject.to_string(),
            market_key: market.to_string(),
            line: json!(line),
            over_price: json!(over),
            under_price: under.map(|u| json!(u)).unwrap_or(serde_json::Value::Null),
            bookmaker: book.to_string(),
            ..RawQuote::default()
        }
    }

    fn make_pipeline(config: EngineConfig) -> EvPipeline {
        EvPipeline::new(config, MarketCatalog::default()).unwrap()
    }

    /// Two references and one soft book with a stale Over price.
    fn scenario() -> Vec<RawQuote> {
        vec![
            make_raw("Arsenal v Chelsea", "totals", "book_a", 2.5, 2.05, Some(1.95)),
            make_raw("Arsenal v Chelsea", "totals", "book_b", 2.5, 2.00, Some(2.00)),
            make_raw("Arsenal v Chelsea", "totals", "softbook", 2.5, 2.30, None),
        ]
    }

    #[test]
    fn test_end_to_end_scenario() {
        let pipeline = make_pipeline(EngineConfig {
            playable_books: vec!["SoftBook".to_string()],
            ..EngineConfig::default()
        });
        let run = pipeline.run(&scenario());

        assert_eq!(run.stats.quotes_in, 3);
        assert_eq!(run.stats.clusters, 1);
        assert_eq!(run.opportunities.len(), 1);

        let opp = &run.opportunities[0];
        assert_eq!(opp.bookmaker, "softbook");
        assert_eq!(opp.bet_type, "Over");
        assert_eq!(opp.market_name, "Total Goals");
        assert!(opp.ev_percent > 0.0);
        // Lower-vig reference of the two is book_b at an even 2.00
        assert!((opp.fair_odds - 2.0).abs() < 1e-9);
        assert!((opp.ev_percent - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_reference_books_are_scored_too() {
        let pipeline = make_pipeline(EngineConfig {
            min_ev_percent: -10.0,
            ..EngineConfig::default()
        });
        let run = pipeline.run(&scenario());
        let books: Vec<_> = run.opportunities.iter().map(|o| o.bookmaker.as_str()).collect();
        assert_eq!(books[0], "softbook");
        assert!(books.contains(&"book_a"));
        assert!(books.contains(&"book_b"));
    }

    #[test]
    fn test_run_is_idempotent() {
        let pipeline = make_pipeline(EngineConfig::default());
        let quotes = scenario();
        assert_eq!(pipeline.run(&quotes), pipeline.run(&quotes));
    }

    #[test]
    fn test_concurrent_runs_agree() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EvPipeline>();

        let pipeline = make_pipeline(EngineConfig::default());
        let quotes = scenario();
        let expected = pipeline.run(&quotes);

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| pipeline.run(&quotes))).collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_unknown_method_fails_fast() {
        let err = EvPipeline::new(
            EngineConfig {
                devig_method: "shin".to_string(),
                ..EngineConfig::default()
            },
            MarketCatalog::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::UnknownDevigMethod(_)));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let err = EvPipeline::new(
            EngineConfig {
                min_bookmakers: 0,
                ..EngineConfig::default()
            },
            MarketCatalog::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_with_method_switches_devig() {
        let pipeline = make_pipeline(EngineConfig::default());
        assert_eq!(pipeline.method(), DevigMethod::Multiplicative);
        let power = pipeline.with_method(DevigMethod::Power);
        assert_eq!(power.method(), DevigMethod::Power);
        assert_eq!(pipeline.method(), DevigMethod::Multiplicative);
    }

    #[test]
    fn test_single_book_never_surfaces() {
        let pipeline = make_pipeline(EngineConfig::default());
        let run = pipeline.run(&[make_raw(
            "Arsenal v Chelsea",
            "totals",
            "softbook",
            2.5,
            2.60,
            Some(1.60),
        )]);
        assert!(run.opportunities.is_empty());
        assert_eq!(run.stats.clusters, 0);
    }

    #[test]
    fn test_bad_quotes_are_counted_not_fatal() {
        let pipeline = make_pipeline(EngineConfig::default());
        let mut quotes = scenario();
        quotes.push(make_raw("Arsenal v Chelsea", "totals", "broken", 2.5, 0.95, None));
        quotes.push(make_raw("", "totals", "nameless", 2.5, 2.0, None));

        let run = pipeline.run(&quotes);
        assert_eq!(run.stats.quotes_in, 5);
        assert_eq!(run.stats.quotes_rejected, 2);
        assert_eq!(run.opportunities.len(), 1);
    }

    #[test]
    fn test_blank_subjects_count_as_rejected() {
        let pipeline = make_pipeline(EngineConfig::default());
        let mut quotes = scenario();
        quotes.push(make_raw("(ARS)", "totals", "bet365", 2.5, 2.10, Some(1.80)));

        let run = pipeline.run(&quotes);
        assert_eq!(run.stats.quotes_in, 4);
        assert_eq!(run.stats.quotes_rejected, 1);
        assert_eq!(run.opportunities.len(), 1);
    }

    #[test]
    fn test_one_way_scores_primary_only() {
        let pipeline = make_pipeline(EngineConfig::default());
        let quotes = vec![
            make_raw("Bukayo Saka", "player_shots", "book_a", 1.5, 1.80, None),
            make_raw("Bukayo Saka", "player_shots", "book_b", 1.5, 1.85, None),
            make_raw("Bukayo Saka", "player_shots", "softbook", 1.5, 2.40, None),
        ];
        let run = pipeline.run(&quotes);

        // median implied 1/1.85, shrunk by 8%: fair odds 1.998
        assert_eq!(run.opportunities.len(), 1);
        assert_eq!(run.opportunities[0].bookmaker, "softbook");
        assert_eq!(run.opportunities[0].side, Side::Primary);
        assert_eq!(run.stats.sides_skipped, 0);
    }

    #[test]
    fn test_implausible_edges_are_counted() {
        let pipeline = make_pipeline(EngineConfig::default());
        let quotes = vec![
            make_raw("Arsenal v Chelsea", "totals", "book_a", 2.5, 2.00, Some(2.00)),
            make_raw("Arsenal v Chelsea", "totals", "book_b", 2.5, 2.02, Some(1.98)),
            make_raw("Arsenal v Chelsea", "totals", "softbook", 2.5, 3.40, None),
        ];
        let run = pipeline.run(&quotes);
        assert!(run.opportunities.is_empty());
        assert_eq!(run.stats.implausible, 1);
    }
}
