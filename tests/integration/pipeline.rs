//! Full pipeline runs over the sample snapshot.

use fairline::config::{AppConfig, EngineConfig};
use fairline::matching::catalog::MarketCatalog;
use fairline::strategy::devig::DevigMethod;
use fairline::strategy::EvPipeline;
use fairline::types::{EngineError, MarketCategory, Side};

use crate::load_fixture;

fn make_pipeline(config: EngineConfig) -> EvPipeline {
    EvPipeline::new(config, MarketCatalog::default()).unwrap()
}

#[test]
fn test_sample_snapshot_default_config() {
    let run = make_pipeline(EngineConfig::default()).run(&load_fixture());

    assert_eq!(run.stats.quotes_in, 16);
    assert_eq!(run.stats.quotes_rejected, 2);
    assert_eq!(run.stats.groups, 5);
    assert_eq!(run.stats.clusters, 4);
    assert_eq!(run.stats.outliers_removed, 1);
    assert_eq!(run.stats.implausible, 0);
    assert_eq!(run.stats.opportunities, run.opportunities.len());

    let summary: Vec<_> = run
        .opportunities
        .iter()
        .map(|o| (o.market_key.as_str(), o.bookmaker.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![("player_shots", "softbook"), ("totals", "softbook")]
    );
}

#[test]
fn test_end_to_end_reference_range() {
    let run = make_pipeline(EngineConfig {
        playable_books: vec!["softbook".to_string()],
        ..EngineConfig::default()
    })
    .run(&load_fixture());

    let opp = run
        .opportunities
        .iter()
        .find(|o| o.market_key == "totals")
        .unwrap();
    assert_eq!(opp.side, Side::Primary);
    assert_eq!(opp.bet_type, "Over");
    assert_eq!(opp.category, MarketCategory::Match);
    assert!(opp.ev_percent > 0.0);

    // Fair odds must sit between the two references' de-vigged odds.
    let a_fair = 1.0 / DevigMethod::Multiplicative.devig(2.05, 1.95).fair_a;
    let b_fair = 2.0;
    let (lo, hi) = (a_fair.min(b_fair), a_fair.max(b_fair));
    assert!(opp.fair_odds >= lo - 1e-9 && opp.fair_odds <= hi + 1e-9);
}

#[test]
fn test_sharp_book_takes_priority() {
    let run = make_pipeline(EngineConfig {
        sharp_books: vec!["Pinnacle".to_string()],
        ..EngineConfig::default()
    })
    .run(&load_fixture());

    let totals = run
        .opportunities
        .iter()
        .find(|o| o.market_key == "totals")
        .unwrap();
    assert!((totals.fair_probability - (1.0 / 2.05) / (1.0 / 2.05 + 1.0 / 1.95)).abs() < 1e-9);
    assert_eq!(totals.references[0].bookmaker, "pinnacle");

    // Pinnacle's even spread lets FanDuel's home price through.
    let spread = run
        .opportunities
        .iter()
        .find(|o| o.market_key == "spreads")
        .unwrap();
    assert_eq!(spread.bookmaker, "fanduel");
    assert_eq!(spread.bet_type, "Home");
    assert!((spread.ev_percent - 5.0).abs() < 1e-9);
}

#[test]
fn test_output_is_sorted_and_inside_band() {
    let config = EngineConfig {
        sharp_books: vec!["pinnacle".to_string()],
        ..EngineConfig::default()
    };
    let run = make_pipeline(config.clone()).run(&load_fixture());

    assert!(!run.opportunities.is_empty());
    for pair in run.opportunities.windows(2) {
        assert!(pair[0].ev_percent >= pair[1].ev_percent);
    }
    for opp in &run.opportunities {
        assert!(opp.ev_percent >= config.min_ev_percent - 1e-9);
        assert!(opp.ev_percent <= config.max_plausible_ev + 1e-9);
    }
}

#[test]
fn test_outlier_never_priced() {
    let run = make_pipeline(EngineConfig {
        min_ev_percent: -100.0,
        ..EngineConfig::default()
    })
    .run(&load_fixture());

    assert!(run
        .opportunities
        .iter()
        .all(|o| !(o.market_key == "player_shots_on_target" && o.bookmaker == "softbook")));
}

#[test]
fn test_single_book_markets_never_output() {
    let run = make_pipeline(EngineConfig {
        min_ev_percent: -100.0,
        ..EngineConfig::default()
    })
    .run(&load_fixture());

    assert!(run
        .opportunities
        .iter()
        .all(|o| !o.subject.to_lowercase().contains("spurs")));
}

#[test]
fn test_repeated_runs_identical() {
    let pipeline = make_pipeline(EngineConfig::default());
    let quotes = load_fixture();
    let first = pipeline.run(&quotes);
    for _ in 0..3 {
        assert_eq!(pipeline.run(&quotes), first);
    }
}

#[test]
fn test_every_method_runs_on_sample() {
    let base = make_pipeline(EngineConfig::default());
    for &method in DevigMethod::ALL {
        let run = base.with_method(method).run(&load_fixture());
        assert_eq!(run.stats.clusters, 4);
        // The even-money reference fixes the totals price under any method
        assert!(run
            .opportunities
            .iter()
            .any(|o| o.market_key == "totals" && o.bookmaker == "softbook"));
    }
}

#[test]
fn test_config_file_drives_pipeline() {
    let cfg = AppConfig::parse(
        r#"
        [engine]
        devig_method = "worst-case"
        playable_books = ["softbook"]
        "#,
    )
    .unwrap();
    let pipeline =
        EvPipeline::new(cfg.engine, MarketCatalog::from_config(&cfg.markets)).unwrap();
    assert_eq!(pipeline.method(), DevigMethod::WorstCase);

    let run = pipeline.run(&load_fixture());
    assert!(run.opportunities.iter().all(|o| o.bookmaker == "softbook"));
}

#[test]
fn test_unknown_method_in_config_is_rejected() {
    let cfg = AppConfig::parse("[engine]\ndevig_method = \"shin\"\n").unwrap();
    let err = EvPipeline::new(cfg.engine, MarketCatalog::default()).unwrap_err();
    assert!(matches!(err, EngineError::UnknownDevigMethod(_)));
}
