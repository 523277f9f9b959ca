//! Integration tests against the public API and the sample snapshot.

mod pipeline;
mod scan;

use fairline::data::snapshot::parse_snapshot;
use fairline::types::RawQuote;

pub const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/sample_quotes.json");

pub fn load_fixture() -> Vec<RawQuote> {
    let json = std::fs::read_to_string(FIXTURE).unwrap();
    parse_snapshot(&json).unwrap()
}
