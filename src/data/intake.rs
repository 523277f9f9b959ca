//! Quote intake.
//!
//! Converts loose `RawQuote` records into validated `Quote`s. Bad data is
//! never an error for the run: a quote that can't be trusted is dropped
//! here, counted, and the rest of the snapshot carries on.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::matching::catalog::MarketCatalog;
use crate::matching::normalize::normalize_line;
use crate::types::{MarketType, Quote, RawQuote};

/// Line assumed for one-way markets quoted without one (anytime scorer).
const ONE_WAY_DEFAULT_LINE: f64 = 0.5;

/// Why a raw quote was dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteRejection {
    #[error("missing subject")]
    MissingSubject,
    #[error("missing bookmaker")]
    MissingBookmaker,
    #[error("missing market key")]
    MissingMarket,
    #[error("unknown market type: {0}")]
    UnknownMarketType(String),
    #[error("unparsable line: {0}")]
    InvalidLine(String),
    #[error("invalid over/home price: {0}")]
    InvalidPrice(String),
}

/// Read a finite number from a JSON number or numeric string.
pub fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_start_matches('+').parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Decimal odds are only meaningful above 1.0.
fn parse_price(value: &Value) -> Option<f64> {
    parse_number(value).filter(|p| *p > 1.0)
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            debug!(timestamp = raw, error = %e, "Unparsable quote timestamp ignored");
            None
        }
    }
}

/// Validate one raw quote.
pub fn parse_quote(raw: &RawQuote, catalog: &MarketCatalog) -> Result<Quote, QuoteRejection> {
    let subject = raw.subject.trim();
    if subject.is_empty() {
        return Err(QuoteRejection::MissingSubject);
    }
    let bookmaker = raw.bookmaker.trim().to_lowercase();
    if bookmaker.is_empty() {
        return Err(QuoteRejection::MissingBookmaker);
    }
    if raw.market_key.trim().is_empty() {
        return Err(QuoteRejection::MissingMarket);
    }

    let definition = catalog.resolve(&raw.market_key);
    let market_key = catalog.canonical_key(&raw.market_key);
    let market_type = if raw.market_type.trim().is_empty() {
        definition
            .map(|d| d.market_type)
            .ok_or_else(|| QuoteRejection::UnknownMarketType(String::new()))?
    } else {
        raw.market_type
            .parse::<MarketType>()
            .map_err(|_| QuoteRejection::UnknownMarketType(raw.market_type.clone()))?
    };

    let raw_line = match (&raw.line, market_type) {
        (Value::Null, MarketType::PlayerOneWay) => ONE_WAY_DEFAULT_LINE,
        (value, _) => parse_number(value)
            .ok_or_else(|| QuoteRejection::InvalidLine(value.to_string()))?,
    };

    let over_price = parse_price(&raw.over_price)
        .ok_or_else(|| QuoteRejection::InvalidPrice(raw.over_price.to_string()))?;

    // A junk under price only loses that side, never the whole quote.
    let under_price = match &raw.under_price {
        Value::Null => None,
        value => {
            let parsed = parse_price(value);
            if parsed.is_none() {
                debug!(
                    bookmaker = %bookmaker,
                    subject,
                    under = %value,
                    "Invalid under/away price treated as absent"
                );
            }
            parsed
        }
    };

    Ok(Quote {
        subject: subject.to_string(),
        market_key,
        market_type,
        raw_line,
        line: normalize_line(raw_line),
        over_price,
        under_price,
        bookmaker,
        timestamp: parse_timestamp(raw.timestamp.as_deref()),
    })
}

/// Validate a whole snapshot, keeping input order.
///
/// Returns the surviving quotes and the number dropped.
pub fn parse_quotes(raws: &[RawQuote], catalog: &MarketCatalog) -> (Vec<Quote>, usize) {
    let mut quotes = Vec::with_capacity(raws.len());
    let mut rejected = 0usize;
    for (i, raw) in raws.iter().enumerate() {
        match parse_quote(raw, catalog) {
            Ok(q) => quotes.push(q),
            Err(reason) => {
                debug!(
                    index = i,
                    bookmaker = %raw.bookmaker,
                    subject = %raw.subject,
                    reason = %reason,
                    "Quote dropped at intake"
                );
                rejected += 1;
            }
        }
    }
    (quotes, rejected)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
