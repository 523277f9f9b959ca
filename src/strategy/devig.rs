//! Margin removal.
//!
//! Turns one bookmaker's two-sided price pair into fair (zero-margin)
//! probabilities. Every method is a pure function of the two implied
//! probabilities; `DevigMethod` selects which one runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::types::EngineError;

/// Initial bracket for the power-method exponent search.
const POWER_K_MIN: f64 = 0.5;
const POWER_K_MAX: f64 = 2.0;
/// The bracket is widened by doubling/halving up to these limits.
const POWER_K_CEILING: f64 = 1024.0;
const POWER_K_FLOOR: f64 = 1.0 / 1024.0;
/// Largest acceptable `|pA^k + pB^k - 1|` before falling back.
const POWER_MAX_RESIDUAL: f64 = 1e-3;
const POWER_MAX_ITERATIONS: usize = 50;
const POWER_TOLERANCE: f64 = 1e-4;

/// Additive removal never pushes a side below this probability.
const ADDITIVE_FLOOR: f64 = 0.01;

// ---------------------------------------------------------------------------
// Method selector
// ---------------------------------------------------------------------------

/// Runtime-selectable margin removal strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DevigMethod {
    /// Proportional removal: each side scaled by the booksum.
    #[default]
    Multiplicative,
    /// Both implied probabilities raised to a common exponent `k`.
    Power,
    /// Half the overround subtracted from each side.
    Additive,
    /// No removal at all.
    WorstCase,
}

impl DevigMethod {
    pub const ALL: &'static [DevigMethod] = &[
        DevigMethod::Multiplicative,
        DevigMethod::Power,
        DevigMethod::Additive,
        DevigMethod::WorstCase,
    ];

    /// De-vig a decimal price pair. Both prices must be > 1.0.
    pub fn devig(&self, price_a: f64, price_b: f64) -> DevigResult {
        let p_a = 1.0 / price_a;
        let p_b = 1.0 / price_b;
        let (fair_a, fair_b) = match self {
            DevigMethod::Multiplicative => multiplicative(p_a, p_b),
            DevigMethod::Power => power(p_a, p_b),
            DevigMethod::Additive => additive(p_a, p_b),
            DevigMethod::WorstCase => (p_a, p_b),
        };
        DevigResult {
            fair_a,
            fair_b,
            vig_percent: vig_percent(p_a, p_b),
        }
    }
}

impl fmt::Display for DevigMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevigMethod::Multiplicative => write!(f, "multiplicative"),
            DevigMethod::Power => write!(f, "power"),
            DevigMethod::Additive => write!(f, "additive"),
            DevigMethod::WorstCase => write!(f, "worstCase"),
        }
    }
}

/// Parse a method selector (case-insensitive). Anything unrecognised is
/// caller misuse and fails fast.
impl std::str::FromStr for DevigMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiplicative" | "mult" | "proportional" => Ok(DevigMethod::Multiplicative),
            "power" => Ok(DevigMethod::Power),
            "additive" => Ok(DevigMethod::Additive),
            "worstcase" | "worst_case" | "worst-case" => Ok(DevigMethod::WorstCase),
            _ => Err(EngineError::UnknownDevigMethod(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Fair probabilities for both sides of one price pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevigResult {
    pub fair_a: f64,
    pub fair_b: f64,
    /// Book margin: `(pA + pB - 1) * 100`.
    pub vig_percent: f64,
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Book margin in percent for a pair of implied probabilities.
pub fn vig_percent(p_a: f64, p_b: f64) -> f64 {
    (p_a + p_b - 1.0) * 100.0
}

fn multiplicative(p_a: f64, p_b: f64) -> (f64, f64) {
    let total = p_a + p_b;
    (p_a / total, p_b / total)
}

fn additive(p_a: f64, p_b: f64) -> (f64, f64) {
    let half = (p_a + p_b - 1.0) / 2.0;
    ((p_a - half).max(ADDITIVE_FLOOR), (p_b - half).max(ADDITIVE_FLOOR))
}

fn power(p_a: f64, p_b: f64) -> (f64, f64) {
    let k = power_exponent(p_a, p_b);
    let (fair_a, fair_b) = (p_a.powf(k), p_b.powf(k));
    if (fair_a + fair_b - 1.0).abs() < POWER_MAX_RESIDUAL {
        return (fair_a, fair_b);
    }
    debug!(p_a, p_b, k, "Power de-vig did not converge, using multiplicative");
    multiplicative(p_a, p_b)
}

/// Exponent `k` with `pA^k + pB^k = 1`, found by bisection.
///
/// The booksum is decreasing in `k` for probabilities below one, so an
/// overround pushes `k` above 1 and an underround below it. The search
/// starts on `[0.5, 2.0]` and widens the bracket until it holds the root.
pub fn power_exponent(p_a: f64, p_b: f64) -> f64 {
    let excess = |k: f64| p_a.powf(k) + p_b.powf(k) - 1.0;

    let mut lo = POWER_K_MIN;
    let mut hi = POWER_K_MAX;
    while excess(hi) > 0.0 && hi < POWER_K_CEILING {
        lo = hi;
        hi *= 2.0;
    }
    while excess(lo) < 0.0 && lo > POWER_K_FLOOR {
        hi = lo;
        lo /= 2.0;
    }

    let mut k = 1.0;
    for _ in 0..POWER_MAX_ITERATIONS {
        k = (lo + hi) / 2.0;
        let e = excess(k);
        if e.abs() < POWER_TOLERANCE {
            break;
        }
        if e > 0.0 {
            lo = k;
        } else {
            hi = k;
        }
    }

    k
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
