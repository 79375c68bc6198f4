//! Relative strength against a benchmark.
//!
//! ratio[t] = close[t] / benchmark[t]; "RS ok" when the latest ratio sits
//! above its own `ma_len`-bar simple moving average.

use serde::{Deserialize, Serialize};

use super::sma_latest;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeStrength {
    pub ratio: f64,
    pub ratio_ma: f64,
    pub ok: bool,
}

/// Relative strength of `closes` vs `benchmark` at the last bar.
///
/// Both slices must be aligned bar-for-bar. Only the trailing `ma_len`
/// ratios are read, so a benchmark that starts late (NaN-padded by
/// [`align_benchmark`]) is fine as long as it covers that window.
/// Mismatched lengths, a missing or non-positive benchmark close inside the
/// window, or too little history yield `None`.
pub fn relative_strength(closes: &[f64], benchmark: &[f64], ma_len: usize) -> Option<RelativeStrength> {
    if closes.len() != benchmark.len() || ma_len == 0 || closes.len() < ma_len {
        return None;
    }
    let ratios: Vec<f64> = closes
        .iter()
        .zip(benchmark)
        .map(|(&c, &b)| if b > 0.0 { c / b } else { f64::NAN })
        .collect();
    let ratio = super::last_defined(&ratios)?;
    let ratio_ma = sma_latest(&ratios, ma_len)?;
    Some(RelativeStrength {
        ratio,
        ratio_ma,
        ok: ratio > ratio_ma,
    })
}

/// Benchmark closes aligned to each of `bars`' timestamps.
///
/// Each entry carries the last benchmark close at or before that bar's
/// timestamp; bars earlier than the first benchmark bar get NaN.
pub fn align_benchmark(bars: &[Bar], benchmark: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut j = 0usize;
    let mut last = f64::NAN;
    for bar in bars {
        while j < benchmark.len() && benchmark[j].timestamp <= bar.timestamp {
            last = benchmark[j].close;
            j += 1;
        }
        out.push(last);
    }
    out
}
