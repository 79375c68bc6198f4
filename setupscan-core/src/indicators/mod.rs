//! Indicator library.
//!
//! Series indicators implement [`Indicator`]: bar history in, a same-length
//! `Vec<f64>` out, NaN through the warmup. Scalar helpers (`*_latest`,
//! `zscore`, `adr_pct`, ...) return `Option<f64>` so an undefined value can
//! never be mistaken for zero.

pub mod adr;
pub mod atr;
pub mod ema;
pub mod opening_range;
pub mod pivots;
pub mod relative_strength;
pub mod returns;
pub mod rsi;
pub mod set;
pub mod sma;
pub mod zscore;

pub use adr::adr_pct;
pub use atr::{atr_contraction_ratio, atr_latest, true_range, Atr, AtrWindows};
pub use ema::{ema_of_series, ewm_of_series, Ema};
pub use opening_range::{opening_range, OpeningRange};
pub use pivots::{higher_lows, higher_lows_asym, pivot_lows};
pub use relative_strength::{align_benchmark, relative_strength, RelativeStrength};
pub use returns::{change_pct, period_return};
pub use rsi::{rsi_latest, rsi_of_series, Rsi, NEUTRAL_RSI};
pub use set::{ewm_latest, IndicatorConfig};
pub use sma::{sma_latest, sma_of_series, Sma};
pub use zscore::zscore_latest;

use crate::domain::Bar;

/// Trait for series indicators.
///
/// The first `lookback()` values of `compute` are `f64::NAN`. No value at
/// bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Latest value of a series, if it is finite.
pub fn last_defined(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

/// Arithmetic mean; `None` for an empty slice or any non-finite member.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Create synthetic daily bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
