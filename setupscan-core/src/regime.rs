//! Market regime gate.
//!
//! A benchmark is in an OPEN regime when its short EMA sits above its long
//! EMA and both EMAs have risen over the last `rising_lookback` bars. The
//! gate is evaluated once per cycle and shared read-only by every detector.

use serde::{Deserialize, Serialize};

use crate::indicators::ewm_of_series;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub short_span: usize,
    pub long_span: usize,
    pub rising_lookback: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            short_span: 10,
            long_span: 20,
            rising_lookback: 3,
        }
    }
}

impl RegimeConfig {
    /// Benchmark bars required before the gate can open.
    pub fn min_bars(&self) -> usize {
        self.long_span + self.rising_lookback
    }
}

/// Benchmark trend state. Numerics are `None` when the gate failed closed
/// for lack of data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    pub is_open: bool,
    pub short_ema: Option<f64>,
    pub long_ema: Option<f64>,
    pub short_ema_slope: Option<f64>,
    pub long_ema_slope: Option<f64>,
}

impl RegimeState {
    /// A closed regime carrying no measurements.
    pub fn closed() -> Self {
        Self::default()
    }

    /// Evaluate the gate over benchmark closes.
    ///
    /// Fewer than `long_span + rising_lookback` closes, a zero lookback or
    /// any undefined EMA reports CLOSED rather than failing.
    pub fn evaluate(closes: &[f64], config: &RegimeConfig) -> Self {
        let r = config.rising_lookback;
        if r == 0 || config.short_span == 0 || closes.len() < config.min_bars() {
            return Self::closed();
        }

        let short = ewm_of_series(closes, config.short_span);
        let long = ewm_of_series(closes, config.long_span);
        let (Some(short_ema), Some(long_ema)) = (latest(&short), latest(&long)) else {
            return Self::closed();
        };
        let short_slope = slope(&short, r);
        let long_slope = slope(&long, r);

        let is_open = match (short_slope, long_slope) {
            (Some(s), Some(l)) => short_ema > long_ema && s > 0.0 && l > 0.0,
            _ => false,
        };

        Self {
            is_open,
            short_ema: Some(short_ema),
            long_ema: Some(long_ema),
            short_ema_slope: short_slope,
            long_ema_slope: long_slope,
        }
    }
}

fn latest(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

/// Average per-bar change over the last `r` bars.
fn slope(series: &[f64], r: usize) -> Option<f64> {
    let n = series.len();
    if n <= r {
        return None;
    }
    let delta = series[n - 1] - series[n - 1 - r];
    delta.is_finite().then(|| delta / r as f64)
}
