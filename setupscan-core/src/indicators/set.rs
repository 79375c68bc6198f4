//! Per-symbol indicator snapshot.

use serde::{Deserialize, Serialize};

use super::{
    adr_pct, atr_contraction_ratio, atr_latest, change_pct, ewm_of_series, last_defined,
    relative_strength, rsi_latest, sma_latest, zscore_latest, AtrWindows,
};
use crate::domain::{BarSeries, IndicatorSet};

/// Window lengths used to build an [`IndicatorSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub atr_len: usize,
    pub atr_windows: AtrWindows,
    pub rsi_len: usize,
    pub z_lookback: usize,
    pub adr_len: usize,
    pub sma_short: usize,
    pub sma_long: usize,
    pub ema_short: usize,
    pub ema_long: usize,
    pub rs_ma: usize,
    pub avg_volume_len: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            atr_len: 14,
            atr_windows: AtrWindows::MovingAverage {
                atr_len: 14,
                ma_len: 50,
            },
            rsi_len: 14,
            z_lookback: 20,
            adr_len: 20,
            sma_short: 20,
            sma_long: 50,
            ema_short: 10,
            ema_long: 20,
            rs_ma: 50,
            avg_volume_len: 20,
        }
    }
}

/// Latest first-value-seeded EMA, once at least `span` values exist.
pub fn ewm_latest(values: &[f64], span: usize) -> Option<f64> {
    if span == 0 || values.len() < span {
        return None;
    }
    last_defined(&ewm_of_series(values, span))
}

impl IndicatorSet {
    /// Compute every scalar for `series` at its last bar.
    ///
    /// `benchmark` must be aligned bar-for-bar with `series`; RS fields stay
    /// `None` without it.
    pub fn compute(series: &BarSeries, benchmark: Option<&[f64]>, config: &IndicatorConfig) -> Self {
        let bars = series.bars();
        let closes = series.closes();
        let volumes = series.volumes();

        let rs = benchmark.and_then(|bench| relative_strength(&closes, bench, config.rs_ma));
        let change = match (series.prev(), series.last()) {
            (Some(prev), Some(last)) => change_pct(prev.close, last.close),
            _ => None,
        };

        Self {
            atr: atr_latest(bars, config.atr_len),
            atr_ratio: atr_contraction_ratio(bars, config.atr_windows),
            rsi: rsi_latest(&closes, config.rsi_len),
            zscore: zscore_latest(&closes, config.z_lookback),
            adr_pct: adr_pct(bars, config.adr_len),
            sma_short: sma_latest(&closes, config.sma_short),
            sma_long: sma_latest(&closes, config.sma_long),
            ema_short: ewm_latest(&closes, config.ema_short),
            ema_long: ewm_latest(&closes, config.ema_long),
            rs_ratio: rs.map(|r| r.ratio),
            rs_ok: rs.map(|r| r.ok),
            change_pct: change,
            avg_volume: sma_latest(&volumes, config.avg_volume_len),
        }
    }
}
