//! Parabolic (oversold) reversal detector.
//!
//! Looks for a violent short-window crash into a stretched, oversold close
//! on an already volatile name. Detection and triggering are separate: once
//! the crash, stretch and ADR gates pass a tag is always emitted, but it is
//! only `triggered` on an early rebound (a higher close or a higher low than
//! the prior bar).

use serde::{Deserialize, Serialize};

use super::{flag, put, DetectionContext, SetupDetector};
use crate::domain::{Diagnostics, SetupKind, SetupTag};
use crate::indicators::{adr_pct, atr_latest, ewm_latest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParabolicConfig {
    /// Minimum peak-to-trough drawdown inside the lookback, in percent.
    pub crash_min_pct: f64,
    pub lookback: usize,
    pub ema_short: usize,
    pub ema_long: usize,
    pub atr_len: usize,
    /// Close must sit this many ATRs below the lower EMA.
    pub oversold_atr_multiple: f64,
    pub adr_len: usize,
    pub adr_min_pct: f64,
}

impl Default for ParabolicConfig {
    fn default() -> Self {
        Self {
            crash_min_pct: 50.0,
            lookback: 7,
            ema_short: 10,
            ema_long: 20,
            atr_len: 14,
            oversold_atr_multiple: 2.0,
            adr_len: 20,
            adr_min_pct: 10.0,
        }
    }
}

impl ParabolicConfig {
    pub fn min_bars(&self) -> usize {
        (self.lookback + self.adr_len)
            .max(self.atr_len + 1)
            .max(self.ema_long)
            .max(self.ema_short)
            .max(2)
    }
}

#[derive(Debug, Clone)]
pub struct ParabolicLongDetector {
    config: ParabolicConfig,
}

impl ParabolicLongDetector {
    pub fn new(config: ParabolicConfig) -> Self {
        Self { config }
    }

    pub fn default_params() -> Self {
        Self::new(ParabolicConfig::default())
    }
}

/// Drawdown from the lookback's highest high to the lowest low on or after it.
///
/// Returns `(drawdown_pct, peak, trough)`. `None` when the peak is the last
/// bar of the window or the peak is not positive.
pub fn crash_drawdown(highs: &[f64], lows: &[f64]) -> Option<(f64, f64, f64)> {
    let n = highs.len().min(lows.len());
    if n < 2 {
        return None;
    }
    let (peak_idx, peak) = highs[..n]
        .iter()
        .copied()
        .enumerate()
        .fold((0usize, f64::NEG_INFINITY), |acc, (i, h)| if h > acc.1 { (i, h) } else { acc });
    if peak_idx + 1 >= n || !(peak > 0.0) {
        return None;
    }
    let trough = lows[peak_idx..n].iter().copied().fold(f64::INFINITY, f64::min);
    Some(((peak - trough) / peak * 100.0, peak, trough))
}

impl SetupDetector for ParabolicLongDetector {
    fn kind(&self) -> SetupKind {
        SetupKind::ParabolicLong
    }

    fn min_bars(&self) -> usize {
        self.config.min_bars()
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Option<SetupTag> {
        let cfg = &self.config;
        let series = ctx.series;
        if series.len() < self.min_bars() || cfg.lookback < 2 {
            return None;
        }

        let window = series.tail(cfg.lookback);
        let highs: Vec<f64> = window.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = window.iter().map(|b| b.low).collect();
        let (drawdown_pct, peak, trough) = crash_drawdown(&highs, &lows)?;
        if drawdown_pct < cfg.crash_min_pct {
            return None;
        }

        let closes = series.closes();
        let close = series.last()?.close;
        let ema_short = ewm_latest(&closes, cfg.ema_short)?;
        let ema_long = ewm_latest(&closes, cfg.ema_long)?;
        let atr = atr_latest(series.bars(), cfg.atr_len).filter(|a| *a > 0.0)?;
        let band_low = ema_short.min(ema_long);
        let atr_distance = (band_low - close) / atr;
        if atr_distance < cfg.oversold_atr_multiple {
            return None;
        }

        let adr = adr_pct(series.bars(), cfg.adr_len)?;
        if adr < cfg.adr_min_pct {
            return None;
        }

        let last = series.last()?;
        let prev = series.prev()?;
        let rebound = last.close > prev.close || last.low > prev.low;

        let score = 0.5 * (drawdown_pct / 80.0).min(1.0)
            + 0.3 * (atr_distance / 3.0).min(1.0)
            + 0.2 * flag(rebound);

        let mut diag = Diagnostics::new();
        put(&mut diag, "drawdown_pct", drawdown_pct);
        put(&mut diag, "peak", peak);
        put(&mut diag, "trough", trough);
        put(&mut diag, "ema_band_low", band_low);
        put(&mut diag, "atr", atr);
        put(&mut diag, "atr_distance", atr_distance);
        put(&mut diag, "adr_pct", adr);
        put(&mut diag, "rebound", flag(rebound));

        Some(SetupTag::new(SetupKind::ParabolicLong, rebound, score, diag))
    }
}
